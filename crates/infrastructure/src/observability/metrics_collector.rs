//! Metrics collector for translation runs
//!
//! Handles are registered against the global `metrics` recorder. Without an
//! installed recorder every call is a no-op.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use tracing::debug;

pub struct MetricsCollector {
    // Task outcome metrics
    translations_total: Counter,
    failures_total: Counter,
    retries_total: Counter,
    skips_total: Counter,
    deferrals_total: Counter,
    task_duration: Histogram,

    // Batch metrics
    batches_total: Counter,
    batch_duration: Histogram,
    batch_size: Gauge,

    // System metrics
    load_score: Gauge,
    policy_fallbacks_total: Counter,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            translations_total: counter!("l10n_translations_total"),
            failures_total: counter!("l10n_translation_failures_total"),
            retries_total: counter!("l10n_translation_retries_total"),
            skips_total: counter!("l10n_tasks_skipped_total"),
            deferrals_total: counter!("l10n_tasks_deferred_total"),
            task_duration: histogram!("l10n_task_duration_seconds"),
            batches_total: counter!("l10n_batches_total"),
            batch_duration: histogram!("l10n_batch_duration_seconds"),
            batch_size: gauge!("l10n_batch_size"),
            load_score: gauge!("l10n_system_load_score"),
            policy_fallbacks_total: counter!("l10n_policy_fallbacks_total"),
        }
    }

    /// Collector whose handles discard every update, even with a recorder installed
    pub fn disabled() -> Self {
        Self {
            translations_total: Counter::noop(),
            failures_total: Counter::noop(),
            retries_total: Counter::noop(),
            skips_total: Counter::noop(),
            deferrals_total: Counter::noop(),
            task_duration: Histogram::noop(),
            batches_total: Counter::noop(),
            batch_duration: Histogram::noop(),
            batch_size: Gauge::noop(),
            load_score: Gauge::noop(),
            policy_fallbacks_total: Counter::noop(),
        }
    }

    /// Record a settled task
    pub fn record_task_outcome(&self, success: bool, duration_ms: u64) {
        if success {
            self.translations_total.increment(1);
        } else {
            self.failures_total.increment(1);
        }
        self.task_duration.record(duration_ms as f64 / 1000.0);
    }

    pub fn record_retry(&self, error_class: &str) {
        self.retries_total.increment(1);
        debug!(error_class = error_class, "Retry recorded");
    }

    pub fn record_skip(&self) {
        self.skips_total.increment(1);
    }

    pub fn record_deferral(&self) {
        self.deferrals_total.increment(1);
    }

    pub fn record_batch(&self, duration_ms: u64) {
        self.batches_total.increment(1);
        self.batch_duration.record(duration_ms as f64 / 1000.0);
    }

    pub fn update_batch_size(&self, size: usize) {
        self.batch_size.set(size as f64);
    }

    pub fn update_load_score(&self, score: f64) {
        self.load_score.set(score);
    }

    pub fn record_policy_fallback(&self) {
        self.policy_fallbacks_total.increment(1);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
