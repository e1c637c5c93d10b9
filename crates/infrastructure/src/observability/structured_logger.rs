//! Structured logging utilities
//!
//! One function per scheduling event, so every component emits the same
//! field names for the same facts.

use tracing::{debug, error, info, warn};

/// Structured logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_location: bool,
    pub include_thread_id: bool,
    pub include_thread_name: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    pub fn parse(format: &str) -> Option<Self> {
        match format {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            include_location: true,
            include_thread_id: false,
            include_thread_name: false,
        }
    }
}

impl From<&l10n_core::ObservabilityConfig> for LoggingConfig {
    fn from(config: &l10n_core::ObservabilityConfig) -> Self {
        Self {
            level: config.log_level.clone(),
            format: LogFormat::parse(&config.log_format).unwrap_or(LogFormat::Json),
            include_location: config.include_location,
            ..Self::default()
        }
    }
}

/// Structured logging utilities
pub struct StructuredLogger;

impl StructuredLogger {
    /// Log the start of a scheduling run
    pub fn log_run_started(run_id: &str, task_count: usize, batch_size: usize) {
        info!(
            event = "run_started",
            run.id = run_id,
            run.task_count = task_count,
            run.batch_size = batch_size,
            "Translation run started"
        );
    }

    /// Log the completion of a scheduling run
    pub fn log_run_completed(
        run_id: &str,
        translated: usize,
        failed: usize,
        skipped: usize,
        duration_ms: u64,
        cancelled: bool,
    ) {
        if failed > 0 || cancelled {
            warn!(
                event = "run_completed",
                run.id = run_id,
                run.translated = translated,
                run.failed = failed,
                run.skipped = skipped,
                run.duration_ms = duration_ms,
                run.cancelled = cancelled,
                "Translation run completed with failures"
            );
        } else {
            info!(
                event = "run_completed",
                run.id = run_id,
                run.translated = translated,
                run.failed = failed,
                run.skipped = skipped,
                run.duration_ms = duration_ms,
                run.cancelled = cancelled,
                "Translation run completed"
            );
        }
    }

    /// Log a skip/translate/defer decision
    pub fn log_skip_decision(task_id: &str, verdict: &str, confidence: f64, reasoning: &str) {
        debug!(
            event = "skip_decision",
            task.id = task_id,
            decision.verdict = verdict,
            decision.confidence = confidence,
            decision.reasoning = reasoning,
            "Skip policy evaluated"
        );
    }

    /// Log a batch size decision
    pub fn log_batch_size_decision(batch_size: usize, load_score: f64, fallback: bool) {
        info!(
            event = "batch_size_decision",
            batch.size = batch_size,
            system.load_score = load_score,
            decision.fallback = fallback,
            "Batch size selected"
        );
    }

    /// Log batch execution start
    pub fn log_batch_started(run_id: &str, batch_index: usize, task_count: usize) {
        info!(
            event = "batch_started",
            run.id = run_id,
            batch.index = batch_index,
            batch.task_count = task_count,
            "Batch execution started"
        );
    }

    /// Log batch execution completion
    pub fn log_batch_completed(
        run_id: &str,
        batch_index: usize,
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    ) {
        info!(
            event = "batch_completed",
            run.id = run_id,
            batch.index = batch_index,
            batch.succeeded = succeeded,
            batch.failed = failed,
            batch.duration_ms = duration_ms,
            "Batch execution completed"
        );
    }

    /// Log task retry
    pub fn log_task_retry(
        task_id: &str,
        attempt_count: u32,
        max_attempts: u32,
        delay_ms: u64,
        reason: &str,
    ) {
        warn!(
            event = "task_retry",
            task.id = task_id,
            task.attempt_count = attempt_count,
            task.max_attempts = max_attempts,
            task.retry_delay_ms = delay_ms,
            task.retry_reason = reason,
            "Task retry scheduled"
        );
    }

    /// Log a task that exhausted its retries or was not retryable
    pub fn log_task_failed(task_id: &str, attempts: u32, error_class: &str, error_message: &str) {
        error!(
            event = "task_failed",
            task.id = task_id,
            task.attempts = attempts,
            task.error_class = error_class,
            task.error = error_message,
            "Task translation failed"
        );
    }

    /// Log a scoring failure recovered with a conservative default
    pub fn log_policy_fallback(subject_id: &str, operation: &str, error_message: &str) {
        warn!(
            event = "policy_fallback",
            policy.subject = subject_id,
            policy.operation = operation,
            policy.error = error_message,
            "Scoring failed, using conservative default"
        );
    }

    /// Log system error
    pub fn log_system_error(component: &str, operation: &str, error: &dyn std::error::Error) {
        error!(
            event = "system_error",
            error.component = component,
            error.operation = operation,
            error.message = %error,
            "System error occurred"
        );
    }
}
