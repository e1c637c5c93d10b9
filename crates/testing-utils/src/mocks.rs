//! In-memory implementations of the scheduler's collaborator traits
//!
//! Every mock is cheap to clone and shares its state between clones, so a
//! test can hand one copy to the scheduler and keep another for assertions.

use async_trait::async_trait;
use l10n_core::{SchedulerError, SchedulerResult};
use l10n_domain::{
    HistoryStore, LoadProvider, Sleeper, SystemLoadSnapshot, Task, TaskHistory, TaskIdentity,
    TaskOutcome, TranslatedContent, TranslationError, Translator,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock implementation of `HistoryStore` for testing
#[derive(Debug, Clone, Default)]
pub struct MockHistoryStore {
    histories: Arc<Mutex<HashMap<TaskIdentity, TaskHistory>>>,
    outcomes: Arc<Mutex<Vec<(TaskIdentity, TaskOutcome)>>>,
    fetch_count: Arc<AtomicUsize>,
    fail_lookups: bool,
}

impl MockHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, identity: TaskIdentity, history: TaskHistory) -> Self {
        self.histories.lock().unwrap().insert(identity, history);
        self
    }

    /// Every lookup fails with `SchedulerError::HistoryLookup`
    pub fn failing(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn fetch_count_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetch_count)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Outcomes reported through `record_outcome`, in arrival order
    pub fn recorded_outcomes(&self) -> Vec<(TaskIdentity, TaskOutcome)> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn history_for(&self, identity: &TaskIdentity) -> Option<TaskHistory> {
        self.histories.lock().unwrap().get(identity).cloned()
    }
}

#[async_trait]
impl HistoryStore for MockHistoryStore {
    async fn fetch_history(&self, identity: &TaskIdentity) -> SchedulerResult<TaskHistory> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(SchedulerError::HistoryLookup(format!(
                "history backend unavailable for {identity}"
            )));
        }
        Ok(self
            .histories
            .lock()
            .unwrap()
            .get(identity)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_outcome(
        &self,
        identity: &TaskIdentity,
        outcome: &TaskOutcome,
    ) -> SchedulerResult<()> {
        self.outcomes
            .lock()
            .unwrap()
            .push((identity.clone(), outcome.clone()));
        Ok(())
    }
}

/// `LoadProvider` returning a fixed, adjustable snapshot
#[derive(Debug, Clone)]
pub struct FixedLoadProvider {
    snapshot: Arc<Mutex<SystemLoadSnapshot>>,
    fail: bool,
    fetch_count: Arc<AtomicUsize>,
}

impl FixedLoadProvider {
    /// Snapshot whose combined load score is approximately `load`
    pub fn new(load: f64) -> Self {
        Self::from_snapshot(crate::helpers::snapshot_for_load(load))
    }

    pub fn from_snapshot(snapshot: SystemLoadSnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(snapshot)),
            fail: false,
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// CPU utilisation is NaN, which the policy must reject
    pub fn non_finite() -> Self {
        Self::from_snapshot(SystemLoadSnapshot::new(f64::NAN, 0.5, 0, 0))
    }

    /// Every probe fails with `SchedulerError::LoadProbe`
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(0.0)
        }
    }

    pub fn set_load(&self, load: f64) {
        *self.snapshot.lock().unwrap() = crate::helpers::snapshot_for_load(load);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoadProvider for FixedLoadProvider {
    async fn fetch_system_load(&self) -> SchedulerResult<SystemLoadSnapshot> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SchedulerError::LoadProbe("load probe unavailable".to_string()));
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }
}

#[derive(Debug, Default)]
struct Script {
    failures: HashMap<String, (u32, TranslationError)>,
    panics: HashSet<String>,
    quality: HashMap<String, f64>,
    calls: Vec<String>,
}

/// `Translator` whose behaviour is scripted per task id
///
/// Unscripted tasks succeed immediately with a quality score of 0.9.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTranslator {
    script: Arc<Mutex<Script>>,
    call_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl ScriptedTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `times` calls for `task_id` fail with `message`
    pub fn fail_times(self, task_id: &str, times: u32, message: &str) -> Self {
        self.fail_with(task_id, times, TranslationError::new(message))
    }

    pub fn fail_with(self, task_id: &str, times: u32, error: TranslationError) -> Self {
        self.script
            .lock()
            .unwrap()
            .failures
            .insert(task_id.to_string(), (times, error));
        self
    }

    /// Calls for `task_id` panic instead of returning
    pub fn panic_on(self, task_id: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .panics
            .insert(task_id.to_string());
        self
    }

    pub fn with_quality(self, task_id: &str, quality: f64) -> Self {
        self.script
            .lock()
            .unwrap()
            .quality
            .insert(task_id.to_string(), quality);
        self
    }

    /// Every call waits `latency` on the tokio clock before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn call_count_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Task ids in the order the translator was invoked
    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, task_id: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|id| id.as_str() == task_id)
            .count()
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, task: &Task) -> Result<TranslatedContent, TranslationError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        // The lock is released before any await or panic.
        let (should_panic, failure, quality) = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(task.id.clone());
            let should_panic = script.panics.contains(&task.id);
            let failure = match script.failures.get_mut(&task.id) {
                Some((remaining, error)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(error.clone())
                }
                _ => None,
            };
            let quality = script.quality.get(&task.id).copied().unwrap_or(0.9);
            (should_panic, failure, quality)
        };

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if should_panic {
            panic!("scripted translator panic for {}", task.id);
        }
        if let Some(error) = failure {
            return Err(error);
        }

        Ok(TranslatedContent {
            task_id: task.id.clone(),
            content: format!("[{}] translated {}", task.target_locale, task.id),
            quality_score: Some(quality),
        })
    }
}

/// `Sleeper` that records the requested durations and returns immediately
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps.lock().unwrap().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{TaskBuilder, TaskHistoryBuilder};

    #[tokio::test]
    async fn test_history_store_defaults_to_empty_history() {
        let store = MockHistoryStore::new();
        let task = TaskBuilder::new("t-1").build();
        let history = store.fetch_history(&task.identity()).await.unwrap();
        assert!(!history.has_history());
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_history_store_seeded_and_failing() {
        let task = TaskBuilder::new("t-1").build();
        let store = MockHistoryStore::new()
            .with_history(task.identity(), TaskHistoryBuilder::new().with_attempts(3).build());
        assert_eq!(
            store.fetch_history(&task.identity()).await.unwrap().attempt_count,
            3
        );

        let failing = MockHistoryStore::new().failing();
        assert!(matches!(
            failing.fetch_history(&task.identity()).await,
            Err(SchedulerError::HistoryLookup(_))
        ));
    }

    #[tokio::test]
    async fn test_scripted_translator_fails_then_succeeds() {
        let translator = ScriptedTranslator::new().fail_times("t-1", 2, "timeout");
        let task = TaskBuilder::new("t-1").build();

        assert!(translator.translate(&task).await.is_err());
        assert!(translator.translate(&task).await.is_err());
        let content = translator.translate(&task).await.unwrap();

        assert_eq!(content.quality_score, Some(0.9));
        assert_eq!(translator.call_count(), 3);
        assert_eq!(translator.calls_for("t-1"), 3);
        assert_eq!(translator.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_millis(1000)).await;
        sleeper.sleep(Duration::from_millis(2000)).await;
        assert_eq!(sleeper.total(), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_load_provider_variants() {
        let provider = FixedLoadProvider::new(0.5);
        let snapshot = provider.fetch_system_load().await.unwrap();
        assert_eq!(snapshot.active_job_count, 10);

        assert!(!FixedLoadProvider::non_finite()
            .fetch_system_load()
            .await
            .unwrap()
            .is_finite());
        assert!(FixedLoadProvider::failing().fetch_system_load().await.is_err());
    }
}
