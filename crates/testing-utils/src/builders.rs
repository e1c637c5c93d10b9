//! Test data builders for creating test entities
//!
//! Builders start from sensible defaults so a test only spells out the
//! fields it actually cares about.

use chrono::Utc;
use l10n_domain::{Priority, ResourceType, Task, TaskHistory};

/// Builder for creating test `Task` entities
///
/// Defaults: a 500 byte `Product` resource targeting `fr`, normal priority,
/// not forced, no content hash.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            task: Task::new(id, ResourceType::Product, 500, "fr"),
        }
    }

    pub fn with_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.task.resource_type = resource_type;
        self
    }

    pub fn with_resource_id(mut self, resource_id: &str) -> Self {
        self.task.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_content_size(mut self, content_size: u64) -> Self {
        self.task.content_size = content_size;
        self
    }

    pub fn with_target_locale(mut self, locale: &str) -> Self {
        self.task.target_locale = locale.to_string();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.task.priority_hint = Some(priority);
        self
    }

    pub fn with_forced(mut self, forced: bool) -> Self {
        self.task.forced = forced;
        self
    }

    pub fn with_content_hash(mut self, hash: &str) -> Self {
        self.task.content_hash = Some(hash.to_string());
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Builder for creating test `TaskHistory` records
///
/// Starts from an empty history, i.e. a task that was never attempted.
#[derive(Default)]
pub struct TaskHistoryBuilder {
    history: TaskHistory,
}

impl TaskHistoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.history.attempt_count = attempts;
        if self.history.last_outcome_at.is_none() && attempts > 0 {
            self.history.last_outcome_at = Some(Utc::now());
        }
        self
    }

    pub fn with_successes(mut self, successes: u32) -> Self {
        self.history.success_count = successes;
        self
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.history.average_quality_score = Some(quality);
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: f64) -> Self {
        self.history.average_latency_ms = Some(latency_ms);
        self
    }

    pub fn with_content_hash(mut self, hash: &str) -> Self {
        self.history.last_content_hash = Some(hash.to_string());
        self
    }

    pub fn build(self) -> TaskHistory {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder_defaults() {
        let task = TaskBuilder::new("t-1").build();
        assert_eq!(task.id, "t-1");
        assert_eq!(task.resource_type, ResourceType::Product);
        assert_eq!(task.content_size, 500);
        assert_eq!(task.priority(), Priority::Normal);
        assert!(!task.forced);
    }

    #[test]
    fn test_history_builder() {
        let history = TaskHistoryBuilder::new()
            .with_attempts(4)
            .with_successes(3)
            .with_quality(0.8)
            .build();
        assert!(history.has_prior_success());
        assert_eq!(history.failure_rate(), Some(0.25));
        assert!(history.last_outcome_at.is_some());
    }
}
