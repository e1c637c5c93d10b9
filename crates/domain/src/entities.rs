use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decisions::{DecisionLogExport, SkipVerdict};
use crate::errors::ErrorClass;
use crate::value_objects::{Priority, TaskIdentity};

/// 可翻译的资源类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Product,
    Collection,
    Page,
    Article,
    Blog,
    Menu,
    ShopPolicy,
    Metafield,
    Theme,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Product => "product",
            ResourceType::Collection => "collection",
            ResourceType::Page => "page",
            ResourceType::Article => "article",
            ResourceType::Blog => "blog",
            ResourceType::Menu => "menu",
            ResourceType::ShopPolicy => "shop_policy",
            ResourceType::Metafield => "metafield",
            ResourceType::Theme => "theme",
            ResourceType::Other => "other",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 翻译任务：一个资源在一个目标语言下的工作单元
///
/// 创建后不再修改，整个运行过程中通过 `id` 引用。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub resource_type: ResourceType,
    /// 跨语言共享的资源标识，缺省时使用 `id`
    pub resource_id: Option<String>,
    pub content_size: u64,
    pub target_locale: String,
    pub priority_hint: Option<Priority>,
    /// 为 true 时绕过跳过策略
    pub forced: bool,
    /// 当前内容的摘要，与历史中的摘要相同表示内容未变
    pub content_hash: Option<String>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        resource_type: ResourceType,
        content_size: u64,
        target_locale: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type,
            resource_id: None,
            content_size,
            target_locale: target_locale.into(),
            priority_hint: None,
            forced: false,
            content_hash: None,
        }
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_priority_hint(mut self, priority: Priority) -> Self {
        self.priority_hint = Some(priority);
        self
    }

    pub fn with_forced(mut self, forced: bool) -> Self {
        self.forced = forced;
        self
    }

    pub fn with_content_hash(mut self, content_hash: impl Into<String>) -> Self {
        self.content_hash = Some(content_hash.into());
        self
    }

    pub fn identity(&self) -> TaskIdentity {
        let resource_key = self.resource_id.as_deref().unwrap_or(&self.id);
        TaskIdentity::new(resource_key, self.target_locale.clone())
    }

    pub fn priority(&self) -> Priority {
        self.priority_hint.unwrap_or_default()
    }
}

/// 同一任务身份在历次运行中的聚合结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskHistory {
    pub attempt_count: u32,
    pub success_count: u32,
    pub last_outcome_at: Option<DateTime<Utc>>,
    /// 0-1 之间的平均质量分
    pub average_quality_score: Option<f64>,
    pub last_content_hash: Option<String>,
    pub average_latency_ms: Option<f64>,
}

impl TaskHistory {
    pub fn has_history(&self) -> bool {
        self.attempt_count > 0
    }

    pub fn has_prior_success(&self) -> bool {
        self.success_count > 0
    }

    /// 历史失败率，没有历史时返回 None
    pub fn failure_rate(&self) -> Option<f64> {
        if self.attempt_count == 0 {
            return None;
        }
        let successes = self.success_count.min(self.attempt_count) as f64;
        Some(1.0 - successes / self.attempt_count as f64)
    }
}

/// 翻译结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslatedContent {
    pub task_id: String,
    pub content: String,
    pub quality_score: Option<f64>,
}

/// 任务在一次运行中的状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Skipped,
    Scheduled,
    Running,
    Retrying,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Skipped | TaskState::Succeeded | TaskState::Failed
        )
    }

    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Skipped)
                | (Pending, Scheduled)
                | (Scheduled, Running)
                | (Scheduled, Failed)
                | (Running, Succeeded)
                | (Running, Retrying)
                | (Running, Failed)
                | (Retrying, Running)
                | (Retrying, Failed)
        )
    }
}

/// 一个批次：按优先级排好序的、固定大小的任务切片
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub batch_index: usize,
    pub tasks: Vec<Task>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcomeStatus {
    Success,
    Failed,
}

/// 单个任务在批次中的执行结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskOutcome {
    pub task_id: String,
    pub status: TaskOutcomeStatus,
    /// 实际调用翻译操作的次数，首次调用计为 1
    pub attempts: u32,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub error_class: Option<ErrorClass>,
    pub quality_score: Option<f64>,
}

impl TaskOutcome {
    pub fn success(task_id: impl Into<String>, attempts: u32, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskOutcomeStatus::Success,
            attempts,
            duration_ms,
            error: None,
            error_class: None,
            quality_score: None,
        }
    }

    pub fn failed(
        task_id: impl Into<String>,
        attempts: u32,
        duration_ms: u64,
        error: impl Into<String>,
        error_class: Option<ErrorClass>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskOutcomeStatus::Failed,
            attempts,
            duration_ms,
            error: Some(error.into()),
            error_class,
            quality_score: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskOutcomeStatus::Success)
    }

    /// 首次调用之后的重试次数
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// 一个批次的执行记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub batch_id: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub per_task_results: Vec<TaskOutcome>,
    pub duration_ms: u64,
}

impl Job {
    pub fn success_count(&self) -> usize {
        self.per_task_results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.per_task_results.len() - self.success_count()
    }

    /// 至少重试过一次的任务数
    pub fn retried_count(&self) -> usize {
        self.per_task_results
            .iter()
            .filter(|r| r.retries() > 0)
            .count()
    }
}

/// 被策略跳过或推迟的任务
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedTask {
    pub task: Task,
    pub decision: SkipVerdict,
    pub reasoning: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunStats {
    pub total: usize,
    pub translated: usize,
    pub failed: usize,
    /// 跳过与推迟的任务总数
    pub skipped_count: usize,
    pub deferred_count: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl RunStats {
    pub fn duration_ms(&self) -> u64 {
        (self.ended_at - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// 一次 `schedule_run` 调用的完整结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    /// 通过跳过策略、进入批次的任务数
    pub scheduled: usize,
    pub batch_size: usize,
    pub skipped: Vec<SkippedTask>,
    pub jobs: Vec<Job>,
    pub stats: RunStats,
    pub estimated_time_ms: u64,
    pub cancelled: bool,
    pub decision_log: DecisionLogExport,
}

impl RunResult {
    pub fn outcomes(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.jobs.iter().flat_map(|job| job.per_task_results.iter())
    }

    pub fn outcome_for(&self, task_id: &str) -> Option<&TaskOutcome> {
        self.outcomes().find(|outcome| outcome.task_id == task_id)
    }

    pub fn skipped_for(&self, task_id: &str) -> Option<&SkippedTask> {
        self.skipped.iter().find(|skipped| skipped.task.id == task_id)
    }
}

/// 用于资源预测的历史运行摘要
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub task_count: usize,
    pub duration_ms: u64,
}

impl From<&RunResult> for RunRecord {
    fn from(result: &RunResult) -> Self {
        Self {
            task_count: result.scheduled,
            duration_ms: result.stats.duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Planning,
    Executing,
    Completed,
    Cancelled,
    /// 输入未通过校验，运行没有开始
    Rejected,
}

/// 运行中的进度快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunProgress {
    pub run_id: Uuid,
    pub phase: RunPhase,
    pub total: usize,
    pub skipped: usize,
    pub scheduled: usize,
    pub total_batches: usize,
    pub completed_batches: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub updated_at: DateTime<Utc>,
}

impl RunProgress {
    pub fn new(run_id: Uuid, total: usize) -> Self {
        Self {
            run_id,
            phase: RunPhase::Planning,
            total,
            skipped: 0,
            scheduled: 0,
            total_batches: 0,
            completed_batches: 0,
            succeeded: 0,
            failed: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.phase,
            RunPhase::Completed | RunPhase::Cancelled | RunPhase::Rejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_identity_prefers_resource_id() {
        let task = Task::new("t-1", ResourceType::Product, 120, "de")
            .with_resource_id("gid://shop/Product/9");
        assert_eq!(task.identity().resource_key, "gid://shop/Product/9");

        let bare = Task::new("t-2", ResourceType::Page, 80, "de");
        assert_eq!(bare.identity().resource_key, "t-2");
        assert_eq!(bare.priority(), Priority::Normal);
    }

    #[test]
    fn test_rejected_run_is_finished() {
        let mut progress = RunProgress::new(Uuid::new_v4(), 3);
        assert!(!progress.is_finished());
        progress.phase = RunPhase::Rejected;
        assert!(progress.is_finished());
        assert_eq!(
            serde_json::to_string(&progress.phase).unwrap(),
            "\"rejected\""
        );
    }

    #[test]
    fn test_history_failure_rate() {
        let empty = TaskHistory::default();
        assert!(empty.failure_rate().is_none());
        assert!(!empty.has_history());

        let history = TaskHistory {
            attempt_count: 4,
            success_count: 3,
            ..TaskHistory::default()
        };
        assert_eq!(history.failure_rate(), Some(0.25));
        assert!(history.has_prior_success());
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        let all = [
            TaskState::Pending,
            TaskState::Skipped,
            TaskState::Scheduled,
            TaskState::Running,
            TaskState::Retrying,
            TaskState::Succeeded,
            TaskState::Failed,
        ];
        for from in all.iter().filter(|s| s.is_terminal()) {
            for to in all {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
        assert!(TaskState::Running.can_transition_to(TaskState::Retrying));
        assert!(TaskState::Retrying.can_transition_to(TaskState::Running));
        assert!(!TaskState::Pending.can_transition_to(TaskState::Running));
    }

    #[test]
    fn test_job_counters() {
        let job = Job {
            batch_id: 0,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            per_task_results: vec![
                TaskOutcome::success("a", 1, 10),
                TaskOutcome::success("b", 3, 10),
                TaskOutcome::failed("c", 2, 10, "timeout", Some(ErrorClass::Temporary)),
            ],
            duration_ms: 30,
        };
        assert_eq!(job.success_count(), 2);
        assert_eq!(job.failure_count(), 1);
        assert_eq!(job.retried_count(), 2);
    }
}
