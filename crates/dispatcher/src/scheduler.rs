use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use serde_json::json;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace, warn, Instrument};
use uuid::Uuid;

use l10n_core::{
    AppConfig, PolicyConfig, RetryPolicyConfig, SchedulerConfig, SchedulerError, SchedulerResult,
};
use l10n_domain::{
    Batch, BatchContext, BatchSizeDecision, DecisionKind, ErrorClassifier, HistoryStore, Job,
    LoadProvider, Priority, RetryContext, RunOptions, RunPhase, RunProgress, RunResult, RunStats,
    SkipVerdict, SkippedTask, Sleeper, Task, TaskOutcome, TaskState, Translator, MIN_CONFIDENCE,
};
use l10n_infrastructure::{MetricsCollector, StructuredLogger, TokioSleeper};

use crate::decision_engine::DecisionEngine;
use crate::errors::PolicyError;
use crate::run_handle::{ProgressReporter, RunHandle};
use crate::scoring::{KeywordErrorClassifier, ScoringPolicy};

/// 内容越短得分越高：(大小上限, 加分)
const SIZE_BONUS_TIERS: [(u64, f64); 3] = [(1_000, 5.0), (5_000, 3.0), (10_000, 1.0)];

/// 翻译任务调度器
///
/// 每次运行都创建独立的决策引擎，多个运行可以并发执行而不共享评分状态。
pub struct TaskScheduler {
    history_store: Arc<dyn HistoryStore>,
    load_provider: Arc<dyn LoadProvider>,
    translator: Arc<dyn Translator>,
    sleeper: Arc<dyn Sleeper>,
    classifier: Arc<dyn ErrorClassifier>,
    policy: PolicyConfig,
    retry: RetryPolicyConfig,
    config: SchedulerConfig,
    metrics: Arc<MetricsCollector>,
}

impl TaskScheduler {
    pub fn new(
        history_store: Arc<dyn HistoryStore>,
        load_provider: Arc<dyn LoadProvider>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            history_store,
            load_provider,
            translator,
            sleeper: Arc::new(TokioSleeper),
            classifier: Arc::new(KeywordErrorClassifier::default()),
            policy: PolicyConfig::default(),
            retry: RetryPolicyConfig::default(),
            config: SchedulerConfig::default(),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_policy_config(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryPolicyConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_app_config(self, config: &AppConfig) -> Self {
        self.with_policy_config(config.policy.clone())
            .with_retry_config(config.retry.clone())
            .with_scheduler_config(config.scheduler.clone())
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    fn new_engine(&self) -> DecisionEngine {
        DecisionEngine::new(
            self.history_store.clone(),
            self.policy.clone(),
            self.retry.clone(),
        )
        .with_classifier(self.classifier.clone())
    }

    /// 执行一次完整的调度运行
    ///
    /// 只有输入结构非法时返回错误；单个任务的失败记录在 `RunResult.jobs` 中。
    pub async fn schedule_run(
        &self,
        tasks: Vec<Task>,
        options: RunOptions,
    ) -> SchedulerResult<RunResult> {
        self.run(
            Uuid::new_v4(),
            tasks,
            options,
            CancellationToken::new(),
            ProgressReporter::default(),
        )
        .await
    }

    /// 在后台启动一次运行，返回可查询进度、取消与等待的句柄
    pub fn spawn_run(self: &Arc<Self>, tasks: Vec<Task>, options: RunOptions) -> RunHandle {
        let run_id = Uuid::new_v4();
        let (progress_tx, progress_rx) = watch::channel(RunProgress::new(run_id, tasks.len()));
        let cancel = CancellationToken::new();

        let scheduler = Arc::clone(self);
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            scheduler
                .run(
                    run_id,
                    tasks,
                    options,
                    token,
                    ProgressReporter::new(progress_tx),
                )
                .await
        });

        RunHandle::new(run_id, progress_rx, cancel, join)
    }

    async fn run(
        &self,
        run_id: Uuid,
        tasks: Vec<Task>,
        options: RunOptions,
        cancel: CancellationToken,
        progress: ProgressReporter,
    ) -> SchedulerResult<RunResult> {
        if let Err(e) = Self::validate_tasks(&tasks) {
            progress.update(|p| p.phase = RunPhase::Rejected);
            return Err(e);
        }
        if cancel.is_cancelled() {
            progress.update(|p| p.phase = RunPhase::Cancelled);
            return Err(SchedulerError::Cancelled);
        }

        let span = tracing::info_span!("schedule_run", run.id = %run_id, run.task_count = tasks.len());
        self.execute_run(run_id, tasks, options, &cancel, &progress)
            .instrument(span)
            .await
    }

    /// 校验任务列表：id 非空且唯一，目标语言非空
    pub fn validate_tasks(tasks: &[Task]) -> SchedulerResult<()> {
        let mut seen = HashSet::with_capacity(tasks.len());
        for task in tasks {
            if task.id.trim().is_empty() {
                return Err(SchedulerError::InvalidInput("任务 id 不能为空".to_string()));
            }
            if task.target_locale.trim().is_empty() {
                return Err(SchedulerError::InvalidInput(format!(
                    "任务 {} 缺少目标语言",
                    task.id
                )));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(SchedulerError::InvalidInput(format!(
                    "任务 id 重复: {}",
                    task.id
                )));
            }
        }
        Ok(())
    }

    async fn execute_run(
        &self,
        run_id: Uuid,
        tasks: Vec<Task>,
        options: RunOptions,
        cancel: &CancellationToken,
        progress: &ProgressReporter,
    ) -> SchedulerResult<RunResult> {
        let started_at = Utc::now();
        let total = tasks.len();
        let run_label = run_id.to_string();

        let engine = self.new_engine();
        engine.start_session(format!("run {run_id}: {total} tasks"));

        let profile = ScoringPolicy::resource_profile(&tasks);
        engine.add_thought(
            format!(
                "resource profile: {} tasks, average size {:.0}, max {}, min {}",
                profile.count, profile.avg_size, profile.max_size, profile.min_size
            ),
            serde_json::to_value(&profile).unwrap_or_default(),
        );

        let batch_decision = match self.load_provider.fetch_system_load().await {
            Ok(snapshot) => {
                let mut context = BatchContext::new(snapshot);
                context.batch_size_cap = options.batch_size_cap;
                engine.optimal_batch_size(&tasks, &context)
            }
            Err(e) => {
                StructuredLogger::log_system_error("task_scheduler", "fetch_system_load", &e);
                let decision = engine
                    .fallback_batch_size(&tasks, &PolicyError::UnusableLoadSample(e.to_string()));
                match options.batch_size_cap {
                    Some(cap) if decision.batch_size > 0 => BatchSizeDecision {
                        batch_size: decision.batch_size.min(cap.max(1)),
                        ..decision
                    },
                    _ => decision,
                }
            }
        };
        let batch_size = batch_decision.batch_size;
        if batch_decision.metrics.fallback {
            self.metrics.record_policy_fallback();
        }
        self.metrics.update_batch_size(batch_size);
        self.metrics
            .update_load_score(batch_decision.metrics.load_score);

        let prioritized = self.prioritize(tasks, &options);
        let order: Vec<String> = prioritized.iter().map(|t| t.id.clone()).collect();
        engine.add_thought(
            format!(
                "prioritised {} tasks, leading with [{}]",
                order.len(),
                order.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
            ),
            json!({ "order": order }),
        );

        let mut survivors = Vec::new();
        let mut skipped = Vec::new();
        let mut deferred_count = 0;
        for task in prioritized {
            let mut context = options.skip_context_for(&task);
            if context.quality_threshold.is_none() {
                context.quality_threshold = Some(self.config.quality_threshold);
            }

            let decision = engine.should_skip(&task, &context).await;
            match decision.decision {
                SkipVerdict::Translate => survivors.push(task),
                verdict => {
                    if verdict == SkipVerdict::Defer {
                        deferred_count += 1;
                        self.metrics.record_deferral();
                    } else {
                        self.metrics.record_skip();
                    }
                    trace!(task.id = %task.id, from = ?TaskState::Pending, to = ?TaskState::Skipped, "Task state changed");
                    skipped.push(SkippedTask {
                        task,
                        decision: verdict,
                        reasoning: decision.reasoning,
                        confidence: decision.confidence,
                    });
                }
            }
        }

        let latency_ms = options
            .historical_latency_ms
            .map(|ms| ms as f64)
            .or_else(|| engine.cached_average_latency_ms(&survivors));
        let batches = Self::partition(survivors, batch_size);
        let scheduled: usize = batches.iter().map(Batch::len).sum();
        let estimated_time_ms =
            self.estimate_completion_ms(scheduled, batch_size, batches.len(), latency_ms);
        engine.add_thought(
            format!(
                "{scheduled} tasks scheduled in {} batches of up to {batch_size}, {} skipped, estimated {estimated_time_ms} ms",
                batches.len(),
                skipped.len()
            ),
            json!({
                "scheduled": scheduled,
                "batches": batches.len(),
                "skipped": skipped.len(),
                "deferred": deferred_count,
                "estimated_time_ms": estimated_time_ms,
                "latency_ms": latency_ms,
            }),
        );

        let total_batches = batches.len();
        let skipped_total = skipped.len();
        progress.update(|p| {
            p.phase = RunPhase::Executing;
            p.skipped = skipped_total;
            p.scheduled = scheduled;
            p.total_batches = total_batches;
        });
        StructuredLogger::log_run_started(&run_label, total, batch_size);

        let batch_delay_ms = options.batch_delay_ms.unwrap_or(self.config.batch_delay_ms);
        let mut jobs = Vec::with_capacity(total_batches);
        let mut cancelled = false;
        for batch in batches {
            if batch.batch_index > 0 && batch_delay_ms > 0 {
                self.sleeper
                    .sleep(Duration::from_millis(batch_delay_ms))
                    .await;
            }
            if cancel.is_cancelled() {
                cancelled = true;
                engine.add_thought(
                    format!("run cancelled before batch {}", batch.batch_index),
                    json!({ "remaining_batches": total_batches - batch.batch_index }),
                );
                break;
            }

            let job = self.run_batch(&engine, &run_label, &batch, cancel).await;
            let (succeeded, failed) = (job.success_count(), job.failure_count());
            progress.update(|p| {
                p.completed_batches += 1;
                p.succeeded += succeeded;
                p.failed += failed;
            });
            jobs.push(job);
        }
        let cancelled = cancelled || cancel.is_cancelled();

        let translated: usize = jobs.iter().map(Job::success_count).sum();
        let failed: usize = jobs.iter().map(Job::failure_count).sum();
        let stats = RunStats {
            total,
            translated,
            failed,
            skipped_count: skipped.len(),
            deferred_count,
            started_at,
            ended_at: Utc::now(),
        };

        engine.record_decision(
            &run_label,
            DecisionKind::Run,
            if cancelled { "cancelled" } else { "completed" },
            &format!(
                "{translated} translated, {failed} failed, {} skipped across {} of {total_batches} batches",
                stats.skipped_count,
                jobs.len()
            ),
        );
        StructuredLogger::log_run_completed(
            &run_label,
            translated,
            failed,
            stats.skipped_count,
            stats.duration_ms(),
            cancelled,
        );
        progress.update(|p| {
            p.phase = if cancelled {
                RunPhase::Cancelled
            } else {
                RunPhase::Completed
            };
        });

        Ok(RunResult {
            run_id,
            scheduled,
            batch_size,
            skipped,
            jobs,
            stats,
            estimated_time_ms,
            cancelled,
            decision_log: engine.export_log(),
        })
    }

    /// 独立执行一个批次，使用单独的决策会话
    pub async fn execute_batch(&self, batch: &Batch) -> Job {
        let engine = self.new_engine();
        engine.start_session(format!("batch {}", batch.batch_index));
        let label = engine.session_id().to_string();
        self.run_batch(&engine, &label, batch, &CancellationToken::new())
            .await
    }

    async fn run_batch(
        &self,
        engine: &DecisionEngine,
        run_label: &str,
        batch: &Batch,
        cancel: &CancellationToken,
    ) -> Job {
        let started_at = Utc::now();
        let start = Instant::now();
        StructuredLogger::log_batch_started(run_label, batch.batch_index, batch.len());

        let attempts = join_all(
            batch
                .tasks
                .iter()
                .map(|task| self.translate_with_retry(engine, task, cancel)),
        );

        let outcomes = match AssertUnwindSafe(attempts).catch_unwind().await {
            Ok(outcomes) => outcomes,
            Err(panic) => {
                let reasoning = format!(
                    "batch {} aborted by unexpected failure: {}",
                    batch.batch_index,
                    panic_message(panic.as_ref())
                );
                error!(
                    event = "batch_failed",
                    batch.index = batch.batch_index,
                    batch.task_count = batch.len(),
                    error = %reasoning,
                    "Batch execution aborted"
                );
                engine.record_decision_with_confidence(
                    &format!("batch-{}", batch.batch_index),
                    DecisionKind::BatchFailure,
                    "failed",
                    &reasoning,
                    MIN_CONFIDENCE,
                );
                let elapsed = elapsed_ms(start);
                batch
                    .tasks
                    .iter()
                    .map(|task| TaskOutcome::failed(&task.id, 1, elapsed, reasoning.clone(), None))
                    .collect()
            }
        };

        for (task, outcome) in batch.tasks.iter().zip(&outcomes) {
            self.metrics
                .record_task_outcome(outcome.is_success(), outcome.duration_ms);
            if let Err(e) = self
                .history_store
                .record_outcome(&task.identity(), outcome)
                .await
            {
                warn!(task.id = %task.id, error = %e, "Failed to record task outcome");
            }
        }

        let duration_ms = elapsed_ms(start);
        let job = Job {
            batch_id: batch.batch_index,
            started_at,
            ended_at: Utc::now(),
            per_task_results: outcomes,
            duration_ms,
        };

        self.metrics.record_batch(duration_ms);
        StructuredLogger::log_batch_completed(
            run_label,
            batch.batch_index,
            job.success_count(),
            job.failure_count(),
            duration_ms,
        );
        job
    }

    /// 执行单个任务，失败时按重试策略重试
    async fn translate_with_retry(
        &self,
        engine: &DecisionEngine,
        task: &Task,
        cancel: &CancellationToken,
    ) -> TaskOutcome {
        let start = Instant::now();
        let mut state = TaskState::Scheduled;
        let mut attempts = 0;
        let mut retries = 0;

        loop {
            if cancel.is_cancelled() {
                transition(&task.id, &mut state, TaskState::Failed);
                return TaskOutcome::failed(
                    &task.id,
                    attempts,
                    elapsed_ms(start),
                    "run cancelled before next attempt",
                    None,
                );
            }

            transition(&task.id, &mut state, TaskState::Running);
            attempts += 1;

            let error = match self.translator.translate(task).await {
                Ok(content) => {
                    transition(&task.id, &mut state, TaskState::Succeeded);
                    let mut outcome = TaskOutcome::success(&task.id, attempts, elapsed_ms(start));
                    outcome.quality_score = content.quality_score;
                    return outcome;
                }
                Err(error) => error,
            };

            let decision = engine.retry_strategy(&RetryContext::new(task, &error, retries));
            if !decision.should_retry {
                transition(&task.id, &mut state, TaskState::Failed);
                StructuredLogger::log_task_failed(
                    &task.id,
                    attempts,
                    decision.error_class.as_str(),
                    &error.message,
                );
                return TaskOutcome::failed(
                    &task.id,
                    attempts,
                    elapsed_ms(start),
                    error.message,
                    Some(decision.error_class),
                );
            }

            transition(&task.id, &mut state, TaskState::Retrying);
            retries += 1;
            self.metrics.record_retry(decision.error_class.as_str());
            StructuredLogger::log_task_retry(
                &task.id,
                retries,
                decision.max_attempts,
                decision.delay_ms,
                &decision.reasoning,
            );

            if cancel.is_cancelled() {
                transition(&task.id, &mut state, TaskState::Failed);
                return TaskOutcome::failed(
                    &task.id,
                    attempts,
                    elapsed_ms(start),
                    format!("run cancelled before retry: {}", error.message),
                    Some(decision.error_class),
                );
            }
            self.sleeper
                .sleep(Duration::from_millis(decision.delay_ms))
                .await;
        }
    }

    /// 任务优先级得分
    pub fn priority_score(&self, task: &Task, options: &RunOptions) -> f64 {
        let type_weight = options
            .type_weights
            .get(&task.resource_type)
            .copied()
            .unwrap_or_else(|| self.config.weight_for(task.resource_type.as_str()));

        let size_bonus = SIZE_BONUS_TIERS
            .iter()
            .find(|(limit, _)| task.content_size < *limit)
            .map(|(_, bonus)| *bonus)
            .unwrap_or(0.0);

        let hint_bonus = if task.priority_hint == Some(Priority::High) {
            self.config.priority_hint_bonus
        } else {
            0.0
        };

        let boost = if options.priority_ids.contains(&task.id) {
            self.config.priority_boost
        } else {
            0.0
        };

        type_weight + size_bonus + hint_bonus + boost
    }

    /// 按优先级得分稳定降序排列，同分保持原顺序
    pub fn prioritize(&self, tasks: Vec<Task>, options: &RunOptions) -> Vec<Task> {
        let mut scored: Vec<(f64, Task)> = tasks
            .into_iter()
            .map(|task| (self.priority_score(&task, options), task))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().map(|(_, task)| task).collect()
    }

    /// 按固定大小切分批次，最后一个批次可能更短
    pub fn partition(tasks: Vec<Task>, batch_size: usize) -> Vec<Batch> {
        if tasks.is_empty() {
            return Vec::new();
        }

        let size = batch_size.max(1);
        let mut batches = Vec::with_capacity(tasks.len().div_ceil(size));
        let mut remaining = tasks.into_iter().peekable();
        while remaining.peek().is_some() {
            let chunk: Vec<Task> = remaining.by_ref().take(size).collect();
            batches.push(Batch {
                batch_index: batches.len(),
                tasks: chunk,
            });
        }
        batches
    }

    /// 完成时间估计：平均耗时 × 任务数 / 并发度 + 每批固定开销
    ///
    /// `latency_ms` 为空时使用配置的默认任务耗时。
    pub fn estimate_completion_ms(
        &self,
        scheduled: usize,
        batch_size: usize,
        batch_count: usize,
        latency_ms: Option<f64>,
    ) -> u64 {
        if scheduled == 0 {
            return 0;
        }

        let latency = latency_ms.unwrap_or(self.config.default_task_latency_ms as f64);
        let work = latency * scheduled as f64 / batch_size.max(1) as f64;
        let overhead = batch_count as f64 * self.config.batch_overhead_ms as f64;
        (work + overhead).round() as u64
    }
}

fn transition(task_id: &str, state: &mut TaskState, next: TaskState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid transition {state:?} -> {next:?}"
    );
    trace!(task.id = task_id, from = ?state, to = ?next, "Task state changed");
    *state = next;
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis().min(u64::MAX as u128) as u64
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l10n_domain::ResourceType;
    use l10n_testing_utils::{
        FixedLoadProvider, MockHistoryStore, RecordingSleeper, ScriptedTranslator, TaskBuilder,
    };

    fn scheduler(translator: ScriptedTranslator) -> TaskScheduler {
        TaskScheduler::new(
            Arc::new(MockHistoryStore::new()),
            Arc::new(FixedLoadProvider::new(0.2)),
            Arc::new(translator),
        )
        .with_sleeper(Arc::new(RecordingSleeper::new()))
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_priority_order_is_stable() {
        let scheduler = scheduler(ScriptedTranslator::new());
        let tasks = vec![
            TaskBuilder::new("page-a").with_resource_type(ResourceType::Page).build(),
            TaskBuilder::new("product-a").with_resource_type(ResourceType::Product).build(),
            TaskBuilder::new("page-b").with_resource_type(ResourceType::Page).build(),
            TaskBuilder::new("theme-a").with_resource_type(ResourceType::Theme).build(),
            TaskBuilder::new("product-b").with_resource_type(ResourceType::Product).build(),
        ];

        let ordered = scheduler.prioritize(tasks, &RunOptions::new());
        assert_eq!(
            ids(&ordered),
            vec!["product-a", "product-b", "page-a", "page-b", "theme-a"]
        );
    }

    #[test]
    fn test_priority_ids_and_size_bonus() {
        let scheduler = scheduler(ScriptedTranslator::new());
        let tasks = vec![
            TaskBuilder::new("big")
                .with_resource_type(ResourceType::Product)
                .with_content_size(20_000)
                .build(),
            TaskBuilder::new("small")
                .with_resource_type(ResourceType::Product)
                .with_content_size(200)
                .build(),
            TaskBuilder::new("menu")
                .with_resource_type(ResourceType::Menu)
                .with_content_size(200)
                .build(),
        ];

        let options = RunOptions::new().with_priority_ids(["menu"]);
        let ordered = scheduler.prioritize(tasks, &options);
        assert_eq!(ids(&ordered), vec!["menu", "small", "big"]);

        let overridden = RunOptions::new().with_type_weight(ResourceType::Menu, 100.0);
        let menu = TaskBuilder::new("m").with_resource_type(ResourceType::Menu).build();
        assert!(scheduler.priority_score(&menu, &overridden) > 100.0);
    }

    #[test]
    fn test_partition_covers_every_task_once() {
        for count in [0, 1, 5, 12, 13, 37] {
            for size in [1, 3, 5, 12, 50] {
                let tasks: Vec<Task> = (0..count)
                    .map(|i| TaskBuilder::new(format!("t-{i}")).build())
                    .collect();
                let batches = TaskScheduler::partition(tasks.clone(), size);

                let flattened: Vec<Task> =
                    batches.iter().flat_map(|b| b.tasks.clone()).collect();
                assert_eq!(flattened, tasks, "count {count} size {size}");
                assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));
                for (index, batch) in batches.iter().enumerate() {
                    assert_eq!(batch.batch_index, index);
                }
            }
        }
    }

    #[test]
    fn test_estimate_completion() {
        let scheduler = scheduler(ScriptedTranslator::new());
        // 2000 * 12 / 12 + 1 * 500
        assert_eq!(scheduler.estimate_completion_ms(12, 12, 1, None), 2500);
        assert_eq!(scheduler.estimate_completion_ms(10, 5, 2, Some(1000.0)), 3000);
        assert_eq!(scheduler.estimate_completion_ms(0, 0, 0, Some(1000.0)), 0);
    }

    #[test]
    fn test_validate_tasks() {
        let ok = vec![TaskBuilder::new("a").build(), TaskBuilder::new("b").build()];
        assert!(TaskScheduler::validate_tasks(&ok).is_ok());
        assert!(TaskScheduler::validate_tasks(&[]).is_ok());

        let duplicate = vec![TaskBuilder::new("a").build(), TaskBuilder::new("a").build()];
        assert!(matches!(
            TaskScheduler::validate_tasks(&duplicate),
            Err(SchedulerError::InvalidInput(_))
        ));

        let empty_id = vec![TaskBuilder::new(" ").build()];
        assert!(TaskScheduler::validate_tasks(&empty_id).is_err());

        let no_locale = vec![TaskBuilder::new("a").with_target_locale("").build()];
        assert!(TaskScheduler::validate_tasks(&no_locale).is_err());
    }

    #[tokio::test]
    async fn test_translate_with_retry_counts_invocations() {
        let translator = ScriptedTranslator::new().fail_times("t-1", 2, "connection timed out");
        let calls = translator.call_count_handle();
        let scheduler = scheduler(translator);
        let engine = scheduler.new_engine();
        let task = TaskBuilder::new("t-1").build();

        let outcome = scheduler
            .translate_with_retry(&engine, &task, &CancellationToken::new())
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.retries(), 2);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_never_exceed_ceiling() {
        let translator = ScriptedTranslator::new().fail_times("t-1", 100, "ECONNREFUSED");
        let scheduler = scheduler(translator);
        let engine = scheduler.new_engine();
        let task = TaskBuilder::new("t-1").build();

        let outcome = scheduler
            .translate_with_retry(&engine, &task, &CancellationToken::new())
            .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.error.as_deref(), Some("ECONNREFUSED"));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_attempt() {
        let scheduler = scheduler(ScriptedTranslator::new());
        let engine = scheduler.new_engine();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = scheduler
            .translate_with_retry(&engine, &TaskBuilder::new("t-1").build(), &token)
            .await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts, 0);
    }

    #[tokio::test]
    async fn test_execute_batch_collects_every_outcome() {
        let translator = ScriptedTranslator::new()
            .fail_times("bad", 10, "invalid payload")
            .fail_times("flaky", 1, "timeout");
        let scheduler = scheduler(translator);
        let batch = Batch {
            batch_index: 0,
            tasks: vec![
                TaskBuilder::new("good").build(),
                TaskBuilder::new("bad").build(),
                TaskBuilder::new("flaky").build(),
            ],
        };

        let job = scheduler.execute_batch(&batch).await;
        assert_eq!(job.per_task_results.len(), 3);
        assert_eq!(job.success_count(), 2);
        assert_eq!(job.failure_count(), 1);

        let bad = &job.per_task_results[1];
        assert_eq!(bad.task_id, "bad");
        assert_eq!(bad.attempts, 1);
        assert_eq!(bad.error_class, Some(l10n_domain::ErrorClass::Invalid));
    }

    #[tokio::test]
    async fn test_panicking_translator_fails_whole_batch() {
        let translator = ScriptedTranslator::new().panic_on("boom");
        let scheduler = scheduler(translator);
        let batch = Batch {
            batch_index: 2,
            tasks: vec![
                TaskBuilder::new("fine").build(),
                TaskBuilder::new("boom").build(),
            ],
        };

        let job = scheduler.execute_batch(&batch).await;
        assert_eq!(job.per_task_results.len(), 2);
        assert_eq!(job.failure_count(), 2);
        assert!(job.per_task_results[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("aborted")));
    }
}
