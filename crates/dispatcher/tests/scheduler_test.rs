use std::sync::Arc;
use std::time::Duration;

use l10n_dispatcher::TaskScheduler;
use l10n_domain::{
    DecisionKind, HistoryStore, ResourceType, RunOptions, RunPhase, SkipVerdict, Task,
};
use l10n_infrastructure::InMemoryHistoryStore;
use l10n_testing_utils::{
    sample_tasks, FixedLoadProvider, MockHistoryStore, RecordingSleeper, ScriptedTranslator,
    TaskBuilder, TaskHistoryBuilder,
};

fn scheduler_with(
    history: Arc<dyn HistoryStore>,
    load: FixedLoadProvider,
    translator: ScriptedTranslator,
    sleeper: RecordingSleeper,
) -> TaskScheduler {
    TaskScheduler::new(history, Arc::new(load), Arc::new(translator))
        .with_sleeper(Arc::new(sleeper))
}

#[tokio::test]
async fn test_low_load_run_uses_single_batch() {
    let scheduler = scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::new(0.2),
        ScriptedTranslator::new(),
        RecordingSleeper::new(),
    );

    let result = scheduler
        .schedule_run(sample_tasks("p", 12), RunOptions::new())
        .await
        .unwrap();

    assert_eq!(result.batch_size, 12);
    assert_eq!(result.jobs.len(), 1);
    assert_eq!(result.scheduled, 12);
    assert_eq!(result.stats.translated, 12);
    assert_eq!(result.stats.failed, 0);
    assert!(result.skipped.is_empty());
    assert!(!result.cancelled);
}

#[tokio::test]
async fn test_every_task_is_accounted_for_exactly_once() {
    let seeded = TaskBuilder::new("seen").build();
    let history = MockHistoryStore::new().with_history(
        seeded.identity(),
        TaskHistoryBuilder::new()
            .with_attempts(2)
            .with_successes(2)
            .build(),
    );
    let translator = ScriptedTranslator::new().fail_times("broken", 10, "malformed source");
    let scheduler = scheduler_with(
        Arc::new(history),
        FixedLoadProvider::new(0.5),
        translator,
        RecordingSleeper::new(),
    );

    let mut tasks: Vec<Task> = sample_tasks("p", 7);
    tasks.push(seeded);
    tasks.push(TaskBuilder::new("broken").build());

    let options = RunOptions::new()
        .with_unchanged_ids(["seen"])
        .with_batch_size_cap(3);
    let result = scheduler.schedule_run(tasks, options).await.unwrap();

    let mut seen: Vec<String> = result
        .outcomes()
        .map(|o| o.task_id.clone())
        .chain(result.skipped.iter().map(|s| s.task.id.clone()))
        .collect();
    seen.sort();
    let mut expected: Vec<String> = (0..7).map(|i| format!("p-{i}")).collect();
    expected.push("broken".to_string());
    expected.push("seen".to_string());
    expected.sort();
    assert_eq!(seen, expected);

    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].decision, SkipVerdict::Skip);
    assert!(result.jobs.iter().all(|j| j.per_task_results.len() <= 3));
    assert_eq!(result.stats.failed, 1);
    assert_eq!(
        result.stats.translated + result.stats.failed + result.stats.skipped_count,
        9
    );
}

#[tokio::test]
async fn test_batch_delay_is_applied_between_batches() {
    let sleeper = RecordingSleeper::new();
    let scheduler = scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::new(0.2),
        ScriptedTranslator::new(),
        sleeper.clone(),
    );

    let options = RunOptions::new()
        .with_batch_size_cap(2)
        .with_batch_delay_ms(250);
    let result = scheduler
        .schedule_run(sample_tasks("p", 6), options)
        .await
        .unwrap();

    assert_eq!(result.jobs.len(), 3);
    assert_eq!(
        sleeper.recorded(),
        vec![Duration::from_millis(250), Duration::from_millis(250)]
    );
}

#[tokio::test]
async fn test_load_probe_failure_falls_back_to_small_batches() {
    let scheduler = scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::failing(),
        ScriptedTranslator::new(),
        RecordingSleeper::new(),
    );

    let result = scheduler
        .schedule_run(sample_tasks("p", 7), RunOptions::new())
        .await
        .unwrap();

    assert_eq!(result.batch_size, 3);
    assert_eq!(result.jobs.len(), 3);
    assert_eq!(result.stats.translated, 7);
    assert!(result
        .decision_log
        .decisions
        .iter()
        .any(|d| d.kind == DecisionKind::PolicyError));
}

#[tokio::test]
async fn test_non_finite_load_falls_back() {
    let scheduler = scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::non_finite(),
        ScriptedTranslator::new(),
        RecordingSleeper::new(),
    );

    let result = scheduler
        .schedule_run(sample_tasks("p", 2), RunOptions::new())
        .await
        .unwrap();
    assert_eq!(result.batch_size, 2);
    assert_eq!(result.stats.translated, 2);
}

#[tokio::test]
async fn test_temporary_failures_are_retried_with_backoff() {
    let sleeper = RecordingSleeper::new();
    let translator = ScriptedTranslator::new().fail_times("p-0", 2, "upstream timed out");
    let scheduler = scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::new(0.2),
        translator.clone(),
        sleeper.clone(),
    );

    let result = scheduler
        .schedule_run(sample_tasks("p", 1), RunOptions::new())
        .await
        .unwrap();

    let outcome = result.outcome_for("p-0").unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.attempts, 3);
    assert_eq!(translator.calls_for("p-0"), 3);
    assert_eq!(
        sleeper.recorded(),
        vec![Duration::from_millis(1000), Duration::from_millis(2000)]
    );
}

#[tokio::test]
async fn test_outcomes_feed_the_next_run() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let scheduler = scheduler_with(
        history.clone(),
        FixedLoadProvider::new(0.2),
        ScriptedTranslator::new(),
        RecordingSleeper::new(),
    );

    let first = scheduler
        .schedule_run(sample_tasks("p", 3), RunOptions::new())
        .await
        .unwrap();
    assert_eq!(first.stats.translated, 3);
    assert_eq!(history.len().await, 3);

    let second = scheduler
        .schedule_run(
            sample_tasks("p", 3),
            RunOptions::new().with_unchanged_ids(["p-0", "p-1", "p-2"]),
        )
        .await
        .unwrap();
    assert_eq!(second.skipped.len(), 3);
    assert!(second.jobs.is_empty());
    assert!(second
        .skipped
        .iter()
        .all(|s| s.reasoning.contains("unchanged")));
}

#[tokio::test]
async fn test_priority_order_is_preserved_within_batches() {
    let translator = ScriptedTranslator::new();
    let scheduler = scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::new(0.2),
        translator.clone(),
        RecordingSleeper::new(),
    );

    let tasks = vec![
        TaskBuilder::new("theme").with_resource_type(ResourceType::Theme).build(),
        TaskBuilder::new("page").with_resource_type(ResourceType::Page).build(),
        TaskBuilder::new("product").build(),
    ];
    let result = scheduler
        .schedule_run(tasks, RunOptions::new().with_batch_size_cap(1))
        .await
        .unwrap();

    let order: Vec<&str> = result
        .jobs
        .iter()
        .flat_map(|j| j.per_task_results.iter().map(|o| o.task_id.as_str()))
        .collect();
    assert_eq!(order, vec!["product", "page", "theme"]);
    assert_eq!(translator.calls(), vec!["product", "page", "theme"]);
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let scheduler = scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::new(0.2),
        ScriptedTranslator::new(),
        RecordingSleeper::new(),
    );

    let duplicate = vec![TaskBuilder::new("a").build(), TaskBuilder::new("a").build()];
    assert!(scheduler
        .schedule_run(duplicate, RunOptions::new())
        .await
        .is_err());

    let empty = scheduler
        .schedule_run(Vec::new(), RunOptions::new())
        .await
        .unwrap();
    assert_eq!(empty.batch_size, 0);
    assert!(empty.jobs.is_empty());
    assert_eq!(empty.stats.total, 0);
}

#[tokio::test]
async fn test_spawned_run_reports_progress() {
    let scheduler = Arc::new(scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::new(0.2),
        ScriptedTranslator::new(),
        RecordingSleeper::new(),
    ));

    let handle = scheduler.spawn_run(
        sample_tasks("p", 4),
        RunOptions::new().with_batch_size_cap(2),
    );
    let run_id = handle.run_id();
    let progress = handle.subscribe();

    let result = handle.wait().await.unwrap();
    assert_eq!(result.run_id, run_id);

    let last = progress.borrow().clone();
    assert_eq!(last.phase, RunPhase::Completed);
    assert_eq!(last.completed_batches, 2);
    assert_eq!(last.succeeded, 4);
    assert!(last.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_keeps_completed_batches() {
    let scheduler = Arc::new(scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::new(0.2),
        ScriptedTranslator::new().with_latency(Duration::from_millis(100)),
        RecordingSleeper::new(),
    ));

    let handle = scheduler.spawn_run(
        sample_tasks("p", 6),
        RunOptions::new().with_batch_size_cap(2),
    );
    let mut progress = handle.subscribe();
    progress
        .wait_for(|p| p.completed_batches >= 1)
        .await
        .map(|_| ())
        .unwrap();
    handle.cancel();
    assert!(handle.is_cancelled());

    let result = handle.wait().await.unwrap();
    assert!(result.cancelled);
    assert!(!result.jobs.is_empty());
    assert!(result.jobs.len() < 3);
    assert!(result.stats.translated < 6);
    assert_eq!(progress.borrow().phase, RunPhase::Cancelled);
}

#[tokio::test]
async fn test_estimate_uses_recorded_task_latency() {
    let tasks = sample_tasks("p", 4);
    let history = tasks.iter().fold(MockHistoryStore::new(), |store, task| {
        store.with_history(
            task.identity(),
            TaskHistoryBuilder::new().with_latency_ms(10_000.0).build(),
        )
    });
    let scheduler = scheduler_with(
        Arc::new(history),
        FixedLoadProvider::new(0.2),
        ScriptedTranslator::new(),
        RecordingSleeper::new(),
    );

    let result = scheduler
        .schedule_run(tasks.clone(), RunOptions::new())
        .await
        .unwrap();
    assert_eq!(result.scheduled, 4);
    assert_eq!(result.batch_size, 4);
    // 10000 * 4 / 4 + 1 * 500
    assert_eq!(result.estimated_time_ms, 10_500);

    let explicit = scheduler
        .schedule_run(tasks, RunOptions::new().with_historical_latency_ms(1000))
        .await
        .unwrap();
    assert_eq!(explicit.estimated_time_ms, 1_500);
}

#[tokio::test]
async fn test_estimate_without_history_uses_default_latency() {
    let scheduler = scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::new(0.2),
        ScriptedTranslator::new(),
        RecordingSleeper::new(),
    );

    let result = scheduler
        .schedule_run(sample_tasks("p", 4), RunOptions::new())
        .await
        .unwrap();
    // 2000 * 4 / 4 + 1 * 500
    assert_eq!(result.estimated_time_ms, 2_500);
}

#[tokio::test(start_paused = true)]
async fn test_batch_tasks_run_concurrently_and_batches_do_not_overlap() {
    let translator = ScriptedTranslator::new().with_latency(Duration::from_millis(100));
    let scheduler = scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::new(0.2),
        translator.clone(),
        RecordingSleeper::new(),
    );

    let result = scheduler
        .schedule_run(
            sample_tasks("p", 12),
            RunOptions::new().with_batch_size_cap(4),
        )
        .await
        .unwrap();

    assert_eq!(result.batch_size, 4);
    assert_eq!(result.jobs.len(), 3);
    assert_eq!(result.stats.translated, 12);
    assert_eq!(translator.max_in_flight(), 4);
    for pair in result.jobs.windows(2) {
        assert!(pair[0].ended_at <= pair[1].started_at);
    }
}

#[tokio::test]
async fn test_rejected_input_is_reported_as_rejected() {
    let scheduler = Arc::new(scheduler_with(
        Arc::new(MockHistoryStore::new()),
        FixedLoadProvider::new(0.2),
        ScriptedTranslator::new(),
        RecordingSleeper::new(),
    ));

    let duplicate = vec![TaskBuilder::new("a").build(), TaskBuilder::new("a").build()];
    let handle = scheduler.spawn_run(duplicate, RunOptions::new());
    let progress = handle.subscribe();

    assert!(handle.wait().await.is_err());
    let last = progress.borrow().clone();
    assert_eq!(last.phase, RunPhase::Rejected);
    assert!(last.is_finished());
}
