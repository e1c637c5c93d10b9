use std::sync::Arc;

use l10n_scheduler::domain::{
    BatchContext, DecisionKind, ErrorClass, RetryContext, SkipContext, SkipVerdict, Task,
    TranslationError,
};
use l10n_scheduler::{
    DecisionEngine, DecisionLog, PolicyConfig, RetryPolicyConfig, TaskScheduler,
};
use l10n_testing_utils::{
    sample_tasks, snapshot_for_load, MockHistoryStore, TaskBuilder, TaskHistoryBuilder,
};

fn engine() -> DecisionEngine {
    DecisionEngine::new(
        Arc::new(MockHistoryStore::new()),
        PolicyConfig::default(),
        RetryPolicyConfig::default(),
    )
}

#[tokio::test]
async fn test_unchanged_with_prior_success_always_skips() {
    for successes in 1..=4u32 {
        for quality in [0.0, 0.3, 0.7, 1.0] {
            let task = TaskBuilder::new("p-1").build();
            let store = MockHistoryStore::new().with_history(
                task.identity(),
                TaskHistoryBuilder::new()
                    .with_attempts(successes * 3)
                    .with_successes(successes)
                    .with_quality(quality)
                    .build(),
            );
            let engine = DecisionEngine::new(
                Arc::new(store),
                PolicyConfig::default(),
                RetryPolicyConfig::default(),
            );
            let context = SkipContext {
                content_unchanged: true,
                ..SkipContext::default()
            };
            let decision = engine.should_skip(&task, &context).await;
            assert_eq!(decision.decision, SkipVerdict::Skip);
        }
    }
}

#[test]
fn test_batch_size_never_grows_with_load() {
    for (count, size) in [(1, 100), (4, 100), (12, 100), (40, 100), (30, 8_000)] {
        let tasks: Vec<Task> = (0..count)
            .map(|i| TaskBuilder::new(format!("t-{i}")).with_content_size(size).build())
            .collect();
        let engine = engine();

        let mut previous = usize::MAX;
        for step in 0..=20 {
            let load = step as f64 / 20.0;
            let decision =
                engine.optimal_batch_size(&tasks, &BatchContext::new(snapshot_for_load(load)));
            assert!(decision.batch_size >= 1 && decision.batch_size <= count);
            assert!(
                decision.batch_size <= previous,
                "{count} tasks of {size}: {} > {previous} at load {load}",
                decision.batch_size
            );
            previous = decision.batch_size;
        }
    }
}

#[test]
fn test_retry_is_refused_past_the_ceiling() {
    let engine = engine();
    let task = TaskBuilder::new("p-1").build();
    for message in ["timeout", "quota exceeded", "invalid json", "boom"] {
        let error = TranslationError::new(message);
        for attempt in 3..8 {
            let decision = engine.retry_strategy(&RetryContext::new(&task, &error, attempt));
            assert!(!decision.should_retry, "{message} at {attempt}");
        }
    }

    let quota = engine.retry_strategy(&RetryContext::new(
        &task,
        &TranslationError::new("quota exceeded"),
        0,
    ));
    assert_eq!(quota.error_class, ErrorClass::Quota);
    assert_eq!(quota.delay_ms, 60_000);
}

#[test]
fn test_partition_is_exact() {
    for count in [0usize, 1, 2, 9, 10, 11, 64] {
        for size in [1usize, 2, 7, 10, 100] {
            let tasks = sample_tasks("p", count);
            let batches = TaskScheduler::partition(tasks.clone(), size);
            let expected_batches = count.div_ceil(size);
            assert_eq!(batches.len(), expected_batches);

            let flattened: Vec<Task> = batches.into_iter().flat_map(|b| b.tasks).collect();
            assert_eq!(flattened, tasks);
        }
    }
}

#[test]
fn test_confidence_stays_in_range() {
    let mut log = DecisionLog::new("confidence");
    let samples = [
        "",
        "risk uncertain unknown error fail",
        "score 95% history rate attempt load 1 2 3",
        "plain words",
    ];
    for reasoning in samples {
        let decision = log.record_decision("s", DecisionKind::Skip, "skip", reasoning);
        assert!((0.1..=1.0).contains(&decision.confidence), "{reasoning:?}");
    }
    for explicit in [-5.0, 0.0, 0.5, 7.0, f64::NAN] {
        let decision = log.record_decision_with_confidence(
            "s",
            DecisionKind::Retry,
            "retry",
            "explicit",
            explicit,
        );
        assert!((0.1..=1.0).contains(&decision.confidence), "{explicit}");
    }

    let export = log.export();
    assert_eq!(export.decisions.len(), samples.len() + 5);
    let sequences: Vec<u64> = export.decisions.iter().map(|d| d.sequence).collect();
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
}
