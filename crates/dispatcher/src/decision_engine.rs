//! 决策引擎
//!
//! 组合评分策略与决策日志，回答三个问题：某个任务是否跳过、当前负载下
//! 的批量大小、失败后的重试策略。正常输入下不会返回错误，评分内部失败时
//! 退回到最保守的结论，并以最低置信度记录。

use std::sync::{Arc, Mutex, MutexGuard};

use l10n_core::{PolicyConfig, RetryPolicyConfig};
use l10n_domain::{
    BatchContext, BatchMetrics, BatchSizeDecision, Decision, DecisionKind, DecisionLogExport,
    ErrorClass, ErrorClassifier, HistoryStore, RetryContext, RetryDecision, RetryStrategy,
    SkipContext, SkipDecision, SkipVerdict, Task, TaskHistory, TaskIdentity, MIN_CONFIDENCE,
};
use l10n_infrastructure::StructuredLogger;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::decision_log::DecisionLog;
use crate::errors::{PolicyError, PolicyResult};
use crate::history_cache::{CacheStats, HistoryCache};
use crate::scoring::ScoringPolicy;

pub struct DecisionEngine {
    scoring: ScoringPolicy,
    retry: RetryPolicyConfig,
    history_store: Arc<dyn HistoryStore>,
    cache: HistoryCache,
    log: Mutex<DecisionLog>,
}

impl DecisionEngine {
    pub fn new(
        history_store: Arc<dyn HistoryStore>,
        policy: PolicyConfig,
        retry: RetryPolicyConfig,
    ) -> Self {
        let cache = HistoryCache::new(policy.history_cache_capacity);
        Self {
            scoring: ScoringPolicy::new(policy, retry.clone()),
            retry,
            history_store,
            cache,
            log: Mutex::new(DecisionLog::new("default")),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.scoring = self.scoring.with_classifier(classifier);
        self
    }

    pub fn scoring(&self) -> &ScoringPolicy {
        &self.scoring
    }

    fn log(&self) -> MutexGuard<'_, DecisionLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 开始新的决策会话，之前的日志被丢弃
    pub fn start_session(&self, context: impl Into<String>) -> Uuid {
        let log = DecisionLog::new(context);
        let session_id = log.session_id();
        *self.log() = log;
        debug!(session_id = %session_id, "Decision session started");
        session_id
    }

    pub fn session_id(&self) -> Uuid {
        self.log().session_id()
    }

    pub fn add_thought(&self, text: impl Into<String>, metadata: serde_json::Value) {
        self.log().add_thought(text, metadata);
    }

    pub fn record_decision(
        &self,
        subject_id: &str,
        kind: DecisionKind,
        outcome: &str,
        reasoning: &str,
    ) -> Decision {
        self.log()
            .record_decision(subject_id, kind, outcome, reasoning)
    }

    pub fn record_decision_with_confidence(
        &self,
        subject_id: &str,
        kind: DecisionKind,
        outcome: &str,
        reasoning: &str,
        confidence: f64,
    ) -> Decision {
        self.log()
            .record_decision_with_confidence(subject_id, kind, outcome, reasoning, confidence)
    }

    pub fn export_log(&self) -> DecisionLogExport {
        self.log().export()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// 已缓存历史中的平均任务耗时，没有可用样本时返回 None
    pub fn cached_average_latency_ms(&self, tasks: &[Task]) -> Option<f64> {
        let samples: Vec<f64> = tasks
            .iter()
            .filter_map(|task| self.cache.peek(&task.identity()))
            .filter_map(|history| history.average_latency_ms)
            .filter(|latency| latency.is_finite() && *latency >= 0.0)
            .collect();

        if samples.is_empty() {
            None
        } else {
            Some(samples.iter().sum::<f64>() / samples.len() as f64)
        }
    }

    fn note(&self, trail: &mut Vec<String>, text: String, metadata: serde_json::Value) {
        self.log().add_thought(text.clone(), metadata);
        trail.push(text);
    }

    /// 以最低置信度记录一次评分失败
    fn record_policy_error(
        &self,
        subject_id: &str,
        operation: &str,
        outcome: &str,
        error: &PolicyError,
    ) -> Decision {
        StructuredLogger::log_policy_fallback(subject_id, operation, &error.to_string());
        self.log().record_decision_with_confidence(
            subject_id,
            DecisionKind::PolicyError,
            outcome,
            format!("{operation} failed: {error}; using conservative outcome {outcome}"),
            MIN_CONFIDENCE,
        )
    }

    async fn history_for(&self, identity: &TaskIdentity) -> PolicyResult<TaskHistory> {
        if let Some(history) = self.cache.get(identity) {
            return Ok(history);
        }

        let history = self
            .history_store
            .fetch_history(identity)
            .await
            .map_err(|e| PolicyError::HistoryLookup(e.to_string()))?;
        self.cache.put(identity.clone(), history.clone());
        Ok(history)
    }

    /// 判断任务应当翻译、跳过还是推迟
    pub async fn should_skip(&self, task: &Task, context: &SkipContext) -> SkipDecision {
        let mut trail = Vec::new();

        let decision = if task.forced {
            self.note(
                &mut trail,
                format!("task {} is forced by the caller", task.id),
                json!({ "task_id": task.id, "forced": true }),
            );
            let reasoning = "forced by caller, skip policy bypassed".to_string();
            let recorded =
                self.record_decision(&task.id, DecisionKind::Skip, "translate", &reasoning);
            SkipDecision {
                task_id: task.id.clone(),
                decision: SkipVerdict::Translate,
                reasoning,
                confidence: recorded.confidence,
                risk: 0.0,
                benefit: 1.0,
                audit_trail: trail,
            }
        } else {
            match self.evaluate_skip(task, context, &mut trail).await {
                Ok(decision) => decision,
                Err(error) => {
                    let reasoning = format!("scoring failed ({error}), skipping conservatively");
                    trail.push(reasoning.clone());
                    self.record_policy_error(&task.id, "should_skip", "skip", &error);
                    SkipDecision {
                        task_id: task.id.clone(),
                        decision: SkipVerdict::Skip,
                        reasoning,
                        confidence: MIN_CONFIDENCE,
                        risk: 1.0,
                        benefit: 0.0,
                        audit_trail: trail,
                    }
                }
            }
        };

        StructuredLogger::log_skip_decision(
            &decision.task_id,
            decision.decision.as_str(),
            decision.confidence,
            &decision.reasoning,
        );
        decision
    }

    async fn evaluate_skip(
        &self,
        task: &Task,
        context: &SkipContext,
        trail: &mut Vec<String>,
    ) -> PolicyResult<SkipDecision> {
        let identity = task.identity();
        let history = self.history_for(&identity).await?;
        self.note(
            trail,
            format!(
                "history for {identity}: {} attempts, {} successes",
                history.attempt_count, history.success_count
            ),
            serde_json::to_value(&history).unwrap_or_default(),
        );

        let hash_unchanged = matches!(
            (&task.content_hash, &history.last_content_hash),
            (Some(current), Some(previous)) if current == previous
        );
        let content_unchanged = context.content_unchanged || hash_unchanged;
        let has_content_changed = !(content_unchanged && history.has_prior_success());

        let risk = self.scoring.resource_risk(task, &history)?;
        let benefit = self.scoring.resource_benefit(task, context);
        self.note(
            trail,
            format!(
                "risk {risk:.2}, benefit {benefit:.2}, content changed: {has_content_changed}"
            ),
            json!({
                "risk": risk,
                "benefit": benefit,
                "content_unchanged": content_unchanged,
                "has_content_changed": has_content_changed,
            }),
        );

        let quality_note = match (context.quality_threshold, history.average_quality_score) {
            (Some(threshold), Some(quality)) if history.has_history() && quality < threshold => {
                Some(format!(
                    "prior quality score {quality:.2} below threshold {threshold:.2}"
                ))
            }
            _ => None,
        };
        if let Some(note) = &quality_note {
            self.note(trail, note.clone(), json!({ "quality_below_threshold": true }));
        }

        let policy = self.scoring.policy();
        let (verdict, mut reasoning) = if !has_content_changed {
            (
                SkipVerdict::Skip,
                format!(
                    "content unchanged, already translated ({} of {} prior attempts succeeded)",
                    history.success_count, history.attempt_count
                ),
            )
        } else if risk > policy.defer_risk_threshold {
            (
                SkipVerdict::Defer,
                format!(
                    "risk too high ({risk:.2} > {:.2}), retry later",
                    policy.defer_risk_threshold
                ),
            )
        } else if benefit < policy.skip_benefit_threshold {
            (
                SkipVerdict::Skip,
                format!(
                    "low value (benefit {benefit:.2} < {:.2})",
                    policy.skip_benefit_threshold
                ),
            )
        } else {
            (
                SkipVerdict::Translate,
                format!("translate: benefit {benefit:.2} with risk score {risk:.2}"),
            )
        };
        if let Some(note) = quality_note {
            reasoning.push_str("; ");
            reasoning.push_str(&note);
        }

        let recorded = self.record_decision(&task.id, DecisionKind::Skip, verdict.as_str(), &reasoning);

        Ok(SkipDecision {
            task_id: task.id.clone(),
            decision: verdict,
            reasoning,
            confidence: recorded.confidence,
            risk,
            benefit,
            audit_trail: trail.clone(),
        })
    }

    /// 根据负载与内容画像选择批量大小
    pub fn optimal_batch_size(&self, tasks: &[Task], context: &BatchContext) -> BatchSizeDecision {
        let task_count = tasks.len();
        let profile = ScoringPolicy::resource_profile(tasks);

        if task_count == 0 {
            let reasoning = "no tasks to batch".to_string();
            let recorded = self.record_decision("batch", DecisionKind::BatchSize, "0", &reasoning);
            return BatchSizeDecision {
                batch_size: 0,
                reasoning,
                confidence: recorded.confidence,
                metrics: BatchMetrics {
                    load_score: 0.0,
                    avg_task_size: 0.0,
                    task_count: 0,
                    fallback: false,
                },
            };
        }

        let load_score = match self.scoring.system_load_score(&context.snapshot) {
            Ok(score) => score,
            Err(error) => return self.fallback_batch_size(tasks, &error),
        };

        let policy = self.scoring.policy();
        let mut size = policy.base_batch_size.min(task_count);
        let mut steps = vec![format!("base size {size}")];

        if load_score < policy.low_load_threshold {
            size = policy.max_batch_size.min(task_count);
            steps.push(format!(
                "load {load_score:.2} below {:.2}, raised to {size}",
                policy.low_load_threshold
            ));
        } else if load_score > policy.high_load_threshold {
            size = policy.high_load_batch_size.min(task_count);
            steps.push(format!(
                "load {load_score:.2} above {:.2}, lowered to {size}",
                policy.high_load_threshold
            ));
        }

        if profile.avg_size > policy.heavy_content_threshold {
            let reduced = ((size as f64 * policy.heavy_content_factor).floor() as usize)
                .max(policy.heavy_content_floor)
                .min(task_count);
            steps.push(format!(
                "average size {:.0} above {:.0}, reduced to {reduced}",
                profile.avg_size, policy.heavy_content_threshold
            ));
            size = reduced;
        }

        if let Some(cap) = context.batch_size_cap {
            let capped = size.min(cap.max(1));
            if capped < size {
                steps.push(format!("capped at {capped} by feedback"));
                size = capped;
            }
        }

        let reasoning = format!(
            "batch size {size} for {task_count} tasks at load score {load_score:.2}: {}",
            steps.join(", ")
        );
        let recorded = self.record_decision(
            "batch",
            DecisionKind::BatchSize,
            &size.to_string(),
            &reasoning,
        );
        StructuredLogger::log_batch_size_decision(size, load_score, false);

        BatchSizeDecision {
            batch_size: size,
            reasoning,
            confidence: recorded.confidence,
            metrics: BatchMetrics {
                load_score,
                avg_task_size: profile.avg_size,
                task_count,
                fallback: false,
            },
        }
    }

    /// 无法评估负载时使用的保守批量大小
    pub fn fallback_batch_size(&self, tasks: &[Task], error: &PolicyError) -> BatchSizeDecision {
        let task_count = tasks.len();
        let size = if task_count == 0 {
            0
        } else {
            self.scoring
                .policy()
                .fallback_batch_size
                .min(task_count)
                .max(1)
        };
        let recorded =
            self.record_policy_error("batch", "optimal_batch_size", &size.to_string(), error);
        StructuredLogger::log_batch_size_decision(size, 0.0, true);

        BatchSizeDecision {
            batch_size: size,
            reasoning: recorded.reasoning,
            confidence: recorded.confidence,
            metrics: BatchMetrics {
                load_score: 0.0,
                avg_task_size: ScoringPolicy::resource_profile(tasks).avg_size,
                task_count,
                fallback: true,
            },
        }
    }

    /// 失败后的重试策略
    ///
    /// `attempt_count` 为已经进行过的重试次数，达到 `max_attempts` 后一律放弃。
    pub fn retry_strategy(&self, context: &RetryContext<'_>) -> RetryDecision {
        let attempt = context.attempt_count;
        let max_attempts = self.retry.max_attempts;
        let error_class = self.scoring.classify_error(context.error);
        let success_probability = self.scoring.retry_success_probability(error_class, attempt);

        let (strategy, delay_ms, reasoning) = if attempt >= max_attempts {
            (
                RetryStrategy::Skip,
                0,
                format!(
                    "attempt limit reached ({attempt} of {max_attempts} retries used), giving up on {error_class} error"
                ),
            )
        } else if error_class == ErrorClass::Temporary {
            let delay_ms = self.backoff_delay_ms(attempt);
            (
                RetryStrategy::Retry,
                delay_ms,
                format!(
                    "temporary error, retry {} of {max_attempts} after {delay_ms} ms backoff (success probability {success_probability:.2})",
                    attempt + 1
                ),
            )
        } else if error_class == ErrorClass::Quota && attempt < self.retry.quota_max_attempts {
            let delay_ms = self.retry.quota_delay_ms;
            (
                RetryStrategy::Delay,
                delay_ms,
                format!(
                    "quota error, delaying {delay_ms} ms before retry (success probability {success_probability:.2})"
                ),
            )
        } else {
            (
                RetryStrategy::Skip,
                0,
                format!(
                    "{error_class} error is not retryable at attempt {attempt} (success probability {success_probability:.2})"
                ),
            )
        };

        let recorded = self.record_decision(
            &context.task.id,
            DecisionKind::Retry,
            strategy.as_str(),
            &reasoning,
        );

        RetryDecision {
            strategy,
            delay_ms,
            reasoning,
            should_retry: strategy != RetryStrategy::Skip,
            max_attempts,
            error_class,
            success_probability,
            confidence: recorded.confidence,
        }
    }

    fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        let base = self.retry.temporary_base_delay_ms as f64;
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let capped = (base * self.retry.backoff_multiplier.powi(exponent))
            .min(self.retry.max_delay_ms as f64);

        let delay = if self.retry.jitter_factor > 0.0 {
            let jitter = capped * self.retry.jitter_factor * (rand::random::<f64>() - 0.5) * 2.0;
            (capped + jitter).max(base.min(capped))
        } else {
            capped
        };
        delay.round() as u64
    }
}
