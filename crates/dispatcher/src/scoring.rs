//! 评分策略
//!
//! 纯函数：风险、收益、系统负载、内容画像、错误分类与重试成功率。

use std::sync::Arc;

use l10n_core::{PolicyConfig, RetryPolicyConfig};
use l10n_domain::{
    ErrorClass, ErrorClassifier, Priority, ResourceProfile, SkipContext, SystemLoadSnapshot, Task,
    TaskHistory, TranslationError,
};

use crate::errors::{ensure_finite, PolicyError, PolicyResult};

/// 基于关键字的错误分类器
///
/// 按顺序匹配错误消息与错误码（不区分大小写），首个命中的规则生效。
#[derive(Debug, Clone)]
pub struct KeywordErrorClassifier {
    rules: Vec<(ErrorClass, Vec<String>)>,
}

impl Default for KeywordErrorClassifier {
    fn default() -> Self {
        let rules = [
            (
                ErrorClass::Temporary,
                &[
                    "timeout",
                    "timed out",
                    "econnrefused",
                    "connection refused",
                    "econnreset",
                    "connection reset",
                ][..],
            ),
            (ErrorClass::Quota, &["quota", "rate limit", "rate-limit", "429"][..]),
            (ErrorClass::Invalid, &["invalid", "malformed"][..]),
        ]
        .into_iter()
        .map(|(class, keywords)| (class, keywords.iter().map(|k| k.to_string()).collect()))
        .collect();

        Self { rules }
    }
}

impl KeywordErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条规则，优先级低于已有规则
    pub fn with_rule<I, S>(mut self, class: ErrorClass, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push((
            class,
            keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        ));
        self
    }
}

impl ErrorClassifier for KeywordErrorClassifier {
    fn classify(&self, error: &TranslationError) -> ErrorClass {
        let mut haystack = error.message.to_lowercase();
        if let Some(code) = &error.code {
            haystack.push(' ');
            haystack.push_str(&code.to_lowercase());
        }

        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k.as_str())))
            .map(|(class, _)| *class)
            .unwrap_or(ErrorClass::Unknown)
    }
}

#[derive(Clone)]
pub struct ScoringPolicy {
    policy: PolicyConfig,
    retry: RetryPolicyConfig,
    classifier: Arc<dyn ErrorClassifier>,
}

impl ScoringPolicy {
    pub fn new(policy: PolicyConfig, retry: RetryPolicyConfig) -> Self {
        Self {
            policy,
            retry,
            classifier: Arc::new(KeywordErrorClassifier::default()),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// 资源风险：历史失败率与质量惩罚的加权和
    pub fn resource_risk(&self, _task: &Task, history: &TaskHistory) -> PolicyResult<f64> {
        let failure_rate = history
            .failure_rate()
            .unwrap_or(self.policy.neutral_failure_rate);
        let quality_penalty = match (history.has_history(), history.average_quality_score) {
            (true, Some(quality)) => 1.0 - quality,
            _ => self.policy.neutral_quality_penalty,
        };

        let risk = self.policy.risk_failure_weight * failure_rate
            + self.policy.risk_quality_weight * quality_penalty;
        Ok(ensure_finite("resource_risk", risk)?.clamp(0.0, 1.0))
    }

    /// 翻译收益
    pub fn resource_benefit(&self, task: &Task, context: &SkipContext) -> f64 {
        if context.user_requested {
            return 1.0;
        }

        let mut benefit = self.policy.benefit_base;
        if context.priority == Priority::High {
            benefit += self.policy.benefit_high_priority_bonus;
        }
        if context.important_types.contains(&task.resource_type) {
            benefit += self.policy.benefit_important_type_bonus;
        }
        benefit.clamp(0.0, 1.0)
    }

    /// 系统负载评分：CPU、内存与活跃任务占比的平均值
    pub fn system_load_score(&self, snapshot: &SystemLoadSnapshot) -> PolicyResult<f64> {
        if !snapshot.is_finite() {
            return Err(PolicyError::UnusableLoadSample(format!(
                "cpu={}, memory={}",
                snapshot.cpu_utilization, snapshot.memory_utilization
            )));
        }

        let snapshot = snapshot.clamped();
        let capacity = self.policy.active_job_capacity.max(1) as f64;
        let job_ratio = (snapshot.active_job_count as f64 / capacity).min(1.0);
        let score = (snapshot.cpu_utilization + snapshot.memory_utilization + job_ratio) / 3.0;
        ensure_finite("system_load", score)
    }

    /// 内容大小画像
    pub fn resource_profile(tasks: &[Task]) -> ResourceProfile {
        if tasks.is_empty() {
            return ResourceProfile::default();
        }

        let total_size: u64 = tasks.iter().map(|t| t.content_size).sum();
        ResourceProfile {
            avg_size: total_size as f64 / tasks.len() as f64,
            max_size: tasks.iter().map(|t| t.content_size).max().unwrap_or(0),
            min_size: tasks.iter().map(|t| t.content_size).min().unwrap_or(0),
            total_size,
            count: tasks.len(),
        }
    }

    pub fn classify_error(&self, error: &TranslationError) -> ErrorClass {
        self.classifier.classify(error)
    }

    /// 重试成功概率：按错误类别的基础概率随重试次数递减
    pub fn retry_success_probability(&self, class: ErrorClass, attempt_count: u32) -> f64 {
        let base = match class {
            ErrorClass::Temporary => 0.8,
            ErrorClass::Quota => 0.5,
            ErrorClass::Invalid => 0.1,
            ErrorClass::Unknown => 0.3,
        };
        let exponent = attempt_count.min(i32::MAX as u32) as i32;
        (base * self.retry.success_decay.powi(exponent)).clamp(0.0, 1.0)
    }
}

impl std::fmt::Debug for ScoringPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringPolicy")
            .field("policy", &self.policy)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
