//! 决策记录
//!
//! 决策日志中的条目一经写入即不可修改，更正以新条目的形式追加。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ErrorClass;

/// 置信度下限
pub const MIN_CONFIDENCE: f64 = 0.1;
/// 置信度上限
pub const MAX_CONFIDENCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Skip,
    BatchSize,
    Retry,
    PolicyError,
    BatchFailure,
    Run,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Skip => "skip",
            DecisionKind::BatchSize => "batch_size",
            DecisionKind::Retry => "retry",
            DecisionKind::PolicyError => "policy_error",
            DecisionKind::BatchFailure => "batch_failure",
            DecisionKind::Run => "run",
        }
    }
}

/// 推理链中的一个步骤
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThoughtEntry {
    pub step: u64,
    pub text: String,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// 一条已记录的决策
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    /// 在所属会话内的全局顺序号，与思考步骤共用
    pub sequence: u64,
    pub subject_id: String,
    pub kind: DecisionKind,
    pub outcome: String,
    pub reasoning: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionLogSummary {
    pub total_steps: usize,
    pub thought_count: usize,
    pub decision_count: usize,
    pub decisions_by_kind: BTreeMap<DecisionKind, usize>,
    pub average_confidence: f64,
    pub last_decision: Option<Decision>,
}

/// 决策日志的完整导出，用于审计与调试
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionLogExport {
    pub session_id: Uuid,
    pub context: String,
    pub started_at: DateTime<Utc>,
    pub thoughts: Vec<ThoughtEntry>,
    pub decisions: Vec<Decision>,
    pub summary: DecisionLogSummary,
}

impl DecisionLogExport {
    pub fn decisions_for<'a>(&'a self, subject_id: &'a str) -> impl Iterator<Item = &'a Decision> {
        self.decisions
            .iter()
            .filter(move |decision| decision.subject_id == subject_id)
    }
}

/// 跳过策略的结论
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipVerdict {
    Skip,
    Translate,
    Defer,
}

impl SkipVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipVerdict::Skip => "skip",
            SkipVerdict::Translate => "translate",
            SkipVerdict::Defer => "defer",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkipDecision {
    pub task_id: String,
    pub decision: SkipVerdict,
    pub reasoning: String,
    pub confidence: f64,
    pub risk: f64,
    pub benefit: f64,
    /// 本次评估过程中写入日志的思考步骤
    pub audit_trail: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchMetrics {
    pub load_score: f64,
    pub avg_task_size: f64,
    pub task_count: usize,
    /// 是否因评分失败使用了保守值
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSizeDecision {
    pub batch_size: usize,
    pub reasoning: String,
    pub confidence: f64,
    pub metrics: BatchMetrics,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    Retry,
    Delay,
    Skip,
}

impl RetryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryStrategy::Retry => "retry",
            RetryStrategy::Delay => "delay",
            RetryStrategy::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryDecision {
    pub strategy: RetryStrategy,
    pub delay_ms: u64,
    pub reasoning: String,
    pub should_retry: bool,
    pub max_attempts: u32,
    pub error_class: ErrorClass,
    pub success_probability: f64,
    pub confidence: f64,
}
