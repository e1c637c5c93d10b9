//! 决策日志
//!
//! 记录一次运行中的推理步骤与决策。条目只追加不修改，思考步骤与决策共用
//! 一个递增序号，导出时可以还原完整的因果顺序。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use l10n_domain::{
    Decision, DecisionKind, DecisionLogExport, DecisionLogSummary, ThoughtEntry, MAX_CONFIDENCE,
    MIN_CONFIDENCE,
};
use uuid::Uuid;

const BASE_CONFIDENCE: f64 = 0.5;

/// 提高置信度的量化证据标记
const EVIDENCE_MARKERS: &[(&str, f64)] = &[
    ("%", 0.1),
    ("score", 0.1),
    ("history", 0.1),
    ("rate", 0.05),
    ("attempt", 0.05),
    ("load", 0.05),
];

/// 降低置信度的风险用语
const RISK_MARKERS: &[(&str, f64)] = &[
    ("risk", 0.1),
    ("uncertain", 0.15),
    ("unknown", 0.1),
    ("error", 0.1),
    ("fail", 0.1),
];

const DIGIT_BONUS: f64 = 0.1;

/// 根据推理文本估算置信度，结果位于 [0.1, 1.0]
pub fn confidence_from_reasoning(reasoning: &str) -> f64 {
    let text = reasoning.to_lowercase();
    let mut confidence = BASE_CONFIDENCE;

    if text.chars().any(|c| c.is_ascii_digit()) {
        confidence += DIGIT_BONUS;
    }
    for (marker, delta) in EVIDENCE_MARKERS {
        if text.contains(marker) {
            confidence += delta;
        }
    }
    for (marker, delta) in RISK_MARKERS {
        if text.contains(marker) {
            confidence -= delta;
        }
    }

    clamp_confidence(confidence)
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return MIN_CONFIDENCE;
    }
    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

#[derive(Debug, Clone)]
enum LogEntry {
    Thought(ThoughtEntry),
    Decision(Decision),
}

#[derive(Debug, Clone)]
pub struct DecisionLog {
    session_id: Uuid,
    context: String,
    started_at: DateTime<Utc>,
    entries: Vec<LogEntry>,
    next_sequence: u64,
}

impl DecisionLog {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            context: context.into(),
            started_at: Utc::now(),
            entries: Vec::new(),
            next_sequence: 1,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    pub fn add_thought(
        &mut self,
        text: impl Into<String>,
        metadata: serde_json::Value,
    ) -> ThoughtEntry {
        let entry = ThoughtEntry {
            step: self.next_sequence(),
            text: text.into(),
            metadata,
            timestamp: Utc::now(),
        };
        self.entries.push(LogEntry::Thought(entry.clone()));
        entry
    }

    /// 记录决策，置信度由推理文本推导
    pub fn record_decision(
        &mut self,
        subject_id: impl Into<String>,
        kind: DecisionKind,
        outcome: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Decision {
        let reasoning = reasoning.into();
        let confidence = confidence_from_reasoning(&reasoning);
        self.push_decision(subject_id.into(), kind, outcome.into(), reasoning, confidence)
    }

    /// 记录决策并显式指定置信度，超出区间的值会被截断
    pub fn record_decision_with_confidence(
        &mut self,
        subject_id: impl Into<String>,
        kind: DecisionKind,
        outcome: impl Into<String>,
        reasoning: impl Into<String>,
        confidence: f64,
    ) -> Decision {
        self.push_decision(
            subject_id.into(),
            kind,
            outcome.into(),
            reasoning.into(),
            clamp_confidence(confidence),
        )
    }

    fn push_decision(
        &mut self,
        subject_id: String,
        kind: DecisionKind,
        outcome: String,
        reasoning: String,
        confidence: f64,
    ) -> Decision {
        let decision = Decision {
            sequence: self.next_sequence(),
            subject_id,
            kind,
            outcome,
            reasoning,
            confidence,
            timestamp: Utc::now(),
        };
        self.entries.push(LogEntry::Decision(decision.clone()));
        decision
    }

    pub fn thoughts(&self) -> impl Iterator<Item = &ThoughtEntry> {
        self.entries.iter().filter_map(|entry| match entry {
            LogEntry::Thought(thought) => Some(thought),
            LogEntry::Decision(_) => None,
        })
    }

    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.entries.iter().filter_map(|entry| match entry {
            LogEntry::Decision(decision) => Some(decision),
            LogEntry::Thought(_) => None,
        })
    }

    pub fn summary(&self) -> DecisionLogSummary {
        let mut decisions_by_kind = BTreeMap::new();
        let mut confidence_total = 0.0;
        let mut decision_count = 0;
        for decision in self.decisions() {
            *decisions_by_kind.entry(decision.kind).or_insert(0) += 1;
            confidence_total += decision.confidence;
            decision_count += 1;
        }

        DecisionLogSummary {
            total_steps: self.entries.len(),
            thought_count: self.entries.len() - decision_count,
            decision_count,
            decisions_by_kind,
            average_confidence: if decision_count > 0 {
                confidence_total / decision_count as f64
            } else {
                0.0
            },
            last_decision: self.decisions().last().cloned(),
        }
    }

    pub fn export(&self) -> DecisionLogExport {
        DecisionLogExport {
            session_id: self.session_id,
            context: self.context.clone(),
            started_at: self.started_at,
            thoughts: self.thoughts().cloned().collect(),
            decisions: self.decisions().cloned().collect(),
            summary: self.summary(),
        }
    }
}
