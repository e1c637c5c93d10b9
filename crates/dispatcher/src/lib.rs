//! 调度核心
//!
//! 决策日志、评分策略、决策引擎、任务调度器与运行分析。

pub mod analyzer;
pub mod decision_engine;
pub mod decision_log;
pub mod errors;
pub mod history_cache;
pub mod run_handle;
pub mod scheduler;
pub mod scoring;

pub use analyzer::{
    Bottleneck, BottleneckKind, OptimizationAnalyzer, OptimizationReport, ResourcePrediction,
    RiskLevel, Suggestion, SuggestionKind,
};
pub use decision_engine::DecisionEngine;
pub use decision_log::{confidence_from_reasoning, DecisionLog};
pub use errors::PolicyError;
pub use history_cache::{CacheStats, HistoryCache};
pub use run_handle::RunHandle;
pub use scheduler::TaskScheduler;
pub use scoring::{KeywordErrorClassifier, ScoringPolicy};
