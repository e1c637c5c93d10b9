//! 翻译任务调度与决策引擎
//!
//! 工作区各 crate 的统一入口：配置与错误类型来自 `l10n-core`，
//! 领域模型来自 `l10n-domain`，决策与调度来自 `l10n-dispatcher`，
//! 日志、指标与默认协作者实现来自 `l10n-infrastructure`。

pub mod common;

pub use l10n_core::{
    AnalyzerConfig, AppConfig, CapacityPlan, ObservabilityConfig, PolicyConfig, RetryPolicyConfig,
    SchedulerConfig, SchedulerError, SchedulerResult,
};
pub use l10n_dispatcher::{
    DecisionEngine, DecisionLog, KeywordErrorClassifier, OptimizationAnalyzer,
    OptimizationReport, ResourcePrediction, RiskLevel, RunHandle, ScoringPolicy, TaskScheduler,
};
pub use l10n_domain as domain;
pub use l10n_infrastructure::{
    InMemoryHistoryStore, MetricsCollector, ResourceMonitor, ResourceMonitorConfig, TokioSleeper,
};
