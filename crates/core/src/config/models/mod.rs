pub mod app_config;
pub mod observability;
pub mod policy;
pub mod scheduler_analyzer;

// Re-export main types for easier imports
pub use app_config::AppConfig;
pub use observability::ObservabilityConfig;
pub use policy::{PolicyConfig, RetryPolicyConfig};
pub use scheduler_analyzer::{AnalyzerConfig, CapacityPlan, SchedulerConfig};
