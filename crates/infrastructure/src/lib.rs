pub mod history_store;
pub mod observability;
pub mod resource_monitor;
pub mod sleeper;

pub use history_store::InMemoryHistoryStore;
pub use observability::*;
pub use resource_monitor::{ResourceMonitor, ResourceMonitorConfig, ResourceStats};
pub use sleeper::TokioSleeper;
