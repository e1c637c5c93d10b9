//! Observability module
//!
//! Structured logging and metrics for translation runs. Sinks and exporters
//! are installed by the embedding application.

pub mod metrics_collector;
pub mod structured_logger;
pub mod telemetry_setup;

pub use metrics_collector::MetricsCollector;
pub use structured_logger::{LogFormat, LoggingConfig, StructuredLogger};
pub use telemetry_setup::init_structured_logging;
