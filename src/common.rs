use std::sync::Arc;

use anyhow::{Context, Result};
use l10n_core::AppConfig;
use l10n_dispatcher::TaskScheduler;
use l10n_domain::{HistoryStore, LoadProvider, Translator};
use l10n_infrastructure::{init_structured_logging, LogFormat, LoggingConfig, MetricsCollector};
use tracing::info;

/// 通用的启动配置
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// 为空时按默认路径查找配置文件，找不到则使用默认值
    pub config_path: Option<String>,
    pub log_level: String,
    pub log_format: String,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

/// 初始化日志系统
pub fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let format = LogFormat::parse(log_format)
        .ok_or_else(|| anyhow::anyhow!("不支持的日志格式: {log_format}"))?;

    init_structured_logging(LoggingConfig {
        level: log_level.to_string(),
        format,
        ..LoggingConfig::default()
    })
    .context("初始化日志系统失败")
}

/// 加载应用配置
pub fn load_config(startup_config: &StartupConfig) -> Result<AppConfig> {
    let config = AppConfig::load(startup_config.config_path.as_deref()).with_context(|| {
        format!(
            "加载配置失败: {}",
            startup_config.config_path.as_deref().unwrap_or("<默认路径>")
        )
    })?;

    info!(
        event = "config_loaded",
        config.path = startup_config.config_path.as_deref().unwrap_or("default"),
        policy.base_batch_size = config.policy.base_batch_size,
        retry.max_attempts = config.retry.max_attempts,
        "Configuration loaded"
    );
    Ok(config)
}

/// 按应用配置组装调度器
pub fn build_scheduler(
    config: &AppConfig,
    history_store: Arc<dyn HistoryStore>,
    load_provider: Arc<dyn LoadProvider>,
    translator: Arc<dyn Translator>,
) -> TaskScheduler {
    let metrics = if config.observability.metrics_enabled {
        MetricsCollector::new()
    } else {
        MetricsCollector::disabled()
    };

    TaskScheduler::new(history_store, load_provider, translator)
        .with_app_config(config)
        .with_metrics(Arc::new(metrics))
}
