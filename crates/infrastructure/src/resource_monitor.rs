use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use l10n_core::{SchedulerError, SchedulerResult};
use l10n_domain::{LoadProvider, SystemLoadSnapshot};
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// 资源监控配置
#[derive(Debug, Clone)]
pub struct ResourceMonitorConfig {
    /// 后台采样间隔（秒）
    pub monitor_interval_seconds: u64,
    /// 内存使用率超过该值时输出警告日志（0-1）
    pub memory_warning_threshold: f64,
    /// CPU 使用率超过该值时输出警告日志（0-1）
    pub cpu_warning_threshold: f64,
    /// 是否启用后台采样
    pub enabled: bool,
    /// 历史数据保留数量
    pub history_size: usize,
}

impl Default for ResourceMonitorConfig {
    fn default() -> Self {
        Self {
            monitor_interval_seconds: 15,
            memory_warning_threshold: 0.8,
            cpu_warning_threshold: 0.8,
            enabled: true,
            history_size: 60,
        }
    }
}

/// 资源使用统计
#[derive(Debug, Clone)]
pub struct ResourceStats {
    /// 内存使用率（0-1）
    pub memory_utilization: f64,
    /// CPU 使用率（0-1），由一分钟平均负载除以可用核数得到
    pub cpu_utilization: f64,
    /// 正在执行的翻译任务数
    pub active_jobs: u32,
    /// 等待执行的任务数
    pub queue_depth: u32,
    pub timestamp: DateTime<Utc>,
}

impl Default for ResourceStats {
    fn default() -> Self {
        Self {
            memory_utilization: 0.0,
            cpu_utilization: 0.0,
            active_jobs: 0,
            queue_depth: 0,
            timestamp: Utc::now(),
        }
    }
}

impl From<&ResourceStats> for SystemLoadSnapshot {
    fn from(stats: &ResourceStats) -> Self {
        SystemLoadSnapshot {
            cpu_utilization: stats.cpu_utilization,
            memory_utilization: stats.memory_utilization,
            active_job_count: stats.active_jobs,
            queue_depth: stats.queue_depth,
            captured_at: stats.timestamp,
        }
    }
}

/// 资源监控器
///
/// 按需或在后台周期性地采样主机负载，作为批量大小决策的负载来源。
pub struct ResourceMonitor {
    config: ResourceMonitorConfig,
    current_stats: Arc<RwLock<ResourceStats>>,
    history: Arc<RwLock<Vec<ResourceStats>>>,
    active_jobs: Arc<AtomicU32>,
    queue_depth: Arc<AtomicU32>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    monitor_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ResourceMonitor {
    pub fn new(config: ResourceMonitorConfig) -> Self {
        Self {
            config,
            current_stats: Arc::new(RwLock::new(ResourceStats::default())),
            history: Arc::new(RwLock::new(Vec::new())),
            active_jobs: Arc::new(AtomicU32::new(0)),
            queue_depth: Arc::new(AtomicU32::new(0)),
            shutdown_tx: None,
            monitor_handle: None,
        }
    }

    /// 启动后台采样
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if !self.config.enabled {
            info!("Resource monitor is disabled");
            return Ok(());
        }
        if self.monitor_handle.is_some() {
            return Ok(());
        }

        info!(
            interval_seconds = self.config.monitor_interval_seconds,
            history_size = self.config.history_size,
            "Starting resource monitor"
        );

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let sampler = self.sampler();
        let handle = tokio::spawn(async move {
            let mut monitor_interval =
                interval(Duration::from_secs(sampler.config.monitor_interval_seconds.max(1)));

            loop {
                tokio::select! {
                    _ = monitor_interval.tick() => {
                        if let Err(e) = sampler.collect().await {
                            warn!(error = %e, "Failed to collect resource stats");
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("Resource monitor shutdown requested");
                        break;
                    }
                }
            }
        });

        self.monitor_handle = Some(handle);
        Ok(())
    }

    /// 停止后台采样
    pub async fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.monitor_handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Error waiting for resource monitor to stop");
            }
        }

        info!("Resource monitor stopped");
    }

    pub fn job_started(&self) {
        self.active_jobs.fetch_add(1, Ordering::SeqCst);
    }

    pub fn job_finished(&self) {
        let _ = self
            .active_jobs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn set_queue_depth(&self, depth: u32) {
        self.queue_depth.store(depth, Ordering::SeqCst);
    }

    /// 立即采样一次并更新历史
    pub async fn sample(&self) -> SchedulerResult<ResourceStats> {
        self.sampler().collect().await
    }

    pub async fn get_current_stats(&self) -> ResourceStats {
        self.current_stats.read().await.clone()
    }

    pub async fn get_history(&self) -> Vec<ResourceStats> {
        self.history.read().await.clone()
    }

    fn sampler(&self) -> Sampler {
        Sampler {
            config: self.config.clone(),
            current_stats: self.current_stats.clone(),
            history: self.history.clone(),
            active_jobs: self.active_jobs.clone(),
            queue_depth: self.queue_depth.clone(),
        }
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.monitor_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl LoadProvider for ResourceMonitor {
    async fn fetch_system_load(&self) -> SchedulerResult<SystemLoadSnapshot> {
        let stats = self.sample().await?;
        Ok(SystemLoadSnapshot::from(&stats))
    }
}

/// 后台任务与按需采样共享的状态
struct Sampler {
    config: ResourceMonitorConfig,
    current_stats: Arc<RwLock<ResourceStats>>,
    history: Arc<RwLock<Vec<ResourceStats>>>,
    active_jobs: Arc<AtomicU32>,
    queue_depth: Arc<AtomicU32>,
}

impl Sampler {
    async fn collect(&self) -> SchedulerResult<ResourceStats> {
        let stats = ResourceStats {
            memory_utilization: read_memory_utilization()?,
            cpu_utilization: read_cpu_utilization()?,
            active_jobs: self.active_jobs.load(Ordering::SeqCst),
            queue_depth: self.queue_depth.load(Ordering::SeqCst),
            timestamp: Utc::now(),
        };

        if stats.memory_utilization >= self.config.memory_warning_threshold {
            warn!(
                memory_utilization = stats.memory_utilization,
                threshold = self.config.memory_warning_threshold,
                "High memory usage detected"
            );
        }

        if stats.cpu_utilization >= self.config.cpu_warning_threshold {
            warn!(
                cpu_utilization = stats.cpu_utilization,
                threshold = self.config.cpu_warning_threshold,
                "High CPU usage detected"
            );
        }

        *self.current_stats.write().await = stats.clone();

        {
            let mut history_guard = self.history.write().await;
            history_guard.push(stats.clone());

            if history_guard.len() > self.config.history_size {
                let excess = history_guard.len() - self.config.history_size;
                history_guard.drain(..excess);
            }
        }

        debug!(?stats, "Resource stats collected");
        Ok(stats)
    }
}

#[cfg(target_os = "linux")]
fn read_memory_utilization() -> SchedulerResult<f64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo")
        .map_err(|e| SchedulerError::LoadProbe(format!("/proc/meminfo: {e}")))?;
    Ok(parse_meminfo(&meminfo).unwrap_or(0.0))
}

#[cfg(not(target_os = "linux"))]
fn read_memory_utilization() -> SchedulerResult<f64> {
    Ok(0.0)
}

#[cfg(target_os = "linux")]
fn read_cpu_utilization() -> SchedulerResult<f64> {
    let loadavg = std::fs::read_to_string("/proc/loadavg")
        .map_err(|e| SchedulerError::LoadProbe(format!("/proc/loadavg: {e}")))?;
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    Ok(parse_loadavg(&loadavg, cores).unwrap_or(0.0))
}

#[cfg(not(target_os = "linux"))]
fn read_cpu_utilization() -> SchedulerResult<f64> {
    Ok(0.0)
}

/// 由 MemTotal 与 MemAvailable 计算内存使用率
fn parse_meminfo(meminfo: &str) -> Option<f64> {
    let field = |name: &str| -> Option<f64> {
        meminfo
            .lines()
            .find(|line| line.starts_with(name))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|value| value.parse::<f64>().ok())
    };

    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    if total <= 0.0 {
        return None;
    }
    Some((1.0 - available / total).clamp(0.0, 1.0))
}

fn parse_loadavg(loadavg: &str, cores: usize) -> Option<f64> {
    let one_minute: f64 = loadavg.split_whitespace().next()?.parse().ok()?;
    Some((one_minute / cores.max(1) as f64).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resource_monitor_config_default() {
        let config = ResourceMonitorConfig::default();
        assert_eq!(config.monitor_interval_seconds, 15);
        assert_eq!(config.memory_warning_threshold, 0.8);
        assert!(config.enabled);
        assert_eq!(config.history_size, 60);
    }

    #[tokio::test]
    async fn test_resource_monitor_creation() {
        let monitor = ResourceMonitor::new(ResourceMonitorConfig::default());

        let stats = monitor.get_current_stats().await;
        assert_eq!(stats.active_jobs, 0);
        assert!(monitor.get_history().await.is_empty());
    }

    #[test]
    fn test_parse_meminfo() {
        let meminfo = "MemTotal:       16000000 kB\nMemFree:         2000000 kB\nMemAvailable:    4000000 kB\n";
        assert_eq!(parse_meminfo(meminfo), Some(0.75));
        assert_eq!(parse_meminfo("MemTotal: 0 kB\nMemAvailable: 0 kB"), None);
        assert_eq!(parse_meminfo("garbage"), None);
    }

    #[test]
    fn test_parse_loadavg() {
        assert_eq!(parse_loadavg("2.00 1.50 1.00 1/100 12345", 4), Some(0.5));
        assert_eq!(parse_loadavg("9.00 1.50 1.00 1/100 12345", 4), Some(1.0));
        assert_eq!(parse_loadavg("", 4), None);
    }

    #[tokio::test]
    async fn test_job_counters_feed_snapshot() {
        let monitor = ResourceMonitor::new(ResourceMonitorConfig::default());
        monitor.job_started();
        monitor.job_started();
        monitor.job_finished();
        monitor.set_queue_depth(7);

        let snapshot = monitor.fetch_system_load().await.unwrap();
        assert_eq!(snapshot.active_job_count, 1);
        assert_eq!(snapshot.queue_depth, 7);
        assert!(snapshot.is_finite());
        assert!((0.0..=1.0).contains(&snapshot.cpu_utilization));
        assert!((0.0..=1.0).contains(&snapshot.memory_utilization));

        monitor.job_finished();
        monitor.job_finished();
        assert_eq!(monitor.sample().await.unwrap().active_jobs, 0);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let config = ResourceMonitorConfig {
            history_size: 3,
            ..ResourceMonitorConfig::default()
        };
        let monitor = ResourceMonitor::new(config);
        for _ in 0..5 {
            monitor.sample().await.unwrap();
        }
        assert_eq!(monitor.get_history().await.len(), 3);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let mut monitor = ResourceMonitor::new(ResourceMonitorConfig {
            monitor_interval_seconds: 1,
            ..ResourceMonitorConfig::default()
        });
        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        monitor.stop().await;
        assert!(!monitor.get_history().await.is_empty());
    }

    #[tokio::test]
    async fn test_sample_updates_current_stats() {
        let monitor = ResourceMonitor::new(ResourceMonitorConfig::default());
        monitor.set_queue_depth(3);

        let sampled = monitor.sample().await.unwrap();
        let current = monitor.get_current_stats().await;
        assert_eq!(current.queue_depth, 3);
        assert_eq!(current.timestamp, sampled.timestamp);
    }
}
