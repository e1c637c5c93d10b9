use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 调用方给出的优先级提示
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

/// 任务身份：同一资源在同一目标语言下的历次运行共享一个身份
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskIdentity {
    pub resource_key: String,
    pub target_locale: String,
}

impl TaskIdentity {
    pub fn new(resource_key: impl Into<String>, target_locale: impl Into<String>) -> Self {
        Self {
            resource_key: resource_key.into(),
            target_locale: target_locale.into(),
        }
    }
}

impl fmt::Display for TaskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_key, self.target_locale)
    }
}

/// 某一时刻的系统负载采样
///
/// `cpu_utilization` 与 `memory_utilization` 为 0-1 之间的比例，
/// 越界值在评分时会被截断。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemLoadSnapshot {
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
    pub active_job_count: u32,
    pub queue_depth: u32,
    pub captured_at: DateTime<Utc>,
}

impl SystemLoadSnapshot {
    pub fn new(
        cpu_utilization: f64,
        memory_utilization: f64,
        active_job_count: u32,
        queue_depth: u32,
    ) -> Self {
        Self {
            cpu_utilization,
            memory_utilization,
            active_job_count,
            queue_depth,
            captured_at: Utc::now(),
        }
    }

    /// 空闲系统的采样
    pub fn idle() -> Self {
        Self::new(0.0, 0.0, 0, 0)
    }

    /// 采样值是否都是有限数
    pub fn is_finite(&self) -> bool {
        self.cpu_utilization.is_finite() && self.memory_utilization.is_finite()
    }

    /// 返回截断到合法区间后的副本
    pub fn clamped(&self) -> Self {
        Self {
            cpu_utilization: self.cpu_utilization.clamp(0.0, 1.0),
            memory_utilization: self.memory_utilization.clamp(0.0, 1.0),
            ..self.clone()
        }
    }
}

/// 一组任务内容大小的聚合
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceProfile {
    pub avg_size: f64,
    pub max_size: u64,
    pub min_size: u64,
    pub total_size: u64,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        let identity = TaskIdentity::new("gid://shop/Product/1", "fr");
        assert_eq!(identity.to_string(), "gid://shop/Product/1:fr");
    }

    #[test]
    fn test_snapshot_clamped() {
        let snapshot = SystemLoadSnapshot::new(1.7, -0.2, 3, 0).clamped();
        assert_eq!(snapshot.cpu_utilization, 1.0);
        assert_eq!(snapshot.memory_utilization, 0.0);
        assert_eq!(snapshot.active_job_count, 3);
    }

    #[test]
    fn test_snapshot_nan_is_not_finite() {
        let snapshot = SystemLoadSnapshot::new(f64::NAN, 0.3, 0, 0);
        assert!(!snapshot.is_finite());
        assert!(SystemLoadSnapshot::idle().is_finite());
    }
}
