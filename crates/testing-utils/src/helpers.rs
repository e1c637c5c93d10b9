//! Test helper utilities and common testing patterns

use l10n_domain::{SystemLoadSnapshot, Task};
use std::time::Duration;
use tokio::time::sleep;

use crate::builders::TaskBuilder;

/// Snapshot whose combined load score is approximately `load`
///
/// CPU and memory are both set to `load` and the active job count to
/// `load * 20`, which is the default job capacity.
pub fn snapshot_for_load(load: f64) -> SystemLoadSnapshot {
    SystemLoadSnapshot::new(load, load, (load * 20.0).round().max(0.0) as u32, 0)
}

/// `count` default tasks named `{prefix}-{index}`
pub fn sample_tasks(prefix: &str, count: usize) -> Vec<Task> {
    (0..count)
        .map(|i| TaskBuilder::new(format!("{prefix}-{i}")).build())
        .collect()
}

/// Test environment setup utilities
pub struct TestEnv;

impl TestEnv {
    /// Wait for a condition to be true with timeout
    ///
    /// Useful when a run is executing in the background and the test needs
    /// to observe an intermediate state.
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = tokio::time::Instant::now();

        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }

        false
    }

    /// Set up logging for tests (call once per test binary)
    pub fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("debug")
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_success() {
        let mut counter = 0;
        let condition = || {
            counter += 1;
            let done = counter >= 3;
            async move { done }
        };

        assert!(TestEnv::wait_for(condition, Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_wait_for_timeout() {
        let condition = || async { false };
        assert!(!TestEnv::wait_for(condition, Duration::from_millis(50)).await);
    }

    #[test]
    fn test_sample_tasks() {
        let tasks = sample_tasks("p", 3);
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["p-0", "p-1", "p-2"]);
    }
}
