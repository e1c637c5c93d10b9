use std::time::Duration;

use async_trait::async_trait;
use l10n_domain::Sleeper;

/// 基于 tokio 定时器的延时器
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
