use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use l10n_core::SchedulerResult;
use l10n_domain::{HistoryStore, TaskHistory, TaskIdentity, TaskOutcome};
use tokio::sync::RwLock;
use tracing::debug;

/// 内存历史存储
///
/// 按任务身份聚合执行结果，适用于嵌入式部署与测试。重启后历史丢失。
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistoryStore {
    entries: Arc<RwLock<HashMap<TaskIdentity, TaskHistory>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有的历史记录预填充
    pub async fn seed(&self, identity: TaskIdentity, history: TaskHistory) {
        self.entries.write().await.insert(identity, history);
    }

    /// 记录一次内容摘要，供下一次运行判断内容是否变化
    pub async fn record_content_hash(&self, identity: &TaskIdentity, content_hash: &str) {
        let mut entries = self.entries.write().await;
        entries.entry(identity.clone()).or_default().last_content_hash =
            Some(content_hash.to_string());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// 增量更新平均值，`count` 为包含新样本在内的样本数
fn running_average(previous: Option<f64>, sample: f64, count: u32) -> f64 {
    match previous {
        Some(avg) if count > 1 => avg + (sample - avg) / count as f64,
        _ => sample,
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn fetch_history(&self, identity: &TaskIdentity) -> SchedulerResult<TaskHistory> {
        Ok(self
            .entries
            .read()
            .await
            .get(identity)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_outcome(
        &self,
        identity: &TaskIdentity,
        outcome: &TaskOutcome,
    ) -> SchedulerResult<()> {
        let mut entries = self.entries.write().await;
        let history = entries.entry(identity.clone()).or_default();

        history.attempt_count += 1;
        history.last_outcome_at = Some(Utc::now());
        history.average_latency_ms = Some(running_average(
            history.average_latency_ms,
            outcome.duration_ms as f64,
            history.attempt_count,
        ));

        if outcome.is_success() {
            history.success_count += 1;
            if let Some(quality) = outcome.quality_score {
                history.average_quality_score = Some(running_average(
                    history.average_quality_score,
                    quality.clamp(0.0, 1.0),
                    history.success_count,
                ));
            }
        }

        debug!(
            identity = %identity,
            attempt_count = history.attempt_count,
            success_count = history.success_count,
            "Task outcome recorded"
        );
        Ok(())
    }
}
