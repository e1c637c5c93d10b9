//! 调度核心依赖的外部协作者
//!
//! 记录存储、负载采样、翻译函数与延时器都通过这些接口注入，
//! 调度器只持有 `Arc<dyn _>`。

use std::time::Duration;

use async_trait::async_trait;
use l10n_core::SchedulerResult;

use crate::entities::{Task, TaskHistory, TaskOutcome, TranslatedContent};
use crate::errors::{ErrorClass, TranslationError};
use crate::value_objects::{SystemLoadSnapshot, TaskIdentity};

/// 任务历史存储
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 查询任务身份的历史记录；没有历史时返回零值而不是错误
    async fn fetch_history(&self, identity: &TaskIdentity) -> SchedulerResult<TaskHistory>;

    /// 记录单个任务的执行结果，供后续运行使用
    async fn record_outcome(
        &self,
        _identity: &TaskIdentity,
        _outcome: &TaskOutcome,
    ) -> SchedulerResult<()> {
        Ok(())
    }
}

/// 系统负载采样
#[async_trait]
pub trait LoadProvider: Send + Sync {
    async fn fetch_system_load(&self) -> SchedulerResult<SystemLoadSnapshot>;
}

/// 不透明的翻译操作，必须可以安全地重复调用
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, task: &Task) -> Result<TranslatedContent, TranslationError>;
}

/// 可替换的延时器，测试中使用假时钟
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// 错误分类器
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &TranslationError) -> ErrorClass;
}
