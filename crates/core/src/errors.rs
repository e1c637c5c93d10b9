use thiserror::Error;

/// 调度器错误类型定义
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("无效的输入: {0}")]
    InvalidInput(String),

    #[error("任务未找到: {id}")]
    TaskNotFound { id: String },

    #[error("历史记录查询失败: {0}")]
    HistoryLookup(String),

    #[error("系统负载采样失败: {0}")]
    LoadProbe(String),

    #[error("策略评分错误: {0}")]
    Policy(String),

    #[error("调度运行已取消")]
    Cancelled,

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, SchedulerError>;
