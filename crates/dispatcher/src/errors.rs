use thiserror::Error;

/// 评分内部失败
///
/// 只在决策引擎内部流转，由引擎替换为最保守的结论，不会返回给调用方。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("{metric} 评分结果不是有限数: {value}")]
    NonFiniteScore { metric: &'static str, value: f64 },

    #[error("负载采样不可用: {0}")]
    UnusableLoadSample(String),

    #[error("历史记录查询失败: {0}")]
    HistoryLookup(String),
}

pub type PolicyResult<T> = std::result::Result<T, PolicyError>;

/// 检查评分是否为有限数
pub(crate) fn ensure_finite(metric: &'static str, value: f64) -> PolicyResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PolicyError::NonFiniteScore { metric, value })
    }
}
