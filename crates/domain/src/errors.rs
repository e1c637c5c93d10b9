use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 翻译操作返回的错误
///
/// 翻译函数本身对调度器是不透明的，这里只保留分类所需的信息。
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TranslationError {
    pub message: String,
    pub code: Option<String>,
}

impl TranslationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// 错误分类
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Temporary,
    Quota,
    Invalid,
    Unknown,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Temporary => "temporary",
            ErrorClass::Quota => "quota",
            ErrorClass::Invalid => "invalid",
            ErrorClass::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
