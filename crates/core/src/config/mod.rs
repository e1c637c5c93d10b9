//! 配置管理
//!
//! 调度器的所有阈值、权重与退避常量都集中在 [`AppConfig`] 中，
//! 加载顺序为：默认值 → TOML 配置文件 → `L10N_` 前缀的环境变量。

pub mod models;

pub use models::*;
