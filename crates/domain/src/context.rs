//! 每个决策调用点使用的显式上下文

use std::collections::{HashMap, HashSet};

use crate::entities::{ResourceType, Task};
use crate::errors::TranslationError;
use crate::value_objects::{Priority, SystemLoadSnapshot};

/// 跳过决策的上下文
#[derive(Debug, Clone, Default)]
pub struct SkipContext {
    pub priority: Priority,
    pub user_requested: bool,
    pub important_types: HashSet<ResourceType>,
    /// 调用方确认内容未变化
    pub content_unchanged: bool,
    pub quality_threshold: Option<f64>,
}

/// 批量大小决策的上下文
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub snapshot: SystemLoadSnapshot,
    pub batch_size_cap: Option<usize>,
}

impl BatchContext {
    pub fn new(snapshot: SystemLoadSnapshot) -> Self {
        Self {
            snapshot,
            batch_size_cap: None,
        }
    }
}

/// 重试决策的上下文
#[derive(Debug, Clone, Copy)]
pub struct RetryContext<'a> {
    pub task: &'a Task,
    pub error: &'a TranslationError,
    /// 已经进行过的重试次数，首次失败时为 0
    pub attempt_count: u32,
}

impl<'a> RetryContext<'a> {
    pub fn new(task: &'a Task, error: &'a TranslationError, attempt_count: u32) -> Self {
        Self {
            task,
            error,
            attempt_count,
        }
    }
}

/// `schedule_run` 的调用选项，全部可选
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub priority_ids: HashSet<String>,
    pub user_requested: bool,
    /// 覆盖配置中的资源类型权重
    pub type_weights: HashMap<ResourceType, f64>,
    pub batch_delay_ms: Option<u64>,
    pub quality_threshold: Option<f64>,
    pub important_types: HashSet<ResourceType>,
    /// 调用方确认内容未变化的任务
    pub unchanged_ids: HashSet<String>,
    /// 上一次运行分析后给出的批量大小上限
    pub batch_size_cap: Option<usize>,
    /// 历史平均单任务耗时，用于完成时间估计
    pub historical_latency_ms: Option<u64>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_user_requested(mut self, user_requested: bool) -> Self {
        self.user_requested = user_requested;
        self
    }

    pub fn with_type_weight(mut self, resource_type: ResourceType, weight: f64) -> Self {
        self.type_weights.insert(resource_type, weight);
        self
    }

    pub fn with_batch_delay_ms(mut self, delay_ms: u64) -> Self {
        self.batch_delay_ms = Some(delay_ms);
        self
    }

    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = Some(threshold);
        self
    }

    pub fn with_important_types<I>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = ResourceType>,
    {
        self.important_types.extend(types);
        self
    }

    pub fn with_unchanged_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unchanged_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_batch_size_cap(mut self, cap: usize) -> Self {
        self.batch_size_cap = Some(cap);
        self
    }

    pub fn with_historical_latency_ms(mut self, latency_ms: u64) -> Self {
        self.historical_latency_ms = Some(latency_ms);
        self
    }

    /// 为单个任务构造跳过决策上下文
    pub fn skip_context_for(&self, task: &Task) -> SkipContext {
        SkipContext {
            priority: task.priority(),
            user_requested: self.user_requested,
            important_types: self.important_types.clone(),
            content_unchanged: self.unchanged_ids.contains(&task.id),
            quality_threshold: self.quality_threshold,
        }
    }
}
