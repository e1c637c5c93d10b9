use serde::{Deserialize, Serialize};

/// 评分策略与批量大小决策的阈值配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// 历史失败率在风险分中的权重
    pub risk_failure_weight: f64,
    /// 质量惩罚在风险分中的权重
    pub risk_quality_weight: f64,
    /// 无历史记录时的中性失败率
    pub neutral_failure_rate: f64,
    /// 无历史记录时的质量惩罚
    pub neutral_quality_penalty: f64,
    pub benefit_base: f64,
    pub benefit_high_priority_bonus: f64,
    pub benefit_important_type_bonus: f64,
    /// 风险超过该值时推迟翻译
    pub defer_risk_threshold: f64,
    /// 收益低于该值时跳过翻译
    pub skip_benefit_threshold: f64,
    /// 活跃作业数归一化的分母
    pub active_job_capacity: u32,
    pub base_batch_size: usize,
    pub max_batch_size: usize,
    pub high_load_batch_size: usize,
    pub low_load_threshold: f64,
    pub high_load_threshold: f64,
    /// 平均内容大小超过该值视为重载内容
    pub heavy_content_threshold: f64,
    pub heavy_content_factor: f64,
    pub heavy_content_floor: usize,
    /// 评分失败时使用的保守批量大小
    pub fallback_batch_size: usize,
    /// 单次运行内历史缓存的最大条目数
    pub history_cache_capacity: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            risk_failure_weight: 0.6,
            risk_quality_weight: 0.4,
            neutral_failure_rate: 0.5,
            neutral_quality_penalty: 0.5,
            benefit_base: 0.5,
            benefit_high_priority_bonus: 0.3,
            benefit_important_type_bonus: 0.2,
            defer_risk_threshold: 0.7,
            skip_benefit_threshold: 0.3,
            active_job_capacity: 20,
            base_batch_size: 10,
            max_batch_size: 20,
            high_load_batch_size: 5,
            low_load_threshold: 0.3,
            high_load_threshold: 0.7,
            heavy_content_threshold: 5000.0,
            heavy_content_factor: 0.6,
            heavy_content_floor: 3,
            fallback_batch_size: 3,
            history_cache_capacity: 256,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let weights = self.risk_failure_weight + self.risk_quality_weight;
        if self.risk_failure_weight < 0.0 || self.risk_quality_weight < 0.0 || weights <= 0.0 {
            return Err(anyhow::anyhow!("风险权重必须为非负数且总和大于0"));
        }

        for (name, value) in [
            ("defer_risk_threshold", self.defer_risk_threshold),
            ("skip_benefit_threshold", self.skip_benefit_threshold),
            ("low_load_threshold", self.low_load_threshold),
            ("high_load_threshold", self.high_load_threshold),
            ("heavy_content_factor", self.heavy_content_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow::anyhow!("{name} 必须位于 [0, 1] 区间: {value}"));
            }
        }

        if self.low_load_threshold > self.high_load_threshold {
            return Err(anyhow::anyhow!(
                "低负载阈值 {} 不能大于高负载阈值 {}",
                self.low_load_threshold,
                self.high_load_threshold
            ));
        }

        if self.active_job_capacity == 0 {
            return Err(anyhow::anyhow!("活跃作业容量必须大于0"));
        }

        if self.base_batch_size == 0 || self.high_load_batch_size == 0 {
            return Err(anyhow::anyhow!("批量大小必须大于0"));
        }

        if !(self.high_load_batch_size <= self.base_batch_size
            && self.base_batch_size <= self.max_batch_size)
        {
            return Err(anyhow::anyhow!(
                "批量大小需满足 high_load({}) <= base({}) <= max({})",
                self.high_load_batch_size,
                self.base_batch_size,
                self.max_batch_size
            ));
        }

        if self.fallback_batch_size == 0 {
            return Err(anyhow::anyhow!("保守批量大小必须大于0"));
        }

        if self.history_cache_capacity == 0 {
            return Err(anyhow::anyhow!("历史缓存容量必须大于0"));
        }

        Ok(())
    }
}

/// 重试策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    /// 重试次数硬上限，与错误分类无关
    pub max_attempts: u32,
    /// 临时错误的基础退避间隔（毫秒）
    pub temporary_base_delay_ms: u64,
    /// 指数退避倍数
    pub backoff_multiplier: f64,
    /// 单次退避的最大间隔（毫秒）
    pub max_delay_ms: u64,
    /// 配额错误的固定等待时间（毫秒）
    pub quota_delay_ms: u64,
    /// 配额错误允许的重试次数
    pub quota_max_attempts: u32,
    /// 重试间隔的随机抖动范围（0.0-1.0）
    pub jitter_factor: f64,
    /// 每次重试后成功概率的衰减系数
    pub success_decay: f64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            temporary_base_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 60_000,
            quota_delay_ms: 60_000,
            quota_max_attempts: 2,
            jitter_factor: 0.0,
            success_decay: 0.7,
        }
    }
}

impl RetryPolicyConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow::anyhow!("最大重试次数必须大于0"));
        }

        if self.backoff_multiplier < 1.0 {
            return Err(anyhow::anyhow!(
                "指数退避倍数不能小于1: {}",
                self.backoff_multiplier
            ));
        }

        if self.max_delay_ms < self.temporary_base_delay_ms {
            return Err(anyhow::anyhow!("最大退避间隔不能小于基础退避间隔"));
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(anyhow::anyhow!(
                "抖动系数必须位于 [0, 1] 区间: {}",
                self.jitter_factor
            ));
        }

        if !(0.0..=1.0).contains(&self.success_decay) {
            return Err(anyhow::anyhow!(
                "成功率衰减系数必须位于 [0, 1] 区间: {}",
                self.success_decay
            ));
        }

        Ok(())
    }
}
