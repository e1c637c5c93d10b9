use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 资源类型权重，键为资源类型的 snake_case 名称
    pub type_weights: HashMap<String, f64>,
    /// 未在 type_weights 中出现的资源类型所用权重
    pub default_type_weight: f64,
    /// 优先任务获得的额外分数
    pub priority_boost: f64,
    /// 高优先级提示获得的额外分数
    pub priority_hint_bonus: f64,
    /// 无历史数据时的单任务平均耗时（毫秒）
    pub default_task_latency_ms: u64,
    /// 每个批次的固定开销（毫秒）
    pub batch_overhead_ms: u64,
    /// 批次之间的默认间隔（毫秒）
    pub batch_delay_ms: u64,
    pub quality_threshold: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let type_weights = [
            ("product", 10.0),
            ("collection", 8.0),
            ("page", 6.0),
            ("article", 6.0),
            ("blog", 4.0),
            ("menu", 3.0),
            ("shop_policy", 3.0),
            ("metafield", 2.0),
            ("theme", 2.0),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), weight))
        .collect();

        Self {
            type_weights,
            default_type_weight: 1.0,
            priority_boost: 20.0,
            priority_hint_bonus: 5.0,
            default_task_latency_ms: 2000,
            batch_overhead_ms: 500,
            batch_delay_ms: 0,
            quality_threshold: 0.7,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some((name, weight)) = self.type_weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(anyhow::anyhow!("资源类型 {name} 的权重无效: {weight}"));
        }

        if self.default_task_latency_ms == 0 {
            return Err(anyhow::anyhow!("默认任务耗时必须大于0"));
        }

        if !(0.0..=1.0).contains(&self.quality_threshold) {
            return Err(anyhow::anyhow!(
                "质量阈值必须位于 [0, 1] 区间: {}",
                self.quality_threshold
            ));
        }

        Ok(())
    }

    /// 获取资源类型的权重
    pub fn weight_for(&self, type_name: &str) -> f64 {
        self.type_weights
            .get(type_name)
            .copied()
            .unwrap_or(self.default_type_weight)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// 单任务耗时超过该值视为慢翻译（毫秒）
    pub slow_task_threshold_ms: u64,
    /// 批次中需要重试的任务占比超过该值视为高重试率
    pub high_retry_ratio: f64,
    pub low_success_rate: f64,
    pub high_avg_latency_ms: f64,
    /// 某类错误占全部失败的比例超过该值视为主导错误
    pub dominant_error_share: f64,
    pub medium_risk_task_count: usize,
    pub high_risk_task_count: usize,
    /// 无历史运行数据时的单任务耗时估计（毫秒）
    pub default_task_duration_ms: u64,
    /// 建议缩小批量时使用的比例
    pub batch_reduction_factor: f64,
    /// 配额错误占主导时建议的批次间隔（毫秒）
    pub quota_batch_delay_ms: u64,
    pub low_risk_plan: CapacityPlan,
    pub medium_risk_plan: CapacityPlan,
    pub high_risk_plan: CapacityPlan,
}

/// 某一风险等级下建议的批量与并发度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityPlan {
    pub batch_size: usize,
    pub concurrency: usize,
}

impl CapacityPlan {
    pub const fn new(batch_size: usize, concurrency: usize) -> Self {
        Self {
            batch_size,
            concurrency,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            slow_task_threshold_ms: 10_000,
            high_retry_ratio: 0.2,
            low_success_rate: 0.8,
            high_avg_latency_ms: 5000.0,
            dominant_error_share: 0.5,
            medium_risk_task_count: 100,
            high_risk_task_count: 500,
            default_task_duration_ms: 2000,
            batch_reduction_factor: 0.5,
            quota_batch_delay_ms: 60_000,
            low_risk_plan: CapacityPlan::new(10, 5),
            medium_risk_plan: CapacityPlan::new(8, 3),
            high_risk_plan: CapacityPlan::new(5, 1),
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.high_retry_ratio) {
            return Err(anyhow::anyhow!("高重试率阈值必须位于 [0, 1] 区间"));
        }

        if !(0.0..=1.0).contains(&self.low_success_rate) {
            return Err(anyhow::anyhow!("成功率阈值必须位于 [0, 1] 区间"));
        }

        if !(0.0..=1.0).contains(&self.dominant_error_share) {
            return Err(anyhow::anyhow!("主导错误占比必须位于 [0, 1] 区间"));
        }

        if !(self.batch_reduction_factor > 0.0 && self.batch_reduction_factor <= 1.0) {
            return Err(anyhow::anyhow!(
                "批量缩减比例必须位于 (0, 1] 区间: {}",
                self.batch_reduction_factor
            ));
        }

        for (level, plan) in [
            ("低", self.low_risk_plan),
            ("中", self.medium_risk_plan),
            ("高", self.high_risk_plan),
        ] {
            if plan.batch_size == 0 || plan.concurrency == 0 {
                return Err(anyhow::anyhow!(
                    "{level}风险等级的建议批量与并发度必须大于 0"
                ));
            }
        }

        if self.medium_risk_task_count >= self.high_risk_task_count {
            return Err(anyhow::anyhow!(
                "中风险任务数 {} 必须小于高风险任务数 {}",
                self.medium_risk_task_count,
                self.high_risk_task_count
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_weights() {
        let config = SchedulerConfig::default();
        assert_eq!(config.weight_for("product"), 10.0);
        assert_eq!(config.weight_for("unknown_type"), 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_analyzer_config_thresholds() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.slow_task_threshold_ms, 10_000);
        assert_eq!(config.high_risk_task_count, 500);
        assert!(config.validate().is_ok());

        let invalid = AnalyzerConfig {
            medium_risk_task_count: 600,
            ..AnalyzerConfig::default()
        };
        assert!(invalid.validate().is_err());

        assert_eq!(config.medium_risk_plan, CapacityPlan::new(8, 3));
        let zero_plan = AnalyzerConfig {
            high_risk_plan: CapacityPlan::new(5, 0),
            ..AnalyzerConfig::default()
        };
        assert!(zero_plan.validate().is_err());
    }
}
