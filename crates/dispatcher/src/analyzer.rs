//! 运行结果分析
//!
//! 从已完成的运行计算性能指标、识别瓶颈并给出建议，建议可以直接应用到
//! 下一次运行的 `RunOptions`。

use std::collections::BTreeMap;

use l10n_core::AnalyzerConfig;
use l10n_domain::{ErrorClass, RunOptions, RunRecord, RunResult, Task};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckKind {
    SlowTranslations,
    HighRetryRate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bottleneck {
    pub kind: BottleneckKind,
    /// 高重试率针对单个批次，慢翻译针对整个运行
    pub batch_id: Option<usize>,
    pub task_ids: Vec<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    InvestigateQuality,
    ReduceBatchSize,
    TargetedErrorHandling,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub message: String,
    pub error_class: Option<ErrorClass>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationReport {
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub bottlenecks: Vec<Bottleneck>,
    pub suggestions: Vec<Suggestion>,
    pub error_breakdown: BTreeMap<ErrorClass, usize>,
    pub dominant_error_class: Option<ErrorClass>,
    /// 被分析运行使用的批量大小
    pub batch_size: usize,
    /// 建议的下一次批量上限
    pub recommended_batch_size_cap: Option<usize>,
    /// 建议的批次间隔（毫秒）
    pub recommended_batch_delay_ms: Option<u64>,
}

impl OptimizationReport {
    pub fn has_bottleneck(&self, kind: BottleneckKind) -> bool {
        self.bottlenecks.iter().any(|b| b.kind == kind)
    }

    pub fn has_suggestion(&self, kind: SuggestionKind) -> bool {
        self.suggestions.iter().any(|s| s.kind == kind)
    }

    /// 将建议写入下一次运行的选项，只会收紧已有设置
    pub fn apply_to(&self, options: &mut RunOptions) {
        if let Some(cap) = self.recommended_batch_size_cap {
            options.batch_size_cap = Some(options.batch_size_cap.map_or(cap, |c| c.min(cap)));
        }
        if let Some(delay) = self.recommended_batch_delay_ms {
            options.batch_delay_ms = Some(options.batch_delay_ms.map_or(delay, |d| d.max(delay)));
        }
        if self.avg_latency_ms > 0.0 {
            options.historical_latency_ms = Some(self.avg_latency_ms.round() as u64);
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourcePrediction {
    pub estimated_time_ms: u64,
    pub avg_task_duration_ms: f64,
    pub recommended_batch_size: usize,
    pub recommended_concurrency: usize,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Default)]
pub struct OptimizationAnalyzer {
    config: AnalyzerConfig,
}

impl OptimizationAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn summarize(&self, run: &RunResult) -> OptimizationReport {
        let outcomes: Vec<_> = run.outcomes().collect();
        let attempted = outcomes.len();
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();

        let success_rate = if attempted == 0 {
            1.0
        } else {
            succeeded as f64 / attempted as f64
        };
        let avg_latency_ms = if attempted == 0 {
            0.0
        } else {
            outcomes.iter().map(|o| o.duration_ms as f64).sum::<f64>() / attempted as f64
        };

        let mut bottlenecks = Vec::new();

        let slow: Vec<String> = outcomes
            .iter()
            .filter(|o| o.duration_ms > self.config.slow_task_threshold_ms)
            .map(|o| o.task_id.clone())
            .collect();
        if !slow.is_empty() {
            bottlenecks.push(Bottleneck {
                kind: BottleneckKind::SlowTranslations,
                batch_id: None,
                detail: format!(
                    "{} tasks took longer than {} ms",
                    slow.len(),
                    self.config.slow_task_threshold_ms
                ),
                task_ids: slow,
            });
        }

        for job in &run.jobs {
            let size = job.per_task_results.len();
            if size == 0 {
                continue;
            }
            let retried: Vec<String> = job
                .per_task_results
                .iter()
                .filter(|o| o.retries() > 0)
                .map(|o| o.task_id.clone())
                .collect();
            let ratio = retried.len() as f64 / size as f64;
            if ratio > self.config.high_retry_ratio {
                bottlenecks.push(Bottleneck {
                    kind: BottleneckKind::HighRetryRate,
                    batch_id: Some(job.batch_id),
                    detail: format!(
                        "{} of {size} tasks in batch {} needed retries",
                        retried.len(),
                        job.batch_id
                    ),
                    task_ids: retried,
                });
            }
        }

        let mut error_breakdown = BTreeMap::new();
        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            *error_breakdown
                .entry(outcome.error_class.unwrap_or(ErrorClass::Unknown))
                .or_insert(0usize) += 1;
        }
        let failures: usize = error_breakdown.values().sum();
        let dominant_error_class = error_breakdown
            .iter()
            .find(|(_, count)| {
                failures > 0 && **count as f64 / failures as f64 > self.config.dominant_error_share
            })
            .map(|(class, _)| *class);

        let mut suggestions = Vec::new();
        let mut recommended_batch_size_cap = None;
        let mut recommended_batch_delay_ms = None;

        if success_rate < self.config.low_success_rate {
            suggestions.push(Suggestion {
                kind: SuggestionKind::InvestigateQuality,
                message: format!(
                    "success rate {:.0}% is below {:.0}%: investigate translation quality and upstream stability",
                    success_rate * 100.0,
                    self.config.low_success_rate * 100.0
                ),
                error_class: None,
            });
        }

        let high_latency = avg_latency_ms > self.config.high_avg_latency_ms;
        if high_latency {
            suggestions.push(Suggestion {
                kind: SuggestionKind::ReduceBatchSize,
                message: format!(
                    "average latency {avg_latency_ms:.0} ms exceeds {:.0} ms: reduce batch size or add concurrency",
                    self.config.high_avg_latency_ms
                ),
                error_class: None,
            });
        }
        if (high_latency || bottlenecks.iter().any(|b| b.kind == BottleneckKind::HighRetryRate))
            && run.batch_size > 1
        {
            let reduced = (run.batch_size as f64 * self.config.batch_reduction_factor).floor();
            recommended_batch_size_cap = Some((reduced as usize).max(1));
        }

        if let Some(class) = dominant_error_class {
            suggestions.push(Suggestion {
                kind: SuggestionKind::TargetedErrorHandling,
                message: format!(
                    "{class} errors account for {} of {failures} failures: add targeted handling",
                    error_breakdown.get(&class).copied().unwrap_or(0)
                ),
                error_class: Some(class),
            });
            if class == ErrorClass::Quota {
                recommended_batch_delay_ms = Some(self.config.quota_batch_delay_ms);
            }
        }

        info!(
            event = "run_analyzed",
            run.id = %run.run_id,
            analysis.success_rate = success_rate,
            analysis.avg_latency_ms = avg_latency_ms,
            analysis.bottlenecks = bottlenecks.len(),
            analysis.suggestions = suggestions.len(),
            "Run analysis completed"
        );

        OptimizationReport {
            success_rate,
            avg_latency_ms,
            bottlenecks,
            suggestions,
            error_breakdown,
            dominant_error_class,
            batch_size: run.batch_size,
            recommended_batch_size_cap,
            recommended_batch_delay_ms,
        }
    }

    /// 按历史平均单任务耗时线性外推资源需求
    pub fn predict_resource_requirements(
        &self,
        tasks: &[Task],
        history: &[RunRecord],
    ) -> ResourcePrediction {
        let (total_duration, total_tasks) = history
            .iter()
            .filter(|record| record.task_count > 0)
            .fold((0u64, 0usize), |(duration, count), record| {
                (duration.saturating_add(record.duration_ms), count + record.task_count)
            });

        let avg_task_duration_ms = if total_tasks > 0 {
            total_duration as f64 / total_tasks as f64
        } else {
            self.config.default_task_duration_ms as f64
        };

        let task_count = tasks.len();
        let risk_level = if task_count > self.config.high_risk_task_count {
            RiskLevel::High
        } else if task_count > self.config.medium_risk_task_count {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        let plan = match risk_level {
            RiskLevel::Low => self.config.low_risk_plan,
            RiskLevel::Medium => self.config.medium_risk_plan,
            RiskLevel::High => self.config.high_risk_plan,
        };

        ResourcePrediction {
            estimated_time_ms: (avg_task_duration_ms * task_count as f64).round() as u64,
            avg_task_duration_ms,
            recommended_batch_size: plan.batch_size,
            recommended_concurrency: plan.concurrency,
            risk_level,
        }
    }
}
