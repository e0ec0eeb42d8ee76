//! Behavior metrics vs benchmark, usage rates against the participation base,
//! and DAU anomaly scan.

use serde::Serialize;
use tracing::debug;

use review_core::{AnalysisResult, BehaviorMetric, DailyActive, InputDocument, Module, Severity};
use review_rules::thresholds::BehaviorThresholds;

use crate::algorithms::stats::{change_rate, detect_anomaly, percent_of};
use crate::analyzer::{AnalyzeError, Analyzer};
use crate::format::{format_change, format_number};

/// Units whose value is a head or event count and can be read as usage.
const COUNT_UNITS: [&str; 2] = ["人", "次"];

#[derive(Debug, Clone, Serialize)]
pub struct MetricChange {
    pub name: String,
    pub current: f64,
    pub benchmark: Option<f64>,
    pub change: Option<f64>,
    pub usage_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageRate {
    pub name: String,
    pub rate: f64,
    pub current: f64,
}

#[derive(Debug, Serialize)]
struct BehaviorChart<'a> {
    metrics: &'a [BehaviorMetric],
    metric_changes: &'a [MetricChange],
    daily_trend: &'a [DailyActive],
    anomaly_dates: &'a [String],
    usage_rates: &'a [UsageRate],
    base_users: f64,
}

#[derive(Debug, Serialize)]
struct BehaviorMetrics<'a> {
    metric_changes: &'a [MetricChange],
    anomaly_count: usize,
    usage_rates: &'a [UsageRate],
}

pub struct BehaviorAnalyzer {
    config: BehaviorThresholds,
}

impl BehaviorAnalyzer {
    pub fn new() -> Self {
        Self::with_config(&BehaviorThresholds::default())
    }

    pub fn with_config(config: &BehaviorThresholds) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Users of the participation stage, else of the first funnel stage.
    fn base_users(&self, doc: &InputDocument) -> f64 {
        let stages = &doc.reach_conversion.stages;
        stages
            .iter()
            .find(|s| {
                let name = s.stage.to_lowercase();
                self.config
                    .participation_keywords
                    .iter()
                    .any(|k| name.contains(&k.to_lowercase()))
            })
            .or_else(|| stages.first())
            .map(|s| s.users)
            .unwrap_or(0.0)
    }
}

impl Default for BehaviorAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for BehaviorAnalyzer {
    fn module(&self) -> Module {
        Module::Behavior
    }

    fn analyze(&self, doc: &InputDocument) -> Result<AnalysisResult, AnalyzeError> {
        let data = doc
            .behavior_data
            .as_ref()
            .filter(|b| !b.metrics.is_empty() || !b.daily_trend.is_empty())
            .ok_or_else(|| {
                AnalyzeError::InsufficientData("behavior_data block is missing or empty".into())
            })?;

        let base = self.base_users(doc);
        let mut details = Vec::new();
        let mut suggestions = Vec::new();
        let mut severity = Severity::Normal;

        let mut changes = Vec::with_capacity(data.metrics.len());
        let mut usage = Vec::new();
        for m in &data.metrics {
            let usage_rate = (base > 0.0 && COUNT_UNITS.contains(&m.unit.as_str()))
                .then(|| percent_of(m.current_value, base, 2));
            if let Some(rate) = usage_rate {
                usage.push(UsageRate {
                    name: m.metric_name.clone(),
                    rate,
                    current: m.current_value,
                });
            }

            let benchmark = m.benchmark_value.filter(|b| *b > 0.0);
            let change = benchmark.map(|b| change_rate(m.current_value, b));

            let mut line = format!(
                "{}: 当期 {}{}",
                m.metric_name,
                format_number(m.current_value, false),
                m.unit
            );
            match (benchmark, change) {
                (Some(b), Some(c)) => {
                    line.push_str(&format!(
                        " vs 对标 {}{}（{}）",
                        format_number(b, false),
                        m.unit,
                        format_change(c)
                    ));
                    if c < self.config.drop_anomalous {
                        severity = severity.max(Severity::Anomalous);
                        suggestions.push(format!("{} 大幅下降 {:.1}%，建议排查原因", m.metric_name, c.abs()));
                    } else if c < self.config.drop_watch {
                        severity = severity.max(Severity::Watch);
                    }
                }
                _ if usage_rate.is_none() => line.push_str("（无对标数据）"),
                _ => {}
            }
            if let Some(rate) = usage_rate {
                line.push_str(&format!("，使用率 {rate:.1}%"));
            }
            details.push(line);

            changes.push(MetricChange {
                name: m.metric_name.clone(),
                current: m.current_value,
                benchmark: m.benchmark_value,
                change,
                usage_rate,
            });
        }

        let low_count = usage.iter().filter(|u| u.rate < self.config.low_usage_rate).count();
        if !usage.is_empty() {
            details.push(format!("（使用率基数: 活动参与人数 {}人）", format_number(base, false)));
            let mut ranked: Vec<&UsageRate> = usage.iter().collect();
            ranked.sort_by(|a, b| b.rate.total_cmp(&a.rate));
            let high: Vec<&str> = ranked
                .iter()
                .filter(|u| u.rate > self.config.high_usage_rate)
                .take(3)
                .map(|u| u.name.as_str())
                .collect();
            let low: Vec<&str> = ranked
                .iter()
                .filter(|u| u.rate < self.config.low_usage_rate)
                .take(5)
                .map(|u| u.name.as_str())
                .collect();
            if !high.is_empty() {
                details.push(format!(
                    "高使用率道具(>{}%): {}",
                    self.config.high_usage_rate,
                    high.join(", ")
                ));
            }
            if !low.is_empty() {
                details.push(format!(
                    "低使用率道具(<{}%): {}",
                    self.config.low_usage_rate,
                    low.join(", ")
                ));
            }
            if low_count * 2 > usage.len() {
                severity = severity.max(Severity::Watch);
                suggestions.push(format!(
                    "超过半数道具使用率低于{}%，建议检查道具获取/使用门槛是否过高",
                    self.config.low_usage_rate
                ));
            }
        }

        let dau: Vec<f64> = data.daily_trend.iter().map(|d| d.dau).collect();
        let flagged = detect_anomaly(&dau, self.config.dau_anomaly_z);
        let anomaly_dates: Vec<String> = flagged
            .iter()
            .map(|&i| data.daily_trend[i].date.clone())
            .collect();
        for &i in &flagged {
            let day = &data.daily_trend[i];
            details.push(format!("日趋势异常: {} DAU={}，偏离均值", day.date, format_number(day.dau, false)));
        }
        if !flagged.is_empty() {
            debug!(days = flagged.len(), "dau anomalies");
            severity = severity.max(Severity::Watch);
            suggestions.push(format!(
                "日趋势中 {} 天出现 DAU 异常波动（{}），建议排查活动节奏或外部影响",
                flagged.len(),
                anomaly_dates.join("、")
            ));
        }

        let positive = changes.iter().filter(|c| c.change.is_some_and(|v| v > 0.0)).count();
        let negative = changes.iter().filter(|c| c.change.is_some_and(|v| v < 0.0)).count();
        let any_benchmark = changes.iter().any(|c| c.change.is_some());
        let conclusion = if !any_benchmark && !usage.is_empty() {
            if low_count * 2 > usage.len() {
                format!(
                    "行为数据: {} 项道具中 {} 项使用率低于{}%，部分道具吸引力不足",
                    usage.len(),
                    low_count,
                    self.config.low_usage_rate
                )
            } else {
                format!("行为数据: 共 {} 项道具使用数据，整体使用率分布合理", usage.len())
            }
        } else if !any_benchmark {
            "行为数据无对标指标，仅完成日趋势检查".to_string()
        } else if negative == 0 && severity <= Severity::Watch {
            "行为数据表现良好，各项指标均优于对标".to_string()
        } else if positive > negative {
            "行为数据整体向好，部分指标需关注".to_string()
        } else if severity == Severity::Normal {
            format!("行为数据有 {negative} 项指标低于对标，降幅可控")
        } else {
            format!("行为数据存在 {negative} 项指标下滑，需重点关注")
        };

        let chart = serde_json::to_value(BehaviorChart {
            metrics: &data.metrics,
            metric_changes: &changes,
            daily_trend: &data.daily_trend,
            anomaly_dates: &anomaly_dates,
            usage_rates: &usage,
            base_users: base,
        })?;
        let raw = serde_json::to_value(BehaviorMetrics {
            metric_changes: &changes,
            anomaly_count: anomaly_dates.len(),
            usage_rates: &usage,
        })?;

        Ok(AnalysisResult::new(Module::Behavior, conclusion, severity)
            .with_details(details)
            .with_suggestions(suggestions)
            .with_chart_data(chart)
            .with_raw_metrics(raw))
    }
}
