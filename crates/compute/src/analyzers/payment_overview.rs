//! Headline payment figures: the current run against the historical average,
//! its rank, every year-over-year benchmark, and the revenue trend shape.

use serde::Serialize;
use tracing::debug;

use review_core::{
    current_entry_index, AnalysisResult, InputDocument, Module, PaymentSnapshot, Severity,
    TierMetric,
};
use review_rules::thresholds::PaymentThresholds;

use crate::algorithms::stats::{change_rate, mean};
use crate::algorithms::trend::{TrendClassifier, TrendPattern};
use crate::analyzer::{ensure_finite, AnalyzeError, Analyzer};
use crate::format::{format_change, format_number};

/// Percentage change of each headline metric against one baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricChanges {
    pub revenue: f64,
    pub pay_rate: f64,
    pub arpu: f64,
    pub arppu: f64,
}

impl MetricChanges {
    pub fn from_fn(f: impl Fn(TierMetric) -> f64) -> Self {
        Self {
            revenue: f(TierMetric::Revenue),
            pay_rate: f(TierMetric::PayRate),
            arpu: f(TierMetric::Arpu),
            arppu: f(TierMetric::Arppu),
        }
    }

    /// `change_rate` of every metric from `base` to `current`.
    pub fn between(
        current: impl Fn(TierMetric) -> f64,
        base: impl Fn(TierMetric) -> f64,
    ) -> Self {
        Self::from_fn(|key| change_rate(current(key), base(key)))
    }

    pub fn get(&self, key: TierMetric) -> f64 {
        match key {
            TierMetric::Revenue => self.revenue,
            TierMetric::PayRate => self.pay_rate,
            TierMetric::Arpu => self.arpu,
            TierMetric::Arppu => self.arppu,
        }
    }

    /// One-line summary, e.g. `流水 +8.3%, 付费率 +3.8%, ARPU +8.3%, ARPPU +4.4%`.
    pub fn summary(&self) -> String {
        TierMetric::ALL
            .iter()
            .map(|k| format!("{} {}", k.label(), format_change(self.get(*k))))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkChanges {
    pub event: String,
    pub changes: MetricChanges,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Ranks {
    pub pay_rate: usize,
    pub arppu: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
struct PaymentChart<'a> {
    time_series: &'a [PaymentSnapshot],
    current: &'a PaymentSnapshot,
    current_index: usize,
    yoy_benchmarks: &'a [PaymentSnapshot],
    trend_pattern: TrendPattern,
}

#[derive(Debug, Serialize)]
struct PaymentMetrics<'a> {
    vs_avg: MetricChanges,
    yoy_changes: &'a [BenchmarkChanges],
    ranks: Ranks,
    trend_pattern: TrendPattern,
    reference_revenue_change: f64,
    current_revenue: f64,
    current_pay_rate: f64,
    current_arpu: f64,
    current_arppu: f64,
}

/// 1-based position of `value` when sorted descending; ties share the better rank.
fn rank_desc(values: impl Iterator<Item = f64>, value: f64) -> usize {
    1 + values.filter(|v| *v > value).count()
}

fn rank_label(rank: usize) -> String {
    if rank == 1 {
        "最高".to_string()
    } else {
        format!("第{rank}名")
    }
}

pub struct PaymentOverviewAnalyzer {
    config: PaymentThresholds,
    trend: TrendClassifier,
}

impl PaymentOverviewAnalyzer {
    pub fn new() -> Self {
        Self::with_config(&PaymentThresholds::default())
    }

    pub fn with_config(config: &PaymentThresholds) -> Self {
        Self {
            config: config.clone(),
            trend: TrendClassifier::with_config(config),
        }
    }
}

impl Default for PaymentOverviewAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for PaymentOverviewAnalyzer {
    fn module(&self) -> Module {
        Module::PaymentOverview
    }

    fn analyze(&self, doc: &InputDocument) -> Result<AnalysisResult, AnalyzeError> {
        let po = &doc.payment_overview;
        let series = &po.time_series;
        if series.len() < 2 {
            return Err(AnalyzeError::InsufficientData(format!(
                "payment time series needs at least 2 entries, got {}",
                series.len()
            )));
        }
        let idx = current_entry_index(series.iter().map(|s| s.event.as_str()), &doc.meta.event_name)
            .ok_or_else(|| AnalyzeError::InsufficientData("payment time series is empty".into()))?;
        let current = &series[idx];
        debug!(event = %current.event, index = idx, "current payment entry");

        let others: Vec<&PaymentSnapshot> = series
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, s)| s)
            .collect();
        let avg = |key: TierMetric| {
            mean(&others.iter().map(|s| s.get(key)).collect::<Vec<_>>())
        };
        // a metric without a positive historical average has no change
        let vs_avg = MetricChanges::from_fn(|key| match avg(key) {
            base if base > 0.0 => change_rate(current.get(key), base),
            _ => 0.0,
        });
        ensure_finite("revenue vs average", vs_avg.revenue)?;

        let ranks = Ranks {
            pay_rate: rank_desc(series.iter().map(|s| s.pay_rate), current.pay_rate),
            arppu: rank_desc(series.iter().map(|s| s.arppu), current.arppu),
            total: series.len(),
        };

        let mut details = vec![
            format!(
                "当前活动: {}, 营收 {}, 付费率 {:.2}%, ARPU {:.2}, ARPPU {:.2}",
                current.event,
                format_number(current.revenue, true),
                current.pay_rate,
                current.arpu,
                current.arppu
            ),
            format!("vs 历史均值: {}", vs_avg.summary()),
            format!("付费率排名: {}/{}（{}）", ranks.pay_rate, ranks.total, rank_label(ranks.pay_rate)),
            format!("ARPPU排名: {}/{}（{}）", ranks.arppu, ranks.total, rank_label(ranks.arppu)),
        ];

        let yoy: Vec<BenchmarkChanges> = po
            .yoy_benchmarks
            .iter()
            .map(|b| BenchmarkChanges {
                event: b.event.clone(),
                changes: MetricChanges::between(|k| current.get(k), |k| b.get(k)),
            })
            .collect();
        for b in &yoy {
            details.push(format!("vs {}: {}", b.event, b.changes.summary()));
        }

        let revenues: Vec<f64> = series.iter().map(|s| s.revenue).collect();
        let pattern = self.trend.classify(&revenues);
        details.push(format!("趋势形态: {pattern}"));

        let (reference, ref_label) = match yoy.first() {
            Some(primary) => (primary.changes.revenue, "同比"),
            None => (vs_avg.revenue, "vs历史均值"),
        };

        let mut severity = Severity::Normal;
        let mut suggestions = Vec::new();
        let mut parts = Vec::new();

        if reference < self.config.revenue_anomalous {
            severity = Severity::Anomalous;
            parts.push(format!("营收{ref_label}下降 {:.1}%", reference.abs()));
            suggestions.push(format!("营收{ref_label}显著下滑，需深入分析原因"));
        } else if reference < 0.0 {
            severity = Severity::Watch;
            parts.push(format!("营收{ref_label}下降 {:.1}%", reference.abs()));
            suggestions.push("营收略有下滑，建议分析具体R级和模块表现".to_string());
        } else if reference > 20.0 {
            parts.push(format!("营收{ref_label}大幅增长 {reference:.1}%"));
        } else if reference > 0.0 {
            parts.push(format!("营收{ref_label}增长 {reference:.1}%"));
        }

        if vs_avg.pay_rate > 10.0 {
            parts.push(format!("付费率表现优异（{} vs 历史均值）", format_change(vs_avg.pay_rate)));
        } else if vs_avg.pay_rate > 0.0 {
            parts.push(format!("付费率高于历史均值（{}）", format_change(vs_avg.pay_rate)));
        }

        if vs_avg.arppu < self.config.arppu_vs_avg_watch {
            severity = severity.max(Severity::Watch);
            parts.push(format!("ARPPU偏低（{} vs 历史均值）", format_change(vs_avg.arppu)));
            suggestions.push("ARPPU低于历史均值，建议检查高价位商品/礼包的吸引力，或分析付费深度是否足够".to_string());
        } else if vs_avg.arppu < 0.0 {
            parts.push(format!("ARPPU略低（{} vs 历史均值）", format_change(vs_avg.arppu)));
        }

        if let Some(primary) = yoy.first() {
            for key in [TierMetric::PayRate, TierMetric::Arpu, TierMetric::Arppu] {
                let change = primary.changes.get(key);
                if change < self.config.yoy_warning {
                    details.push(format!("同比警告: {} 下降 {:.1}%", key.label(), change.abs()));
                }
            }
        }

        let conclusion = if parts.is_empty() {
            "付费数据整体表现平稳".to_string()
        } else {
            parts.join("，")
        };

        let chart = serde_json::to_value(PaymentChart {
            time_series: series,
            current,
            current_index: idx,
            yoy_benchmarks: &po.yoy_benchmarks,
            trend_pattern: pattern,
        })?;
        let raw = serde_json::to_value(PaymentMetrics {
            vs_avg,
            yoy_changes: &yoy,
            ranks,
            trend_pattern: pattern,
            reference_revenue_change: reference,
            current_revenue: current.revenue,
            current_pay_rate: current.pay_rate,
            current_arpu: current.arpu,
            current_arppu: current.arppu,
        })?;

        Ok(AnalysisResult::new(Module::PaymentOverview, conclusion, severity)
            .with_details(details)
            .with_suggestions(suggestions)
            .with_chart_data(chart)
            .with_raw_metrics(raw))
    }
}
