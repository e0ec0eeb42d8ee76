//! Payer-tier structure: revenue shares, per-tier changes against the primary
//! comparison, activity positioning, and the downward "crossing" check.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use review_core::{
    current_entry_index, AnalysisResult, InputDocument, Module, Severity, TierSnapshot,
};
use review_rules::thresholds::RTierThresholds;

use super::payment_overview::MetricChanges;
use crate::algorithms::stats::percent_of;
use crate::analyzer::{AnalyzeError, Analyzer};
use crate::format::format_change;

/// Which audience the activity effectively served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Positioning {
    #[serde(rename = "高R向活动")]
    HighSpender,
    #[serde(rename = "普惠型活动")]
    BroadReach,
    #[serde(rename = "全面提升型活动")]
    UniformGrowth,
    #[serde(rename = "结构性变化活动")]
    StructuralShift,
}

impl Positioning {
    pub fn label(&self) -> &'static str {
        match self {
            Positioning::HighSpender => "高R向活动",
            Positioning::BroadReach => "普惠型活动",
            Positioning::UniformGrowth => "全面提升型活动",
            Positioning::StructuralShift => "结构性变化活动",
        }
    }
}

#[derive(Debug, Serialize)]
struct RTierChart<'a> {
    tiers: &'a [String],
    time_series: &'a [TierSnapshot],
    current: &'a TierSnapshot,
    comparisons: Vec<&'a TierSnapshot>,
    tier_shares: &'a IndexMap<String, f64>,
}

#[derive(Debug, Serialize)]
struct RTierMetrics<'a> {
    tier_shares: &'a IndexMap<String, f64>,
    tier_changes: &'a IndexMap<String, MetricChanges>,
    all_bench_changes: &'a IndexMap<String, IndexMap<String, MetricChanges>>,
    positioning: Positioning,
    total_revenue: f64,
    crossing: bool,
}

fn tier_changes(
    tiers: &[String],
    current: &TierSnapshot,
    base: &TierSnapshot,
) -> IndexMap<String, MetricChanges> {
    tiers
        .iter()
        .map(|t| {
            let cur = current.metrics(t);
            let prev = base.metrics(t);
            (t.clone(), MetricChanges::between(|k| cur.get(k), |k| prev.get(k)))
        })
        .collect()
}

pub struct RTierAnalyzer {
    config: RTierThresholds,
}

impl RTierAnalyzer {
    pub fn new() -> Self {
        Self::with_config(&RTierThresholds::default())
    }

    pub fn with_config(config: &RTierThresholds) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn positioning(
        &self,
        tiers: &[String],
        shares: &IndexMap<String, f64>,
        changes: &IndexMap<String, MetricChanges>,
    ) -> (Positioning, String) {
        let top = &tiers[0];
        let top_share = shares.get(top).copied().unwrap_or_default();
        let broad = tiers[1..].iter().any(|t| {
            changes
                .get(t)
                .is_some_and(|c| c.pay_rate > self.config.broad_reach_pay_rate_gain)
        });
        let all_grew = changes.values().all(|c| c.revenue > 0.0);

        if top_share > self.config.high_spender_share {
            (
                Positioning::HighSpender,
                format!("{top}营收占比达 {top_share}%，活动对高付费用户吸引力强"),
            )
        } else if broad {
            (Positioning::BroadReach, "中小R付费率提升显著，活动覆盖面广".to_string())
        } else if all_grew {
            (Positioning::UniformGrowth, "各R级均实现增长，活动设计均衡".to_string())
        } else {
            (
                Positioning::StructuralShift,
                "部分R级增长、部分下滑，需关注结构变化".to_string(),
            )
        }
    }
}

impl Default for RTierAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for RTierAnalyzer {
    fn module(&self) -> Module {
        Module::RTier
    }

    fn analyze(&self, doc: &InputDocument) -> Result<AnalysisResult, AnalyzeError> {
        let rt = &doc.r_tier_payment;
        let tiers = &rt.tiers;
        if tiers.is_empty() {
            return Err(AnalyzeError::InsufficientData("no payer tiers listed".into()));
        }
        let events = rt.time_series.iter().map(|s| s.event.as_str());
        let idx = current_entry_index(events, &doc.meta.event_name)
            .ok_or_else(|| AnalyzeError::InsufficientData("tier time series is empty".into()))?;
        let current = &rt.time_series[idx];

        // explicit benchmarks win; otherwise the neighbouring run, earlier first
        let comparisons: Vec<&TierSnapshot> = if rt.benchmarks.is_empty() {
            idx.checked_sub(1)
                .or_else(|| (idx + 1 < rt.time_series.len()).then_some(idx + 1))
                .map(|i| &rt.time_series[i])
                .into_iter()
                .collect()
        } else {
            rt.benchmarks.iter().collect()
        };
        let primary = comparisons.first().copied().ok_or_else(|| {
            AnalyzeError::InsufficientData(
                "no benchmark or adjacent run to compare tiers against".into(),
            )
        })?;
        debug!(current = %current.event, primary = %primary.event, "tier comparison");

        let total_revenue: f64 = tiers.iter().map(|t| current.metrics(t).revenue).sum();
        let shares: IndexMap<String, f64> = tiers
            .iter()
            .map(|t| (t.clone(), percent_of(current.metrics(t).revenue, total_revenue, 1)))
            .collect();
        let changes = tier_changes(tiers, current, primary);

        let mut details: Vec<String> = tiers
            .iter()
            .map(|t| {
                let c = changes[t.as_str()];
                format!(
                    "{t}: 营收占比 {}%, vs {} 营收 {}, 付费率 {}, ARPU {}",
                    shares[t.as_str()],
                    primary.event,
                    format_change(c.revenue),
                    format_change(c.pay_rate),
                    format_change(c.arpu)
                )
            })
            .collect();

        let mut all_bench_changes = IndexMap::new();
        all_bench_changes.insert(primary.event.clone(), changes.clone());
        for bench in comparisons.iter().skip(1) {
            let bench_changes = tier_changes(tiers, current, bench);
            for (t, c) in &bench_changes {
                details.push(format!(
                    "{t} vs {}: 营收 {}, 付费率 {}",
                    bench.event,
                    format_change(c.revenue),
                    format_change(c.pay_rate)
                ));
            }
            all_bench_changes.insert(bench.event.clone(), bench_changes);
        }

        let (positioning, positioning_detail) = self.positioning(tiers, &shares, &changes);
        details.push(format!("活动定位: {} - {}", positioning.label(), positioning_detail));

        let mut severity = Severity::Normal;
        let mut suggestions = Vec::new();
        for (t, c) in &changes {
            if c.revenue < self.config.revenue_anomalous {
                severity = severity.max(Severity::Anomalous);
                suggestions.push(format!("{t} 营收vs主对标下降 {:.1}%，建议排查原因", c.revenue.abs()));
            } else if c.revenue < self.config.revenue_watch {
                severity = severity.max(Severity::Watch);
            }
        }

        let mut crossing = false;
        if tiers.len() >= 2 {
            let top = &tiers[0];
            let bottom = &tiers[tiers.len() - 1];
            let top_change = changes[top.as_str()].revenue;
            let bottom_change = changes[bottom.as_str()].revenue;
            if top_change < self.config.crossing_top_drop
                && bottom_change > self.config.crossing_bottom_gain
            {
                crossing = true;
                details.push(format!("交叉现象: {top} 下降但 {bottom} 上升，付费重心下移"));
                suggestions.push("高付费用户贡献减弱，建议优化高价值内容吸引力".to_string());
            }
        }

        let conclusion = format!("{}。{}", positioning.label(), positioning_detail);

        let chart = serde_json::to_value(RTierChart {
            tiers,
            time_series: &rt.time_series,
            current,
            comparisons: comparisons.clone(),
            tier_shares: &shares,
        })?;
        let raw = serde_json::to_value(RTierMetrics {
            tier_shares: &shares,
            tier_changes: &changes,
            all_bench_changes: &all_bench_changes,
            positioning,
            total_revenue,
            crossing,
        })?;

        Ok(AnalysisResult::new(Module::RTier, conclusion, severity)
            .with_details(details)
            .with_suggestions(suggestions)
            .with_chart_data(chart)
            .with_raw_metrics(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::tests::sample_document;
    use review_core::TierMetrics;

    fn snapshot(event: &str, tiers: &[(&str, f64, f64)]) -> TierSnapshot {
        TierSnapshot {
            event: event.into(),
            data: tiers
                .iter()
                .map(|&(name, revenue, pay_rate)| {
                    (
                        name.to_string(),
                        TierMetrics {
                            revenue,
                            pay_rate,
                            arpu: 0.0,
                            arppu: 0.0,
                        },
                    )
                })
                .collect(),
        }
    }

    fn doc_with(current: &[(&str, f64, f64)], bench: &[(&str, f64, f64)]) -> InputDocument {
        let mut doc = sample_document();
        doc.r_tier_payment.tiers = current.iter().map(|t| t.0.to_string()).collect();
        doc.r_tier_payment.time_series = vec![snapshot("2025春节活动", current)];
        doc.r_tier_payment.benchmarks = vec![snapshot("对标", bench)];
        doc
    }

    #[test]
    fn sample_is_uniform_growth() {
        let result = RTierAnalyzer::new().analyze(&sample_document()).unwrap();
        assert_eq!(result.severity, Severity::Normal);
        assert_eq!(result.raw_metrics["positioning"], "全面提升型活动");
        assert_eq!(result.raw_metrics["tier_shares"]["超R"], 30.8);
        assert!(result.conclusion.starts_with("全面提升型活动。"));
    }

    #[test]
    fn dominant_top_tier_is_high_spender() {
        let doc = doc_with(
            &[("超R", 600.0, 1.0), ("大R", 300.0, 1.0), ("小R", 100.0, 1.0)],
            &[("超R", 500.0, 1.0), ("大R", 300.0, 1.0), ("小R", 100.0, 1.0)],
        );
        let result = RTierAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.raw_metrics["positioning"], "高R向活动");
    }

    #[test]
    fn lower_tier_pay_rate_gain_is_broad_reach() {
        let doc = doc_with(
            &[("超R", 300.0, 1.0), ("大R", 300.0, 1.0), ("小R", 300.0, 1.2)],
            &[("超R", 320.0, 1.0), ("大R", 300.0, 1.0), ("小R", 300.0, 1.0)],
        );
        let result = RTierAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.raw_metrics["positioning"], "普惠型活动");
    }

    #[test]
    fn crossing_adds_suggestion() {
        let doc = doc_with(
            &[("超R", 700.0, 1.0), ("大R", 600.0, 1.0), ("小R", 460.0, 1.0)],
            &[("超R", 820.0, 1.0), ("大R", 600.0, 1.0), ("小R", 400.0, 1.0)],
        );
        let result = RTierAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.severity, Severity::Watch);
        assert_eq!(result.raw_metrics["crossing"], true);
        assert_eq!(result.raw_metrics["positioning"], "结构性变化活动");
        assert!(result
            .suggestions
            .contains(&"高付费用户贡献减弱，建议优化高价值内容吸引力".to_string()));
    }

    #[test]
    fn steep_tier_drop_is_anomalous() {
        let doc = doc_with(
            &[("超R", 700.0, 1.0), ("小R", 200.0, 1.0)],
            &[("超R", 1000.0, 1.0), ("小R", 200.0, 1.0)],
        );
        let result = RTierAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.severity, Severity::Anomalous);
        assert_eq!(result.suggestions[0], "超R 营收vs主对标下降 30.0%，建议排查原因");
    }

    #[test]
    fn adjacent_run_used_without_benchmarks() {
        let mut doc = sample_document();
        doc.r_tier_payment.benchmarks.clear();
        let result = RTierAnalyzer::new().analyze(&doc).unwrap();
        let changes = &result.raw_metrics["all_bench_changes"];
        assert!(changes.get("2024圣诞活动").is_some());
    }

    #[test]
    fn first_run_compares_with_following() {
        let mut doc = sample_document();
        doc.r_tier_payment.benchmarks.clear();
        doc.meta.event_name = "2024元宵活动".into();
        let result = RTierAnalyzer::new().analyze(&doc).unwrap();
        assert!(result.raw_metrics["all_bench_changes"].get("2024五一活动").is_some());
    }

    #[test]
    fn missing_tier_reads_as_zero() {
        let doc = doc_with(
            &[("超R", 500.0, 1.0), ("小R", 500.0, 1.0)],
            &[("超R", 450.0, 1.0)],
        );
        let result = RTierAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.raw_metrics["tier_changes"]["小R"]["revenue"], 100.0);
    }

    #[test]
    fn lone_run_without_benchmark_is_insufficient() {
        let mut doc = sample_document();
        doc.r_tier_payment.benchmarks.clear();
        doc.r_tier_payment.time_series.truncate(1);
        assert!(RTierAnalyzer::new().analyze(&doc).is_err());
    }
}
