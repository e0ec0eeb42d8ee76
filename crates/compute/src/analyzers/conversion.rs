//! Payment conversion by price bucket.
//!
//! Player bases shrink over a product's lifetime, so buckets are compared by
//! their share of all payers rather than by head count. A structural shift
//! shows up as share moving between buckets; a base-size decline does not.

use serde::Serialize;
use tracing::debug;

use review_core::{AnalysisResult, InputDocument, Module, PriceTier, Severity};
use review_rules::thresholds::ConversionThresholds;

use crate::algorithms::segment::{merge_sorted, PriceSegmenter, SegmentMethod, Segmentation};
use crate::algorithms::stats::{percent_of, round_to};
use crate::analyzer::{AnalyzeError, Analyzer};
use crate::format::format_pp;

#[derive(Debug, Clone, Serialize)]
pub struct BucketComparison {
    pub event: String,
    pub payers: f64,
    pub payer_share: f64,
    /// Current share minus this comparison's share (pp).
    pub share_shift: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketStat {
    pub label: String,
    pub low: f64,
    pub high: f64,
    pub payers: f64,
    pub purchases: f64,
    pub revenue: f64,
    pub revenue_share: f64,
    pub payer_share: f64,
    pub comparisons: Vec<BucketComparison>,
}

impl BucketStat {
    /// Shift against the primary comparison, if any.
    fn primary_shift(&self) -> Option<f64> {
        self.comparisons.first().map(|c| c.share_shift)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DecayStep {
    pub from: String,
    pub to: String,
    /// `payers[i] / payers[i-1] * 100`, one decimal.
    pub ratio: f64,
    pub primary_ratio: Option<f64>,
    pub accelerated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonTiers {
    pub event: String,
    pub sorted_tiers: Vec<PriceTier>,
    pub total_payers: f64,
}

#[derive(Debug, Serialize)]
struct ConversionChart<'a> {
    sorted_tiers: &'a [PriceTier],
    method: SegmentMethod,
    buckets: &'a [BucketStat],
    comparisons: &'a [ComparisonTiers],
    decay: &'a [DecayStep],
    total_payers_current: f64,
}

#[derive(Debug, Serialize)]
struct ConversionMetrics<'a> {
    segmentation: &'a Segmentation,
    buckets: &'a [BucketStat],
    decay: &'a [DecayStep],
    total_revenue: f64,
    structural_downgrade: bool,
    decay_accelerated: bool,
}

fn sum_payers(tiers: &[PriceTier]) -> f64 {
    tiers.iter().map(|t| t.payers).sum()
}

/// Payers of `tiers` per bucket of `seg`, by price.
fn payers_per_bucket(seg: &Segmentation, tiers: &[PriceTier]) -> Vec<f64> {
    let mut payers = vec![0.0; seg.buckets.len()];
    for t in tiers {
        payers[seg.bucket_for(t.price)] += t.payers;
    }
    payers
}

pub struct ConversionAnalyzer {
    config: ConversionThresholds,
    segmenter: PriceSegmenter,
}

impl ConversionAnalyzer {
    pub fn new() -> Self {
        Self::with_config(&ConversionThresholds::default())
    }

    pub fn with_config(config: &ConversionThresholds) -> Self {
        Self {
            config: config.clone(),
            segmenter: PriceSegmenter::with_config(config),
        }
    }
}

impl Default for ConversionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for ConversionAnalyzer {
    fn module(&self) -> Module {
        Module::Conversion
    }

    fn analyze(&self, doc: &InputDocument) -> Result<AnalysisResult, AnalyzeError> {
        let pc = &doc.payment_conversion;
        let tiers = merge_sorted(&pc.current.price_tiers);
        if tiers.len() < 3 {
            return Err(AnalyzeError::InsufficientData(format!(
                "need at least 3 distinct price points, got {}",
                tiers.len()
            )));
        }

        let comparisons: Vec<ComparisonTiers> = pc
            .comparisons
            .iter()
            .filter(|c| !c.price_tiers.is_empty())
            .map(|c| {
                let sorted = merge_sorted(&c.price_tiers);
                ComparisonTiers {
                    event: c.event.clone(),
                    total_payers: sum_payers(&sorted),
                    sorted_tiers: sorted,
                }
            })
            .collect();

        let seg = self.segmenter.segment(&tiers);
        let total_payers = sum_payers(&tiers);
        let total_revenue: f64 = tiers.iter().map(|t| t.price * t.purchases).sum();
        let comp_payers: Vec<Vec<f64>> = comparisons
            .iter()
            .map(|c| payers_per_bucket(&seg, &c.sorted_tiers))
            .collect();

        let buckets: Vec<BucketStat> = seg
            .buckets
            .iter()
            .enumerate()
            .map(|(b, bucket)| {
                let slice = &tiers[bucket.start..bucket.end];
                let payers = sum_payers(slice);
                let revenue: f64 = slice.iter().map(|t| t.price * t.purchases).sum();
                let payer_share = percent_of(payers, total_payers, 2);
                BucketStat {
                    label: bucket.label.clone(),
                    low: bucket.low,
                    high: bucket.high,
                    payers,
                    purchases: slice.iter().map(|t| t.purchases).sum(),
                    revenue,
                    revenue_share: percent_of(revenue, total_revenue, 1),
                    payer_share,
                    comparisons: comparisons
                        .iter()
                        .zip(&comp_payers)
                        .map(|(c, per_bucket)| {
                            let share = percent_of(per_bucket[b], c.total_payers, 2);
                            BucketComparison {
                                event: c.event.clone(),
                                payers: per_bucket[b],
                                payer_share: share,
                                share_shift: round_to(payer_share - share, 2),
                            }
                        })
                        .collect(),
                }
            })
            .collect();

        let mut details = vec![format!(
            "自动划分为 {} 个价位区间（{}）",
            buckets.len(),
            seg.method.label()
        )];
        for stat in &buckets {
            let mut line = format!("  {}: 当期 {:.1}%", stat.label, stat.payer_share);
            for c in &stat.comparisons {
                line.push_str(&format!(
                    " | vs {} {:.1}%（{}）",
                    c.event,
                    c.payer_share,
                    format_pp(c.share_shift)
                ));
            }
            line.push_str(&format!(", 营收占比 {}%", stat.revenue_share));
            details.push(line);
        }

        let primary_payers = comp_payers.first();
        let decay: Vec<DecayStep> = buckets
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let ratio = (pair[0].payers > 0.0).then(|| pair[1].payers / pair[0].payers);
                let primary = primary_payers
                    .filter(|p| p[i] > 0.0)
                    .map(|p| p[i + 1] / p[i]);
                let accelerated = match (ratio, primary) {
                    (Some(cur), Some(base)) => cur < base * self.config.decay_worse_factor,
                    _ => false,
                };
                DecayStep {
                    from: pair[0].label.clone(),
                    to: pair[1].label.clone(),
                    ratio: round_to(ratio.unwrap_or(0.0) * 100.0, 1),
                    primary_ratio: primary.map(|r| round_to(r * 100.0, 1)),
                    accelerated,
                }
            })
            .collect();

        if !decay.is_empty() {
            details.push("转化衰减比例（高价位 / 低价位人数比）:".to_string());
        }
        for step in &decay {
            let mut line = format!("  {} → {}: 当期衰减率 {}%", step.from, step.to, step.ratio);
            if let Some(base) = step.primary_ratio {
                let diff = round_to(step.ratio - base, 1);
                let direction = if diff > 0.0 { "改善" } else { "恶化" };
                line.push_str(&format!(" vs 主对标 {base}%（{direction} {:.1}pp）", diff.abs()));
            }
            details.push(line);
        }

        let mut severity = Severity::Normal;
        let mut suggestions = Vec::new();

        for stat in &buckets {
            let watch = self.config.share_shift_watch;
            if let Some(shift) = stat.primary_shift().filter(|s| s.abs() > watch) {
                let direction = if shift > 0.0 { "上升" } else { "下降" };
                details.push(format!(
                    "结构性变化: {} 占比 {direction} {:.1}pp",
                    stat.label,
                    shift.abs()
                ));
                severity = severity.max(Severity::Watch);
            }
        }

        // the cheapest bucket is the low end, every bucket above it the high end
        let pp = self.config.structural_shift_pp;
        let (low, high) = buckets.split_at(1);
        let low_gain = low
            .iter()
            .any(|s| s.primary_shift().is_some_and(|v| v > pp));
        let high_loss = high
            .iter()
            .any(|s| s.primary_shift().is_some_and(|v| v < -pp));
        let downgrade = low_gain && high_loss;
        if downgrade {
            severity = severity.max(Severity::Anomalous);
            suggestions.push("付费结构向低价位集中，高价位占比下降，建议增强中高价位商品吸引力".to_string());
        } else if high_loss {
            severity = severity.max(Severity::Watch);
            suggestions.push("高价位占比下降，整体付费深度可能不足".to_string());
        }

        let worsened = decay.iter().filter(|d| d.accelerated).count();
        let accelerated = !decay.is_empty() && worsened * 2 > decay.len();
        if accelerated {
            debug!(worsened, transitions = decay.len(), "decay accelerated");
            severity = severity.max(Severity::Watch).escalate();
            suggestions.push("多个价位段转化衰减加速，建议全面检查商品定价与内容吸引力".to_string());
        }

        let conclusion = match (severity, downgrade, accelerated) {
            (Severity::Normal, _, _) => "付费转化比例分布稳定，各价位段结构合理",
            (Severity::Watch, _, _) => "付费转化结构有偏移，部分价位段占比变化需关注",
            (_, true, true) => "付费结构向低价位迁移且转化衰减加速，需立即排查",
            (_, true, false) => "付费结构向低价位迁移，中高价位段占比流失",
            _ => "付费转化衰减加速，多价位段结构性恶化",
        };

        let chart = serde_json::to_value(ConversionChart {
            sorted_tiers: &tiers,
            method: seg.method,
            buckets: &buckets,
            comparisons: &comparisons,
            decay: &decay,
            total_payers_current: total_payers,
        })?;
        let raw = serde_json::to_value(ConversionMetrics {
            segmentation: &seg,
            buckets: &buckets,
            decay: &decay,
            total_revenue,
            structural_downgrade: downgrade,
            decay_accelerated: accelerated,
        })?;

        Ok(AnalysisResult::new(Module::Conversion, conclusion, severity)
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
    use review_core::PriceTierComparison;

    fn tiers(spec: &[(f64, f64)]) -> Vec<PriceTier> {
        spec.iter()
            .map(|&(price, payers)| PriceTier {
                price,
                purchases: payers,
                payers,
            })
            .collect()
    }

    fn with_comparison(payers: [f64; 6]) -> InputDocument {
        let prices = [6.0, 30.0, 68.0, 128.0, 328.0, 648.0];
        let mut doc = sample_document();
        doc.payment_conversion.comparisons = vec![PriceTierComparison {
            event: "对标".into(),
            price_tiers: tiers(&prices.iter().copied().zip(payers).collect::<Vec<_>>()),
        }];
        doc
    }

    #[test]
    fn sample_is_stable() {
        let result = ConversionAnalyzer::new().analyze(&sample_document()).unwrap();
        assert_eq!(result.severity, Severity::Normal);
        assert_eq!(result.chart_data["method"], "cliff");
        let shares: Vec<f64> = result.chart_data["buckets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["payer_share"].as_f64().unwrap())
            .collect();
        assert_eq!(shares, vec![79.22, 17.53, 3.25]);
        assert_eq!(result.raw_metrics["decay_accelerated"], false);
    }

    #[test]
    fn high_price_share_loss_is_watch() {
        let doc = with_comparison([3000.0, 2700.0, 2000.0, 1000.0, 600.0, 700.0]);
        let result = ConversionAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.severity, Severity::Watch);
        assert_eq!(result.suggestions, vec!["高价位占比下降，整体付费深度可能不足"]);
    }

    #[test]
    fn middle_bucket_losing_to_low_bucket_is_downgrade() {
        let doc = with_comparison([4000.0, 4000.0, 3242.0, 2000.0, 1658.0, 500.0]);
        let result = ConversionAnalyzer::new().analyze(&doc).unwrap();
        let shifts: Vec<f64> = result.chart_data["buckets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["comparisons"][0]["share_shift"].as_f64().unwrap())
            .collect();
        assert_eq!(shifts, vec![6.22, -6.22, 0.0]);
        assert_eq!(result.raw_metrics["structural_downgrade"], true);
        assert_eq!(result.raw_metrics["decay_accelerated"], false);
        assert_eq!(result.severity, Severity::Anomalous);
        assert_eq!(
            result.suggestions,
            vec!["付费结构向低价位集中，高价位占比下降，建议增强中高价位商品吸引力"]
        );
        assert_eq!(result.conclusion, "付费结构向低价位迁移，中高价位段占比流失");
    }

    #[test]
    fn accelerated_decay_is_anomalous() {
        let mut doc = sample_document();
        let prices = [6.0, 68.0, 328.0, 648.0];
        doc.payment_conversion.current.price_tiers =
            tiers(&prices.iter().copied().zip([9000.0, 600.0, 300.0, 100.0]).collect::<Vec<_>>());
        doc.payment_conversion.comparisons = vec![PriceTierComparison {
            event: "对标".into(),
            price_tiers: tiers(
                &prices.iter().copied().zip([8400.0, 800.0, 550.0, 250.0]).collect::<Vec<_>>(),
            ),
        }];
        let result = ConversionAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.chart_data["buckets"].as_array().unwrap().len(), 4);
        assert_eq!(result.raw_metrics["decay_accelerated"], true);
        assert_eq!(result.raw_metrics["structural_downgrade"], false);
        assert_eq!(result.severity, Severity::Anomalous);
    }

    #[test]
    fn downgrade_with_accelerated_decay_is_critical() {
        let doc = with_comparison([4000.0, 3000.0, 2500.0, 2000.0, 1800.0, 1200.0]);
        let result = ConversionAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.raw_metrics["structural_downgrade"], true);
        assert_eq!(result.severity, Severity::Critical);
        assert!(result.details.iter().any(|d| d.starts_with("结构性变化:")));
    }

    #[test]
    fn secondary_comparison_is_informational() {
        let mut doc = sample_document();
        doc.payment_conversion.comparisons.push(PriceTierComparison {
            event: "2023春节活动".into(),
            price_tiers: tiers(&[(6.0, 1000.0), (128.0, 3000.0), (648.0, 3000.0)]),
        });
        let result = ConversionAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.severity, Severity::Normal);
        assert!(result.details[1].contains("vs 2023春节活动"));
    }

    #[test]
    fn comparison_prices_outside_current_set_are_assigned() {
        let mut doc = sample_document();
        doc.payment_conversion.comparisons = vec![PriceTierComparison {
            event: "旧价位".into(),
            price_tiers: tiers(&[(1.0, 100.0), (98.0, 100.0), (198.0, 100.0), (1000.0, 100.0)]),
        }];
        let result = ConversionAnalyzer::new().analyze(&doc).unwrap();
        let comp_payers: Vec<f64> = result.chart_data["buckets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["comparisons"][0]["payers"].as_f64().unwrap())
            .collect();
        assert_eq!(comp_payers, vec![200.0, 100.0, 100.0]);
    }

    #[test]
    fn duplicate_prices_merge_before_the_minimum_check() {
        let mut doc = sample_document();
        doc.payment_conversion.current.price_tiers =
            tiers(&[(6.0, 100.0), (6.0, 50.0), (30.0, 20.0)]);
        assert!(matches!(
            ConversionAnalyzer::new().analyze(&doc),
            Err(AnalyzeError::InsufficientData(_))
        ));
    }
}
