//! Funnel conversion: per-step rates, bottleneck, overall rate, and benchmark
//! gaps.

use serde::Serialize;
use tracing::debug;

use review_core::{AnalysisResult, FunnelStage, InputDocument, Module, Severity};
use review_rules::thresholds::ReachThresholds;

use crate::algorithms::stats::{percent_of, round_to};
use crate::analyzer::{AnalyzeError, Analyzer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRate {
    pub from: String,
    pub to: String,
    /// `users_to / users_from * 100`, one decimal.
    pub rate: f64,
    pub users_from: f64,
    pub users_to: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkFunnel {
    pub event: String,
    pub stages: Vec<FunnelStage>,
    pub conv_rates: Vec<f64>,
    /// Current minus benchmark, per shared step (pp).
    pub diffs: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct ReachChart<'a> {
    stages: &'a [FunnelStage],
    conv_rates: &'a [StepRate],
    comparisons: &'a [BenchmarkFunnel],
}

#[derive(Debug, Serialize)]
struct ReachMetrics<'a> {
    conv_rates: &'a [StepRate],
    overall_rate: f64,
    bottleneck: &'a StepRate,
}

/// Stage-to-stage conversion over `stages`, in order.
pub fn step_rates(stages: &[FunnelStage]) -> Vec<StepRate> {
    stages
        .windows(2)
        .map(|pair| StepRate {
            from: pair[0].stage.clone(),
            to: pair[1].stage.clone(),
            rate: percent_of(pair[1].users, pair[0].users, 1),
            users_from: pair[0].users,
            users_to: pair[1].users,
        })
        .collect()
}

/// `提升 2.0pp` / `下降 2.0pp` for a current-minus-benchmark difference.
fn diff_phrase(diff: f64) -> String {
    let direction = if diff > 0.0 { "提升" } else { "下降" };
    format!("{direction} {:.1}pp", diff.abs())
}

pub struct ReachAnalyzer {
    config: ReachThresholds,
}

impl ReachAnalyzer {
    pub fn new() -> Self {
        Self::with_config(&ReachThresholds::default())
    }

    pub fn with_config(config: &ReachThresholds) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn is_payment_stage(&self, stage: &str) -> bool {
        let lower = stage.to_lowercase();
        self.config
            .payment_stage_keywords
            .iter()
            .any(|k| lower.contains(&k.to_lowercase()))
    }

    fn min_rate_for(&self, stage: &str) -> f64 {
        if self.is_payment_stage(stage) {
            self.config.payment_stage_min_rate
        } else {
            self.config.stage_min_rate
        }
    }
}

impl Default for ReachAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for ReachAnalyzer {
    fn module(&self) -> Module {
        Module::Reach
    }

    fn analyze(&self, doc: &InputDocument) -> Result<AnalysisResult, AnalyzeError> {
        let stages = &doc.reach_conversion.stages;
        let rates = step_rates(stages);
        let bottleneck = rates
            .iter()
            .fold(None::<&StepRate>, |best, r| match best {
                Some(b) if b.rate <= r.rate => Some(b),
                _ => Some(r),
            })
            .ok_or_else(|| {
                AnalyzeError::InsufficientData("funnel needs at least 2 stages".into())
            })?;

        let (first, last) = (&stages[0], &stages[stages.len() - 1]);
        let overall_rate = percent_of(last.users, first.users, 2);

        let mut details = vec![
            format!(
                "漏斗瓶颈: {} → {}，转化率 {:.1}%",
                bottleneck.from, bottleneck.to, bottleneck.rate
            ),
            format!("整体转化率（{} → {}）: {}%", first.stage, last.stage, overall_rate),
        ];
        let mut suggestions = Vec::new();

        let comparisons: Vec<BenchmarkFunnel> = doc
            .reach_conversion
            .comparisons
            .iter()
            .filter(|c| c.stages.len() >= 2)
            .map(|c| {
                let conv_rates: Vec<f64> = step_rates(&c.stages).iter().map(|r| r.rate).collect();
                let diffs = rates
                    .iter()
                    .zip(&conv_rates)
                    .map(|(cur, bench)| round_to(cur.rate - bench, 1))
                    .collect();
                BenchmarkFunnel {
                    event: c.benchmark_event.clone(),
                    stages: c.stages.clone(),
                    conv_rates,
                    diffs,
                }
            })
            .collect();

        for bench in &comparisons {
            for ((step, rate), diff) in rates.iter().zip(&bench.conv_rates).zip(&bench.diffs) {
                details.push(format!(
                    "{}→{}: 当期 {:.1}% vs {} {:.1}%（{}）",
                    step.from,
                    step.to,
                    step.rate,
                    bench.event,
                    rate,
                    diff_phrase(*diff)
                ));
            }
        }

        let mut severity = Severity::Normal;
        for step in &rates {
            let floor = self.min_rate_for(&step.to);
            if step.rate < floor {
                debug!(
                    from = %step.from,
                    to = %step.to,
                    rate = step.rate,
                    floor,
                    "funnel step below floor"
                );
                severity = severity.max(Severity::Anomalous);
                suggestions.push(format!(
                    "{}→{} 转化率仅 {:.1}%，建议检查该环节用户流失原因",
                    step.from, step.to, step.rate
                ));
            }
        }

        if let Some(primary) = comparisons.first() {
            for (step, bench_rate) in rates.iter().zip(&primary.conv_rates) {
                let gap = bench_rate - step.rate;
                if gap > self.config.benchmark_gap_pp {
                    severity = Severity::Critical;
                    suggestions.push(format!(
                        "{}→{} 相比主对标下降 {:.1}pp，需重点排查",
                        step.from, step.to, gap
                    ));
                }
            }
        }

        let conclusion = if severity == Severity::Normal {
            "触达通路正常，各环节转化率在合理范围内".to_string()
        } else {
            format!(
                "触达存在问题，{}→{} 环节存在显著流失",
                bottleneck.from, bottleneck.to
            )
        };

        let chart = serde_json::to_value(ReachChart {
            stages,
            conv_rates: &rates,
            comparisons: &comparisons,
        })?;
        let raw = serde_json::to_value(ReachMetrics {
            conv_rates: &rates,
            overall_rate,
            bottleneck,
        })?;

        Ok(AnalysisResult::new(Module::Reach, conclusion, severity)
            .with_details(details)
            .with_suggestions(suggestions)
            .with_chart_data(chart)
            .with_raw_metrics(raw))
    }
}
