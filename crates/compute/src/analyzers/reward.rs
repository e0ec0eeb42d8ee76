//! Reward economy check: actual output against the designed expectation.

use serde::Serialize;

use review_core::{AnalysisResult, InputDocument, Module, RewardItem, Severity};
use review_rules::thresholds::RewardThresholds;

use crate::algorithms::stats::change_rate;
use crate::analyzer::{AnalyzeError, Analyzer};
use crate::format::format_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviationLevel {
    #[serde(rename = "符合预期")]
    AsExpected,
    #[serde(rename = "轻微偏差")]
    Minor,
    #[serde(rename = "显著偏差")]
    Significant,
}

impl DeviationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            DeviationLevel::AsExpected => "符合预期",
            DeviationLevel::Minor => "轻微偏差",
            DeviationLevel::Significant => "显著偏差",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RewardDeviation {
    pub name: String,
    pub expected: f64,
    pub actual: f64,
    pub unit: String,
    pub deviation: f64,
    pub level: DeviationLevel,
    pub cost_deviation: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct LevelCounts {
    pub as_expected: usize,
    pub minor: usize,
    pub significant: usize,
}

#[derive(Debug, Serialize)]
struct RewardChart<'a> {
    items: &'a [RewardItem],
    item_results: &'a [RewardDeviation],
}

#[derive(Debug, Serialize)]
struct RewardMetrics<'a> {
    item_results: &'a [RewardDeviation],
    counts: LevelCounts,
}

pub struct RewardAnalyzer {
    config: RewardThresholds,
}

impl RewardAnalyzer {
    pub fn new() -> Self {
        Self::with_config(&RewardThresholds::default())
    }

    pub fn with_config(config: &RewardThresholds) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Band a deviation by its magnitude. Every value lands in exactly one band.
    pub fn classify(&self, deviation: f64) -> DeviationLevel {
        let magnitude = deviation.abs();
        if magnitude <= self.config.as_expected {
            DeviationLevel::AsExpected
        } else if magnitude <= self.config.minor {
            DeviationLevel::Minor
        } else {
            DeviationLevel::Significant
        }
    }

    fn evaluate(&self, item: &RewardItem) -> RewardDeviation {
        let deviation = change_rate(item.actual_value, item.expected_value);
        let cost_deviation = match (item.expected_cost, item.actual_cost) {
            (Some(expected), Some(actual)) if expected > 0.0 => Some(change_rate(actual, expected)),
            _ => None,
        };
        RewardDeviation {
            name: item.reward_name.clone(),
            expected: item.expected_value,
            actual: item.actual_value,
            unit: item.unit.clone(),
            deviation,
            level: self.classify(deviation),
            cost_deviation,
        }
    }
}

impl Default for RewardAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn detail_line(r: &RewardDeviation) -> String {
    let mut line = format!(
        "{}: 预期 {}{} / 实际 {}{}（偏差 {:+.1}%，{}）",
        r.name,
        format_number(r.expected, false),
        r.unit,
        format_number(r.actual, false),
        r.unit,
        r.deviation,
        r.level.label()
    );
    if let Some(cost) = r.cost_deviation {
        line.push_str(&format!("，成本偏差 {cost:+.1}%"));
    }
    line
}

impl Analyzer for RewardAnalyzer {
    fn module(&self) -> Module {
        Module::Reward
    }

    fn analyze(&self, doc: &InputDocument) -> Result<AnalysisResult, AnalyzeError> {
        let items = &doc.core_reward.items;
        if items.is_empty() {
            return Err(AnalyzeError::InsufficientData("no core reward items".into()));
        }

        let results: Vec<RewardDeviation> = items.iter().map(|i| self.evaluate(i)).collect();
        let mut counts = LevelCounts::default();
        let mut significant = Vec::new();
        let mut minor = Vec::new();
        let mut suggestions = Vec::new();
        for r in &results {
            match r.level {
                DeviationLevel::AsExpected => counts.as_expected += 1,
                DeviationLevel::Minor => {
                    counts.minor += 1;
                    minor.push(detail_line(r));
                }
                DeviationLevel::Significant => {
                    counts.significant += 1;
                    significant.push(detail_line(r));
                    let direction = if r.deviation > 0.0 { "高于" } else { "低于" };
                    suggestions.push(format!(
                        "{} 实际产出{}预期 {:.1}%，建议排查概率/数值配置",
                        r.name,
                        direction,
                        r.deviation.abs()
                    ));
                }
            }
        }

        // significant items in full, minor items capped, in-band items only counted
        let cap = self.config.minor_detail_cap;
        let mut details = significant;
        let hidden_minor = minor.len().saturating_sub(cap);
        details.extend(minor.into_iter().take(cap));
        if hidden_minor > 0 {
            details.push(format!("...及其余 {hidden_minor} 项轻微偏差（略）"));
        }
        if counts.as_expected > 0 {
            details.push(format!(
                "另有 {} 项奖励符合预期（偏差 ≤{}%），此处省略",
                counts.as_expected, self.config.as_expected
            ));
        }

        let (severity, conclusion) = if counts.significant > 0 {
            (
                Severity::Anomalous,
                format!("数值设计存在 {} 项显著偏差，需排查", counts.significant),
            )
        } else if counts.minor * 2 > items.len() {
            (Severity::Watch, "数值设计整体偏差较多，建议复查".to_string())
        } else {
            (Severity::Normal, "数值设计整体符合预期".to_string())
        };

        let chart = serde_json::to_value(RewardChart {
            items,
            item_results: &results,
        })?;
        let raw = serde_json::to_value(RewardMetrics {
            item_results: &results,
            counts,
        })?;

        Ok(AnalysisResult::new(Module::Reward, conclusion, severity)
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

    fn item(name: &str, expected: f64, actual: f64) -> RewardItem {
        RewardItem {
            reward_name: name.into(),
            expected_value: expected,
            actual_value: actual,
            unit: "个".into(),
            expected_cost: None,
            actual_cost: None,
            cost_unit: None,
        }
    }

    fn doc_with(items: Vec<RewardItem>) -> InputDocument {
        let mut doc = sample_document();
        doc.core_reward.items = items;
        doc
    }

    #[test]
    fn sample_rewards_are_as_designed() {
        let result = RewardAnalyzer::new().analyze(&sample_document()).unwrap();
        assert_eq!(result.severity, Severity::Normal);
        assert_eq!(result.raw_metrics["counts"]["minor"], 1);
        assert!(result.details[0].starts_with("金币: 预期 2,000,000枚"));
        assert_eq!(result.details.last().unwrap(), "另有 4 项奖励符合预期（偏差 ≤10%），此处省略");
        let diamond = &result.raw_metrics["item_results"][1];
        assert_eq!(diamond["cost_deviation"], 4.0);
    }

    #[test]
    fn ten_items_with_one_significant() {
        let mut items: Vec<RewardItem> =
            (0..6).map(|i| item(&format!("正常{i}"), 100.0, 105.0)).collect();
        items.push(item("轻微A", 100.0, 115.0));
        items.push(item("轻微B", 100.0, 80.0));
        items.push(item("轻微C", 100.0, 125.0));
        items.push(item("超发", 100.0, 145.0));
        let result = RewardAnalyzer::new().analyze(&doc_with(items)).unwrap();

        assert_eq!(result.severity, Severity::Anomalous);
        assert_eq!(result.details.len(), 5);
        assert!(result.details[0].starts_with("超发"));
        assert!(result.details[1].starts_with("轻微A"));
        assert_eq!(result.details[4], "另有 6 项奖励符合预期（偏差 ≤10%），此处省略");
        assert_eq!(result.suggestions, vec!["超发 实际产出高于预期 45.0%，建议排查概率/数值配置"]);
    }

    #[test]
    fn minor_details_are_capped() {
        let items: Vec<RewardItem> =
            (0..13).map(|i| item(&format!("道具{i}"), 100.0, 120.0)).collect();
        let result = RewardAnalyzer::new().analyze(&doc_with(items)).unwrap();
        assert_eq!(result.severity, Severity::Watch);
        assert_eq!(result.details.len(), 11);
        assert_eq!(result.details[10], "...及其余 3 项轻微偏差（略）");
    }

    #[test]
    fn classification_is_exhaustive_and_exclusive() {
        let analyzer = RewardAnalyzer::new();
        for tenth in -600..=600 {
            let dev = tenth as f64 / 10.0;
            let level = analyzer.classify(dev);
            let expected = if dev.abs() <= 10.0 {
                DeviationLevel::AsExpected
            } else if dev.abs() <= 30.0 {
                DeviationLevel::Minor
            } else {
                DeviationLevel::Significant
            };
            assert_eq!(level, expected, "deviation {dev}");
        }
        assert_eq!(analyzer.classify(10.0), DeviationLevel::AsExpected);
        assert_eq!(analyzer.classify(-30.0), DeviationLevel::Minor);
        assert_eq!(analyzer.classify(30.01), DeviationLevel::Significant);
    }

    #[test]
    fn zero_expectation_is_significant() {
        let result = RewardAnalyzer::new()
            .analyze(&doc_with(vec![item("新增", 0.0, 10.0), item("稳定", 50.0, 50.0)]))
            .unwrap();
        assert_eq!(result.severity, Severity::Anomalous);
        assert_eq!(result.raw_metrics["item_results"][0]["deviation"], 100.0);
    }

    #[test]
    fn empty_items_are_insufficient() {
        assert!(RewardAnalyzer::new().analyze(&doc_with(Vec::new())).is_err());
    }
}
