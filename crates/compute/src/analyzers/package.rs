//! Gift package health: revenue concentration, price-role checks and dead
//! weight detection. Packages are matched across periods by price, since
//! names get reworded between runs while the price point stays.

use serde::Serialize;

use review_core::{AnalysisResult, GiftPackage, InputDocument, Module, PackageComparison, Severity};
use review_rules::thresholds::PackageThresholds;

use crate::algorithms::stats::{change_rate, percent_of, round_to};
use crate::analyzer::{AnalyzeError, Analyzer};
use crate::format::{format_change, format_number};

#[derive(Debug, Clone, Serialize)]
pub struct PackageChange {
    pub event: String,
    pub rev_change: f64,
    pub payer_change: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageStat {
    pub name: String,
    pub price: f64,
    pub revenue: f64,
    pub payers: f64,
    pub avg_spend: f64,
    pub revenue_share: f64,
    pub payer_share: f64,
    pub purchases_per_payer: f64,
    pub bench_changes: Vec<PackageChange>,
}

#[derive(Debug, Serialize)]
struct PackageChart<'a> {
    packages: &'a [GiftPackage],
    pkg_stats: &'a [PackageStat],
    comparisons: &'a [PackageComparison],
    total_revenue: f64,
}

#[derive(Debug, Serialize)]
struct PackageMetrics<'a> {
    pkg_stats: &'a [PackageStat],
    total_revenue: f64,
    total_payers: f64,
    low_price_payer_share: Option<f64>,
    high_price_revenue_share: Option<f64>,
    dead_weight: Vec<&'a str>,
}

pub struct PackageAnalyzer {
    config: PackageThresholds,
}

impl PackageAnalyzer {
    pub fn new() -> Self {
        Self::with_config(&PackageThresholds::default())
    }

    pub fn with_config(config: &PackageThresholds) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Default for PackageAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for PackageAnalyzer {
    fn module(&self) -> Module {
        Module::Package
    }

    fn analyze(&self, doc: &InputDocument) -> Result<AnalysisResult, AnalyzeError> {
        let gp = &doc.gift_packages;
        if gp.packages.is_empty() {
            return Err(AnalyzeError::InsufficientData("no gift packages".into()));
        }

        let total_revenue: f64 = gp.packages.iter().map(|p| p.revenue).sum();
        let total_payers: f64 = gp.packages.iter().map(|p| p.payers).sum();

        let mut stats: Vec<PackageStat> = gp
            .packages
            .iter()
            .map(|p| PackageStat {
                name: p.package_name.clone(),
                price: p.price,
                revenue: p.revenue,
                payers: p.payers,
                avg_spend: if p.payers > 0.0 { round_to(p.revenue / p.payers, 1) } else { 0.0 },
                revenue_share: percent_of(p.revenue, total_revenue, 1),
                payer_share: percent_of(p.payers, total_payers, 1),
                purchases_per_payer: if p.price > 0.0 && p.payers > 0.0 {
                    round_to(p.revenue / (p.price * p.payers), 1)
                } else {
                    0.0
                },
                bench_changes: Vec::new(),
            })
            .collect();
        stats.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

        let mut details = vec![
            format!("礼包总营收: {}", format_number(total_revenue, true)),
            "Top 3 礼包:".to_string(),
        ];
        for (rank, p) in stats.iter().take(3).enumerate() {
            details.push(format!(
                "  {}. {}（{}元）- 营收 {}（占比 {}%）- {}人购买",
                rank + 1,
                p.name,
                format_number(p.price, false),
                format_number(p.revenue, true),
                p.revenue_share,
                format_number(p.payers, false)
            ));
        }

        for comp in &gp.comparisons {
            for stat in &mut stats {
                let Some(matched) = comp.packages.iter().find(|c| c.price == stat.price) else {
                    continue;
                };
                let change = PackageChange {
                    event: comp.event.clone(),
                    rev_change: change_rate(stat.revenue, matched.revenue),
                    payer_change: change_rate(stat.payers, matched.payers),
                };
                details.push(format!(
                    "  {} vs {}: 营收 {}, 人数 {}",
                    stat.name,
                    comp.event,
                    format_change(change.rev_change),
                    format_change(change.payer_change)
                ));
                stat.bench_changes.push(change);
            }
        }

        let cfg = &self.config;
        let mut severity = Severity::Normal;
        let mut suggestions = Vec::new();

        let low: Vec<&PackageStat> =
            stats.iter().filter(|p| p.price <= cfg.low_price_max).collect();
        let low_payer_share = (!low.is_empty()).then(|| {
            let payers: f64 = low.iter().map(|p| p.payers).sum();
            percent_of(payers, total_payers, 1)
        });
        if let Some(share) = low_payer_share {
            if share > cfg.low_price_payer_share {
                details.push(format!("低价礼包(≤{}元) 人数占比 {share:.1}%，引流功能正常", cfg.low_price_max));
            } else {
                details.push(format!("低价礼包(≤{}元) 人数占比仅 {share:.1}%，引流效果偏弱", cfg.low_price_max));
                suggestions.push("建议优化低价礼包内容或增加曝光，提升引流效果".to_string());
            }
        }

        let high: Vec<&PackageStat> =
            stats.iter().filter(|p| p.price >= cfg.high_price_min).collect();
        let high_revenue_share = (!high.is_empty()).then(|| {
            let revenue: f64 = high.iter().map(|p| p.revenue).sum();
            percent_of(revenue, total_revenue, 1)
        });
        if let Some(share) = high_revenue_share {
            if share > cfg.high_price_revenue_share {
                details.push(format!("高价礼包(≥{}元) 营收占比 {share:.1}%，承担营收主力", cfg.high_price_min));
            } else {
                details.push(format!("高价礼包(≥{}元) 营收占比仅 {share:.1}%", cfg.high_price_min));
                suggestions.push("高价礼包营收贡献偏低，建议优化内容价值感或定价策略".to_string());
            }
        }

        let dead_weight: Vec<&str> = stats
            .iter()
            .filter(|p| {
                p.revenue_share < cfg.dead_weight_share
                    && p.payers < total_payers * cfg.dead_weight_share / 100.0
            })
            .map(|p| p.name.as_str())
            .collect();
        if !dead_weight.is_empty() {
            let names = dead_weight.join(", ");
            details.push(format!("鸡肋礼包（人数少+营收低）: {names}"));
            suggestions.push(format!("建议移除或重新设计以下礼包: {names}"));
            severity = Severity::Watch;
        }

        let conclusion = match suggestions.len() {
            0 => "礼包设计合理，高低价格梯度覆盖良好",
            1 => "礼包设计基本合理，有小幅优化空间",
            _ => {
                severity = Severity::Watch;
                "礼包设计存在多处可优化点"
            }
        };

        let chart = serde_json::to_value(PackageChart {
            packages: &gp.packages,
            pkg_stats: &stats,
            comparisons: &gp.comparisons,
            total_revenue,
        })?;
        let raw = serde_json::to_value(PackageMetrics {
            pkg_stats: &stats,
            total_revenue,
            total_payers,
            low_price_payer_share: low_payer_share,
            high_price_revenue_share: high_revenue_share,
            dead_weight,
        })?;

        Ok(AnalysisResult::new(Module::Package, conclusion, severity)
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

    fn pkg(name: &str, price: f64, revenue: f64, payers: f64) -> GiftPackage {
        GiftPackage {
            package_name: name.into(),
            price,
            revenue,
            payers,
        }
    }

    fn doc_with(packages: Vec<GiftPackage>) -> InputDocument {
        let mut doc = sample_document();
        doc.gift_packages.packages = packages;
        doc.gift_packages.comparisons.clear();
        doc
    }

    #[test]
    fn two_package_ladder_is_healthy() {
        let doc = doc_with(vec![pkg("小额", 10.0, 100.0, 50.0), pkg("大额", 500.0, 150.0, 2.0)]);
        let result = PackageAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.severity, Severity::Normal);
        assert!(result.suggestions.is_empty());
        assert_eq!(result.raw_metrics["low_price_payer_share"], 96.2);
        assert_eq!(result.raw_metrics["high_price_revenue_share"], 60.0);
    }

    #[test]
    fn sample_packages_are_healthy() {
        let result = PackageAnalyzer::new().analyze(&sample_document()).unwrap();
        assert_eq!(result.severity, Severity::Normal);
        assert_eq!(result.conclusion, "礼包设计合理，高低价格梯度覆盖良好");
        assert!(result.details[2].starts_with("  1. 豪华礼包（328元）- 营收 ¥98,400"));
    }

    #[test]
    fn comparisons_match_by_price_not_name() {
        let result = PackageAnalyzer::new().analyze(&sample_document()).unwrap();
        assert!(result
            .details
            .iter()
            .any(|d| d.starts_with("  新春特惠礼包 vs 2024春节活动:")));
        let first = &result.raw_metrics["pkg_stats"][0];
        assert_eq!(first["bench_changes"][0]["rev_change"], 7.14);
    }

    #[test]
    fn dead_weight_package_is_flagged() {
        let doc = doc_with(vec![
            pkg("引流", 6.0, 6000.0, 1000.0),
            pkg("主力", 328.0, 32800.0, 100.0),
            pkg("冷门", 98.0, 980.0, 10.0),
        ]);
        let result = PackageAnalyzer::new().analyze(&doc).unwrap();
        assert_eq!(result.severity, Severity::Watch);
        assert_eq!(result.raw_metrics["dead_weight"][0], "冷门");
        assert_eq!(result.suggestions, vec!["建议移除或重新设计以下礼包: 冷门"]);
    }

    #[test]
    fn several_weak_roles_are_watch() {
        let doc = doc_with(vec![
            pkg("低价", 6.0, 600.0, 100.0),
            pkg("中价", 98.0, 98000.0, 1000.0),
            pkg("高价", 648.0, 6480.0, 10.0),
        ]);
        let result = PackageAnalyzer::new().analyze(&doc).unwrap();
        assert!(result.suggestions.len() > 1);
        assert_eq!(result.severity, Severity::Watch);
        assert_eq!(result.conclusion, "礼包设计存在多处可优化点");
    }

    #[test]
    fn no_packages_is_insufficient() {
        assert!(PackageAnalyzer::new().analyze(&doc_with(Vec::new())).is_err());
    }
}
