use serde::Serialize;

use review_core::{AnalysisResult, Severity};

/// Number of findings surfaced at the top of the report.
const KEY_FINDINGS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct SeverityCount {
    pub severity: Severity,
    pub count: usize,
}

/// Overall verdict plus the most severe findings.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutiveSummary {
    pub overall: String,
    pub worst: Severity,
    pub key_findings: Vec<String>,
    /// Non-zero counts only, worst first.
    pub severity_counts: Vec<SeverityCount>,
}

impl ExecutiveSummary {
    pub fn from_results(results: &[AnalysisResult]) -> Self {
        let count = |s: Severity| results.iter().filter(|r| r.severity == s).count();

        let overall = if count(Severity::Critical) > 0 {
            "存在严重问题，需重点关注"
        } else if count(Severity::Anomalous) > 0 {
            "部分模块表现异常，建议优化"
        } else if count(Severity::Watch) >= 3 {
            "多个模块需要关注，整体表现中等"
        } else {
            "整体表现良好"
        };

        // stable sort keeps report order among equal severities
        let mut ranked: Vec<&AnalysisResult> = results.iter().collect();
        ranked.sort_by(|a, b| b.severity.cmp(&a.severity));
        let key_findings = ranked
            .iter()
            .take(KEY_FINDINGS)
            .map(|r| r.conclusion.clone())
            .collect();

        let severity_counts = Severity::ALL
            .iter()
            .rev()
            .map(|&severity| SeverityCount {
                severity,
                count: count(severity),
            })
            .filter(|c| c.count > 0)
            .collect();

        Self {
            overall: overall.to_string(),
            worst: results.iter().map(|r| r.severity).max().unwrap_or(Severity::Normal),
            key_findings,
            severity_counts,
        }
    }

    /// `"关注 2 / 正常 5"`, worst first.
    pub fn distribution(&self) -> String {
        self.severity_counts
            .iter()
            .map(|c| format!("{} {}", c.severity.label(), c.count))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_core::Module;

    fn result(module: Module, severity: Severity, conclusion: &str) -> AnalysisResult {
        AnalysisResult::new(module, conclusion, severity)
    }

    #[test]
    fn healthy_run_is_good_overall() {
        let results: Vec<_> = Module::ORDER
            .iter()
            .map(|&m| result(m, Severity::Normal, m.name()))
            .collect();
        let summary = ExecutiveSummary::from_results(&results);
        assert_eq!(summary.overall, "整体表现良好");
        assert_eq!(summary.worst, Severity::Normal);
        assert_eq!(summary.key_findings, vec!["触达分析", "行为分析", "付费整体分析"]);
        assert_eq!(summary.distribution(), "正常 7");
    }

    #[test]
    fn worst_findings_come_first() {
        let results = vec![
            result(Module::Reach, Severity::Normal, "a"),
            result(Module::Behavior, Severity::Watch, "b"),
            result(Module::PaymentOverview, Severity::Critical, "c"),
            result(Module::RTier, Severity::Anomalous, "d"),
            result(Module::Conversion, Severity::Watch, "e"),
        ];
        let summary = ExecutiveSummary::from_results(&results);
        assert_eq!(summary.overall, "存在严重问题，需重点关注");
        assert_eq!(summary.key_findings, vec!["c", "d", "b"]);
        assert_eq!(summary.distribution(), "严重 1 / 异常 1 / 关注 2 / 正常 1");
    }

    #[test]
    fn three_watches_is_middling() {
        let results = vec![
            result(Module::Reach, Severity::Watch, "a"),
            result(Module::Behavior, Severity::Watch, "b"),
            result(Module::Reward, Severity::Watch, "c"),
            result(Module::Package, Severity::Normal, "d"),
        ];
        let summary = ExecutiveSummary::from_results(&results);
        assert_eq!(summary.overall, "多个模块需要关注，整体表现中等");
    }

    #[test]
    fn anomalous_without_critical() {
        let results = vec![
            result(Module::Reach, Severity::Anomalous, "a"),
            result(Module::Behavior, Severity::Normal, "b"),
        ];
        assert_eq!(
            ExecutiveSummary::from_results(&results).overall,
            "部分模块表现异常，建议优化"
        );
    }
}
