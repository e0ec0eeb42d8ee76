use serde::Serialize;

use review_core::{AnalysisResult, Severity};

/// Message shown in place of an empty action list.
pub const NO_ACTIONS: &str = "各模块表现良好，暂无需紧急处理的建议。";

/// Suggestions from every module, tiered by the severity of their module.
///
/// - P0: module is Critical
/// - P1: module is Anomalous
/// - P2: everything else
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionPlan {
    pub p0: Vec<String>,
    pub p1: Vec<String>,
    pub p2: Vec<String>,
}

impl ActionPlan {
    pub fn from_results(results: &[AnalysisResult]) -> Self {
        let mut plan = Self::default();
        for r in results {
            let tier = match r.severity {
                Severity::Critical => &mut plan.p0,
                Severity::Anomalous => &mut plan.p1,
                Severity::Watch | Severity::Normal => &mut plan.p2,
            };
            tier.extend(r.suggestions.iter().map(|s| format!("[{}] {}", r.module_name, s)));
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.p0.is_empty() && self.p1.is_empty() && self.p2.is_empty()
    }

    pub fn len(&self) -> usize {
        self.p0.len() + self.p1.len() + self.p2.len()
    }
}
