use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Severity ──────────────────────────────────────────────────

/// Concern level of a module finding. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// 正常: within expectations.
    #[serde(rename = "正常")]
    Normal,
    /// 关注: worth watching, no action forced.
    #[serde(rename = "关注")]
    Watch,
    /// 异常: clear problem, fix next run.
    #[serde(rename = "异常")]
    Anomalous,
    /// 严重: must be handled immediately.
    #[serde(rename = "严重")]
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Normal,
        Severity::Watch,
        Severity::Anomalous,
        Severity::Critical,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Normal => "正常",
            Severity::Watch => "关注",
            Severity::Anomalous => "异常",
            Severity::Critical => "严重",
        }
    }

    /// One step worse, saturating at `Critical`.
    pub fn escalate(self) -> Self {
        match self {
            Severity::Normal => Severity::Watch,
            Severity::Watch => Severity::Anomalous,
            Severity::Anomalous | Severity::Critical => Severity::Critical,
        }
    }

    /// Console marker used in run logs.
    pub fn marker(&self) -> &'static str {
        match self {
            Severity::Normal => "[OK]",
            Severity::Watch => "[!]",
            Severity::Anomalous => "[X]",
            Severity::Critical => "[XX]",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "正常" | "normal" | "Normal" => Ok(Severity::Normal),
            "关注" | "watch" | "Watch" => Ok(Severity::Watch),
            "异常" | "anomalous" | "Anomalous" => Ok(Severity::Anomalous),
            "严重" | "critical" | "Critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

// ── Module ────────────────────────────────────────────────────

/// The seven analysis dimensions, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Reach,
    Behavior,
    PaymentOverview,
    RTier,
    Conversion,
    Reward,
    Package,
}

impl Module {
    pub const ORDER: [Module; 7] = [
        Module::Reach,
        Module::Behavior,
        Module::PaymentOverview,
        Module::RTier,
        Module::Conversion,
        Module::Reward,
        Module::Package,
    ];

    /// Short module name carried on every result.
    pub fn name(&self) -> &'static str {
        match self {
            Module::Reach => "触达分析",
            Module::Behavior => "行为分析",
            Module::PaymentOverview => "付费整体分析",
            Module::RTier => "R级付费分析",
            Module::Conversion => "付费转化分析",
            Module::Reward => "数值设计评估",
            Module::Package => "礼包分析",
        }
    }

    pub fn section_title(&self) -> &'static str {
        match self {
            Module::Reach => "一、触达转化分析",
            Module::Behavior => "二、行为数据分析",
            Module::PaymentOverview => "三、付费整体分析",
            Module::RTier => "四、R级付费分析",
            Module::Conversion => "五、付费转化分析",
            Module::Reward => "六、数值设计评估",
            Module::Package => "七、商业化礼包分析",
        }
    }

    /// File name the chart renderer is expected to produce for this module.
    pub fn chart_file(&self) -> &'static str {
        match self {
            Module::Reach => "1_Reach_Funnel.png",
            Module::Behavior => "2_Behavior_Data.png",
            Module::PaymentOverview => "3_Payment_Overview.png",
            Module::RTier => "4_RTier_Payment.png",
            Module::Conversion => "5_Conversion_Compare.png",
            Module::Reward => "6_Reward_Deviation.png",
            Module::Package => "7_Package_Compare.png",
        }
    }

    /// Input block this module reads.
    pub fn block(&self) -> &'static str {
        match self {
            Module::Reach => "reach_conversion",
            Module::Behavior => "behavior_data",
            Module::PaymentOverview => "payment_overview",
            Module::RTier => "r_tier_payment",
            Module::Conversion => "payment_conversion",
            Module::Reward => "core_reward",
            Module::Package => "gift_packages",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── AnalysisResult ────────────────────────────────────────────

/// Output of one analyzer for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub module: Module,
    pub module_name: String,
    pub conclusion: String,
    pub severity: Severity,
    pub details: Vec<String>,
    pub suggestions: Vec<String>,
    /// Typed chart payload, serialized for the rendering collaborator.
    pub chart_data: serde_json::Value,
    pub raw_metrics: serde_json::Value,
}

impl AnalysisResult {
    pub fn new(module: Module, conclusion: impl Into<String>, severity: Severity) -> Self {
        Self {
            module,
            module_name: module.name().to_string(),
            conclusion: conclusion.into(),
            severity,
            details: Vec::new(),
            suggestions: Vec::new(),
            chart_data: serde_json::Value::Object(Default::default()),
            raw_metrics: serde_json::Value::Object(Default::default()),
        }
    }

    /// Degraded result for a module that could not be analyzed.
    pub fn insufficient(module: Module, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut result = Self::new(module, format!("{}数据不足，跳过分析", module.name()), Severity::Watch);
        result.details.push(reason);
        result
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_chart_data(mut self, chart_data: serde_json::Value) -> Self {
        self.chart_data = chart_data;
        self
    }

    pub fn with_raw_metrics(mut self, raw_metrics: serde_json::Value) -> Self {
        self.raw_metrics = raw_metrics;
        self
    }
}
