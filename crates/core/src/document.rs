//! Typed input document: activity meta plus the seven metric blocks.
//!
//! Every multi-benchmark list in this module is ordered: the first entry is
//! the primary benchmark (drives severity), later entries are informational.

use std::collections::BTreeSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReviewError};

/// Fully materialized review input. Build it through the validator in
/// `review-rules`; deserializing directly skips the block-qualified checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDocument {
    pub meta: EventMeta,
    pub reach_conversion: ReachConversion,
    #[serde(default)]
    pub behavior_data: Option<BehaviorData>,
    pub payment_overview: PaymentOverview,
    pub r_tier_payment: RTierPayment,
    pub payment_conversion: PaymentConversion,
    pub core_reward: CoreReward,
    pub gift_packages: GiftPackages,
}

// ── Meta ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMeta {
    pub event_name: String,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub event_start_date: Option<String>,
    #[serde(default)]
    pub event_end_date: Option<String>,
    pub change_description: String,
    #[serde(default)]
    pub benchmark_event: Option<String>,
}

// ── Reach ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachConversion {
    pub stages: Vec<FunnelStage>,
    #[serde(default)]
    pub comparisons: Vec<FunnelComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: String,
    pub users: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelComparison {
    pub benchmark_event: String,
    pub stages: Vec<FunnelStage>,
}

// ── Behavior ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorData {
    #[serde(default)]
    pub metrics: Vec<BehaviorMetric>,
    #[serde(default)]
    pub daily_trend: Vec<DailyActive>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorMetric {
    pub metric_name: String,
    pub current_value: f64,
    #[serde(default)]
    pub benchmark_value: Option<f64>,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyActive {
    pub date: String,
    pub dau: f64,
}

// ── Payment overview ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOverview {
    pub time_series: Vec<PaymentSnapshot>,
    #[serde(default)]
    pub yoy_benchmarks: Vec<PaymentSnapshot>,
}

/// Headline payment figures of one activity run. `pay_rate` is a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSnapshot {
    pub event: String,
    pub revenue: f64,
    pub pay_rate: f64,
    pub arpu: f64,
    pub arppu: f64,
}

// ── R-tier payment ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RTierPayment {
    /// Tier names, highest spenders first.
    pub tiers: Vec<String>,
    pub time_series: Vec<TierSnapshot>,
    #[serde(default)]
    pub benchmarks: Vec<TierSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSnapshot {
    pub event: String,
    pub data: IndexMap<String, TierMetrics>,
}

impl TierSnapshot {
    /// Metrics for `tier`; a tier absent from this run reads as all zeros.
    pub fn metrics(&self, tier: &str) -> TierMetrics {
        self.data.get(tier).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierMetrics {
    pub revenue: f64,
    pub pay_rate: f64,
    pub arpu: f64,
    pub arppu: f64,
}

impl TierMetrics {
    pub fn get(&self, key: TierMetric) -> f64 {
        match key {
            TierMetric::Revenue => self.revenue,
            TierMetric::PayRate => self.pay_rate,
            TierMetric::Arpu => self.arpu,
            TierMetric::Arppu => self.arppu,
        }
    }
}

/// Named metric of a payer tier or payment snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierMetric {
    Revenue,
    PayRate,
    Arpu,
    Arppu,
}

impl TierMetric {
    pub const ALL: [TierMetric; 4] = [
        TierMetric::Revenue,
        TierMetric::PayRate,
        TierMetric::Arpu,
        TierMetric::Arppu,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TierMetric::Revenue => "流水",
            TierMetric::PayRate => "付费率",
            TierMetric::Arpu => "ARPU",
            TierMetric::Arppu => "ARPPU",
        }
    }
}

impl PaymentSnapshot {
    pub fn get(&self, key: TierMetric) -> f64 {
        match key {
            TierMetric::Revenue => self.revenue,
            TierMetric::PayRate => self.pay_rate,
            TierMetric::Arpu => self.arpu,
            TierMetric::Arppu => self.arppu,
        }
    }
}

// ── Payment conversion ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConversion {
    pub current: PriceTierSet,
    #[serde(default)]
    pub comparisons: Vec<PriceTierComparison>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTierSet {
    pub price_tiers: Vec<PriceTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    pub price: f64,
    pub purchases: f64,
    pub payers: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTierComparison {
    pub event: String,
    pub price_tiers: Vec<PriceTier>,
}

// ── Core reward ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreReward {
    pub items: Vec<RewardItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardItem {
    pub reward_name: String,
    pub expected_value: f64,
    pub actual_value: f64,
    pub unit: String,
    #[serde(default)]
    pub expected_cost: Option<f64>,
    #[serde(default)]
    pub actual_cost: Option<f64>,
    #[serde(default)]
    pub cost_unit: Option<String>,
}

// ── Gift packages ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftPackages {
    pub packages: Vec<GiftPackage>,
    #[serde(default)]
    pub comparisons: Vec<PackageComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftPackage {
    pub package_name: String,
    pub price: f64,
    pub revenue: f64,
    pub payers: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageComparison {
    pub event: String,
    pub packages: Vec<GiftPackage>,
}

// ── Helpers ───────────────────────────────────────────────────

impl InputDocument {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Report title, e.g. `"春节活动 复盘报告"`.
    pub fn report_title(&self) -> String {
        format!("{} 复盘报告", self.meta.event_name)
    }

    /// Every benchmark activity named anywhere in the document, sorted.
    pub fn benchmark_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        if let Some(name) = &self.meta.benchmark_event {
            names.insert(name.clone());
        }
        names.extend(
            self.reach_conversion
                .comparisons
                .iter()
                .map(|c| c.benchmark_event.clone()),
        );
        names.extend(self.payment_overview.yoy_benchmarks.iter().map(|b| b.event.clone()));
        names.extend(self.r_tier_payment.benchmarks.iter().map(|b| b.event.clone()));
        names.extend(
            self.payment_conversion
                .comparisons
                .iter()
                .map(|c| c.event.clone()),
        );
        names.extend(self.gift_packages.comparisons.iter().map(|c| c.event.clone()));
        names.retain(|n| !n.trim().is_empty());
        names
    }
}

/// Index of the entry describing the current activity: the first event whose
/// name contains `event_name` (or is contained in it), else the last entry.
/// `None` only for an empty list.
pub fn current_entry_index<'a, I>(events: I, event_name: &str) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let events: Vec<&str> = events.into_iter().collect();
    if events.is_empty() {
        return None;
    }
    let needle = event_name.trim();
    if !needle.is_empty() {
        let matched = events.iter().position(|e| {
            let e = e.trim();
            !e.is_empty() && (e.contains(needle) || needle.contains(e))
        });
        if matched.is_some() {
            return matched;
        }
    }
    Some(events.len() - 1)
}

/// Read a JSON input file into a raw value for validation.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    if !value.is_object() {
        return Err(ReviewError::NotAnObject(json_kind(&value)));
    }
    Ok(value)
}

/// Human name of a JSON value's type, for error messages.
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
