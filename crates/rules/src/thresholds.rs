//! AnalysisThresholds rule kind: the numeric cut-offs every analyzer grades
//! against (funnel minimums, usage buckets, revenue drop bands, segmentation
//! cliffs, reward deviation bands, package roles).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, RuleError};
use crate::validation::{validate_thresholds_rule, ValidationResult};

pub const API_VERSION: &str = "v1";
pub const KIND: &str = "AnalysisThresholds";

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level AnalysisThresholds document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdsRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: ThresholdsMetadata,
    pub spec: Thresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdsMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Specification section. Every section may be omitted and then takes its
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    pub reach: ReachThresholds,
    pub behavior: BehaviorThresholds,
    pub payment: PaymentThresholds,
    pub r_tier: RTierThresholds,
    pub conversion: ConversionThresholds,
    pub reward: RewardThresholds,
    pub package: PackageThresholds,
}

/// Funnel step minimums, in percent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReachThresholds {
    /// Minimum rate into a payment stage.
    pub payment_stage_min_rate: f64,
    /// Minimum rate into any other stage.
    pub stage_min_rate: f64,
    /// Primary benchmark lead (pp) that makes a step critical.
    pub benchmark_gap_pp: f64,
    /// Stage-name fragments marking a payment stage (case-insensitive).
    pub payment_stage_keywords: Vec<String>,
}

impl Default for ReachThresholds {
    fn default() -> Self {
        Self {
            payment_stage_min_rate: 5.0,
            stage_min_rate: 30.0,
            benchmark_gap_pp: 15.0,
            payment_stage_keywords: vec!["付费".into(), "pay".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorThresholds {
    /// Usage rate above this is "high".
    pub high_usage_rate: f64,
    /// Usage rate below this is "low".
    pub low_usage_rate: f64,
    /// z-score flagging an anomalous DAU day.
    pub dau_anomaly_z: f64,
    /// Change vs benchmark below this is anomalous.
    pub drop_anomalous: f64,
    /// Change vs benchmark below this is worth watching.
    pub drop_watch: f64,
    /// Stage-name fragments marking the participation stage.
    pub participation_keywords: Vec<String>,
}

impl Default for BehaviorThresholds {
    fn default() -> Self {
        Self {
            high_usage_rate: 80.0,
            low_usage_rate: 5.0,
            dau_anomaly_z: 2.0,
            drop_anomalous: -20.0,
            drop_watch: -10.0,
            participation_keywords: vec!["参与".into(), "particip".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PaymentThresholds {
    /// Minimum relative drop from the first point to the bottom for a V.
    pub v_drop_ratio: f64,
    /// Minimum relative rise from the bottom to the last point for a V.
    pub v_rise_ratio: f64,
    /// Reference revenue change below this is anomalous.
    pub revenue_anomalous: f64,
    /// ARPPU vs historical average below this is worth watching.
    pub arppu_vs_avg_watch: f64,
    /// Per-key YoY change below this is listed as a warning.
    pub yoy_warning: f64,
}

impl Default for PaymentThresholds {
    fn default() -> Self {
        Self {
            v_drop_ratio: 0.3,
            v_rise_ratio: 0.3,
            revenue_anomalous: -20.0,
            arppu_vs_avg_watch: -15.0,
            yoy_warning: -15.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RTierThresholds {
    /// Top-tier revenue share (%) above which the activity is high-spender skewed.
    pub high_spender_share: f64,
    /// Non-top tier pay-rate gain (%) marking a broad-reach activity.
    pub broad_reach_pay_rate_gain: f64,
    pub revenue_anomalous: f64,
    pub revenue_watch: f64,
    /// Top tier revenue change below this ...
    pub crossing_top_drop: f64,
    /// ... while the bottom tier rises above this is a crossing.
    pub crossing_bottom_gain: f64,
}

impl Default for RTierThresholds {
    fn default() -> Self {
        Self {
            high_spender_share: 50.0,
            broad_reach_pay_rate_gain: 10.0,
            revenue_anomalous: -20.0,
            revenue_watch: -10.0,
            crossing_top_drop: -10.0,
            crossing_bottom_gain: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionThresholds {
    /// Adjacent payer decay (0..1) that starts a new bucket.
    pub cliff_decay: f64,
    pub min_buckets: usize,
    pub max_buckets: usize,
    /// Payer-share shift (pp) in any bucket that is worth watching.
    pub share_shift_watch: f64,
    /// Shift (pp) counted as a gain or loss for the structural downgrade check.
    pub structural_shift_pp: f64,
    /// Current decay ratio below `primary * this` counts as accelerated.
    pub decay_worse_factor: f64,
}

impl Default for ConversionThresholds {
    fn default() -> Self {
        Self {
            cliff_decay: 0.4,
            min_buckets: 2,
            max_buckets: 6,
            share_shift_watch: 5.0,
            structural_shift_pp: 3.0,
            decay_worse_factor: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RewardThresholds {
    /// |deviation| at or below this is as expected.
    pub as_expected: f64,
    /// |deviation| at or below this is a minor deviation.
    pub minor: f64,
    /// Minor items listed individually before collapsing the rest.
    pub minor_detail_cap: usize,
}

impl Default for RewardThresholds {
    fn default() -> Self {
        Self {
            as_expected: 10.0,
            minor: 30.0,
            minor_detail_cap: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PackageThresholds {
    /// Packages priced at or below this play the acquisition role.
    pub low_price_max: f64,
    /// Packages priced at or above this anchor monetization.
    pub high_price_min: f64,
    /// Required payer share (%) of low-price packages.
    pub low_price_payer_share: f64,
    /// Required revenue share (%) of high-price packages.
    pub high_price_revenue_share: f64,
    /// Revenue share and payer share (%) under which a package is dead weight.
    pub dead_weight_share: f64,
}

impl Default for PackageThresholds {
    fn default() -> Self {
        Self {
            low_price_max: 30.0,
            high_price_min: 300.0,
            low_price_payer_share: 50.0,
            high_price_revenue_share: 30.0,
            dead_weight_share: 5.0,
        }
    }
}

// ── Compiled type ───────────────────────────────────────────────────

/// Compiled thresholds. The `spec` section is already typed.
pub type CompiledThresholds = Thresholds;

impl ThresholdsRule {
    /// Validate and compile the YAML config.
    pub fn compile(&self) -> Result<CompiledThresholds> {
        let result = self.validate();
        if !result.valid {
            return Err(RuleError::Validation(result.summary()));
        }
        Ok(self.spec.clone())
    }

    pub fn validate(&self) -> ValidationResult {
        validate_thresholds_rule(self)
    }
}

/// Load an `AnalysisThresholds` document from disk and compile it.
pub fn load_thresholds(path: &Path) -> Result<CompiledThresholds> {
    let yaml = std::fs::read_to_string(path)?;
    let rule: ThresholdsRule = serde_yaml::from_str(&yaml)?;
    let compiled = rule.compile()?;
    info!(path = %path.display(), id = %rule.metadata.id, "loaded analysis thresholds");
    Ok(compiled)
}
