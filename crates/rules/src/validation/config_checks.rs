//! Validation for the AnalysisThresholds config kind.

use super::fuzzy::is_kebab_case;
use super::ValidationResult;

use crate::thresholds::{ThresholdsRule, API_VERSION, KIND};

// ── Common metadata validation ──────────────────────────────────────

fn validate_common_metadata(rule: &ThresholdsRule, result: &mut ValidationResult) {
    if rule.api_version != API_VERSION {
        result.error(
            "apiVersion",
            format!("apiVersion must be '{}', got '{}'", API_VERSION, rule.api_version),
        );
    }
    if rule.kind != KIND {
        result.error("kind", format!("kind must be '{}', got '{}'", KIND, rule.kind));
    }
    if !is_kebab_case(&rule.metadata.id) {
        result.error(
            "metadata.id",
            format!(
                "id must be kebab-case (lowercase alphanumeric + hyphens), got '{}'",
                rule.metadata.id
            ),
        );
    }
}

fn percent(path: &str, value: f64, result: &mut ValidationResult) {
    if !(0.0..=100.0).contains(&value) {
        result.error(path, format!("must be between 0 and 100, got {value}"));
    }
}

fn ratio(path: &str, value: f64, result: &mut ValidationResult) {
    if !(value > 0.0 && value <= 1.0) {
        result.error(path, format!("must be in (0, 1], got {value}"));
    }
}

fn ascending(path: &str, low: (&str, f64), high: (&str, f64), result: &mut ValidationResult) {
    if low.1 >= high.1 {
        result.error(
            path,
            format!("{} ({}) must be below {} ({})", low.0, low.1, high.0, high.1),
        );
    }
}

// ── Thresholds validation ───────────────────────────────────────────

pub fn validate_thresholds(rule: &ThresholdsRule, result: &mut ValidationResult) {
    validate_common_metadata(rule, result);
    let t = &rule.spec;

    percent("spec.reach.payment_stage_min_rate", t.reach.payment_stage_min_rate, result);
    percent("spec.reach.stage_min_rate", t.reach.stage_min_rate, result);
    percent("spec.reach.benchmark_gap_pp", t.reach.benchmark_gap_pp, result);
    if t.reach.payment_stage_keywords.iter().any(|k| k.trim().is_empty()) {
        result.error("spec.reach.payment_stage_keywords", "keywords must not be empty");
    }

    ascending(
        "spec.behavior",
        ("low_usage_rate", t.behavior.low_usage_rate),
        ("high_usage_rate", t.behavior.high_usage_rate),
        result,
    );
    ascending(
        "spec.behavior",
        ("drop_anomalous", t.behavior.drop_anomalous),
        ("drop_watch", t.behavior.drop_watch),
        result,
    );
    if t.behavior.dau_anomaly_z <= 0.0 {
        result.error("spec.behavior.dau_anomaly_z", "must be positive");
    }

    ratio("spec.payment.v_drop_ratio", t.payment.v_drop_ratio, result);
    ratio("spec.payment.v_rise_ratio", t.payment.v_rise_ratio, result);

    percent("spec.r_tier.high_spender_share", t.r_tier.high_spender_share, result);
    ascending(
        "spec.r_tier",
        ("revenue_anomalous", t.r_tier.revenue_anomalous),
        ("revenue_watch", t.r_tier.revenue_watch),
        result,
    );

    let c = &t.conversion;
    ratio("spec.conversion.cliff_decay", c.cliff_decay, result);
    ratio("spec.conversion.decay_worse_factor", c.decay_worse_factor, result);
    if c.min_buckets < 2 {
        result.error(
            "spec.conversion.min_buckets",
            format!("must be at least 2, got {}", c.min_buckets),
        );
    }
    if c.min_buckets > c.max_buckets {
        result.error(
            "spec.conversion",
            format!("min_buckets ({}) exceeds max_buckets ({})", c.min_buckets, c.max_buckets),
        );
    }

    if t.reward.as_expected < 0.0 {
        result.error("spec.reward.as_expected", "must not be negative");
    }
    ascending(
        "spec.reward",
        ("as_expected", t.reward.as_expected),
        ("minor", t.reward.minor),
        result,
    );

    ascending(
        "spec.package",
        ("low_price_max", t.package.low_price_max),
        ("high_price_min", t.package.high_price_min),
        result,
    );
    percent("spec.package.low_price_payer_share", t.package.low_price_payer_share, result);
    percent("spec.package.high_price_revenue_share", t.package.high_price_revenue_share, result);
    percent("spec.package.dead_weight_share", t.package.dead_weight_share, result);
}
