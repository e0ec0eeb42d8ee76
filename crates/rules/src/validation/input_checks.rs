//! Structural and value-range checks over a raw review input document.

use std::collections::HashSet;

use review_core::json_kind;
use serde_json::{Map, Value};

use super::fuzzy::closest_match;
use super::ValidationResult;

pub(crate) const REQUIRED_BLOCKS: &[&str] = &[
    "meta",
    "reach_conversion",
    "payment_overview",
    "r_tier_payment",
    "payment_conversion",
    "core_reward",
    "gift_packages",
];
pub(crate) const OPTIONAL_BLOCKS: &[&str] = &["behavior_data"];

const MIN_FUNNEL_STAGES: usize = 3;
const MIN_TIME_SERIES: usize = 6;
const MIN_PRICE_TIERS: usize = 3;

#[derive(Debug, Clone, Copy)]
enum Range {
    NonNegative,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Need {
    Required,
    Optional,
}

// ── Document ────────────────────────────────────────────────────────

pub(crate) fn validate_document(value: &Value, result: &mut ValidationResult) {
    let Some(root) = value.as_object() else {
        result.error(
            "document",
            format!("input document must be an object, got {}", json_kind(value)),
        );
        return;
    };

    let unknown: Vec<&str> = root
        .keys()
        .map(String::as_str)
        .filter(|k| !REQUIRED_BLOCKS.contains(k) && !OPTIONAL_BLOCKS.contains(k))
        .collect();

    for &block in REQUIRED_BLOCKS {
        if root.contains_key(block) {
            continue;
        }
        match unknown.iter().find(|k| closest_match(k, &[block]).is_some()) {
            Some(found) => result.error_with_suggestion(
                block,
                "missing required block",
                format!("found '{found}', did you mean '{block}'?"),
            ),
            None => result.error(block, "missing required block"),
        }
    }
    for key in &unknown {
        result.warn(*key, format!("unknown block '{key}' is ignored"));
    }

    if let Some(v) = root.get("meta") {
        check_meta(v, result);
    }
    if let Some(v) = root.get("reach_conversion") {
        check_reach(v, result);
    }
    check_behavior(root.get("behavior_data"), result);
    if let Some(v) = root.get("payment_overview") {
        check_payment_overview(v, result);
    }
    if let Some(v) = root.get("r_tier_payment") {
        check_r_tier(v, result);
    }
    if let Some(v) = root.get("payment_conversion") {
        check_conversion(v, result);
    }
    if let Some(v) = root.get("core_reward") {
        check_reward(v, result);
    }
    if let Some(v) = root.get("gift_packages") {
        check_packages(v, result);
    }
}

// ── Blocks ──────────────────────────────────────────────────────────

fn check_meta(value: &Value, result: &mut ValidationResult) {
    let Some(meta) = object(value, "meta", result) else { return };
    text(meta, "meta", "event_name", Need::Required, result);
    text(meta, "meta", "change_description", Need::Required, result);
    for key in ["event_type", "event_start_date", "event_end_date", "benchmark_event"] {
        text(meta, "meta", key, Need::Optional, result);
    }
}

fn check_reach(value: &Value, result: &mut ValidationResult) {
    let path = "reach_conversion";
    let Some(block) = object(value, path, result) else { return };

    let stages = list(block, path, "stages", MIN_FUNNEL_STAGES, Need::Required, result);
    let stage_count = if let Some(stages) = stages {
        let stages_path = format!("{path}.stages");
        let checked: Vec<(Option<&str>, Option<f64>)> = stages
            .iter()
            .enumerate()
            .map(|(i, s)| check_stage(s, &format!("{stages_path}[{i}]"), result))
            .collect();

        for pair in checked.windows(2) {
            if let ((prev_name, Some(prev)), (name, Some(curr))) = (pair[0], pair[1]) {
                if curr > prev {
                    result.warn(
                        stages_path.as_str(),
                        format!(
                            "users increase from '{}' ({}) to '{}' ({}); \
                             funnel stages are expected to narrow",
                            prev_name.unwrap_or("?"),
                            prev,
                            name.unwrap_or("?"),
                            curr
                        ),
                    );
                }
            }
        }
        Some(stages.len())
    } else {
        None
    };

    if let Some(comparisons) = list(block, path, "comparisons", 0, Need::Optional, result) {
        for (i, comparison) in comparisons.iter().enumerate() {
            let cpath = format!("{path}.comparisons[{i}]");
            let Some(c) = object(comparison, &cpath, result) else { continue };
            text(c, &cpath, "benchmark_event", Need::Required, result);
            if let Some(stages) = list(c, &cpath, "stages", 1, Need::Required, result) {
                for (j, s) in stages.iter().enumerate() {
                    check_stage(s, &format!("{cpath}.stages[{j}]"), result);
                }
                if let Some(n) = stage_count {
                    if stages.len() != n {
                        result.warn(
                            format!("{cpath}.stages"),
                            format!(
                                "{} has {} stages but the current funnel has {}; \
                                 only shared steps are compared",
                                rel(&cpath),
                                stages.len(),
                                n
                            ),
                        );
                    }
                }
            }
        }
    }
}

fn check_stage<'v>(
    value: &'v Value,
    path: &str,
    result: &mut ValidationResult,
) -> (Option<&'v str>, Option<f64>) {
    let Some(stage) = object(value, path, result) else { return (None, None) };
    let name = text(stage, path, "stage", Need::Required, result);
    let users = number(stage, path, "users", Range::NonNegative, Need::Required, result);
    (name, users)
}

fn check_behavior(value: Option<&Value>, result: &mut ValidationResult) {
    let path = "behavior_data";
    let value = match value {
        None | Some(Value::Null) => {
            result.warn(
                path,
                "optional block behavior_data is missing; behavior analysis will be degraded",
            );
            return;
        }
        Some(v) => v,
    };
    let Some(block) = object(value, path, result) else { return };

    match list(block, path, "metrics", 0, Need::Optional, result) {
        Some(metrics) if !metrics.is_empty() => {
            for (i, metric) in metrics.iter().enumerate() {
                let mpath = format!("{path}.metrics[{i}]");
                let Some(m) = object(metric, &mpath, result) else { continue };
                text(m, &mpath, "metric_name", Need::Required, result);
                number(m, &mpath, "current_value", Range::NonNegative, Need::Required, result);
                number(m, &mpath, "benchmark_value", Range::NonNegative, Need::Optional, result);
                text(m, &mpath, "unit", Need::Required, result);
            }
        }
        _ => result.warn(
            format!("{path}.metrics"),
            "no behavior metrics; behavior analysis will be degraded",
        ),
    }

    if let Some(days) = list(block, path, "daily_trend", 0, Need::Optional, result) {
        for (i, day) in days.iter().enumerate() {
            let dpath = format!("{path}.daily_trend[{i}]");
            let Some(d) = object(day, &dpath, result) else { continue };
            text(d, &dpath, "date", Need::Required, result);
            number(d, &dpath, "dau", Range::NonNegative, Need::Required, result);
        }
    }
}

fn check_payment_overview(value: &Value, result: &mut ValidationResult) {
    let path = "payment_overview";
    let Some(block) = object(value, path, result) else { return };
    let series = list(block, path, "time_series", MIN_TIME_SERIES, Need::Required, result);
    if let Some(series) = series {
        for (i, entry) in series.iter().enumerate() {
            check_payment_snapshot(entry, &format!("{path}.time_series[{i}]"), result);
        }
    }
    if let Some(benchmarks) = list(block, path, "yoy_benchmarks", 0, Need::Optional, result) {
        for (i, entry) in benchmarks.iter().enumerate() {
            check_payment_snapshot(entry, &format!("{path}.yoy_benchmarks[{i}]"), result);
        }
    }
}

fn check_payment_snapshot(value: &Value, path: &str, result: &mut ValidationResult) {
    let Some(entry) = object(value, path, result) else { return };
    text(entry, path, "event", Need::Required, result);
    number(entry, path, "revenue", Range::NonNegative, Need::Required, result);
    number(entry, path, "pay_rate", Range::Percent, Need::Required, result);
    number(entry, path, "arpu", Range::NonNegative, Need::Required, result);
    number(entry, path, "arppu", Range::NonNegative, Need::Required, result);
}

fn check_r_tier(value: &Value, result: &mut ValidationResult) {
    let path = "r_tier_payment";
    let Some(block) = object(value, path, result) else { return };

    let mut tiers: Vec<&str> = Vec::new();
    if let Some(names) = list(block, path, "tiers", 1, Need::Required, result) {
        let mut seen = HashSet::new();
        for (i, name) in names.iter().enumerate() {
            let tpath = format!("{path}.tiers[{i}]");
            match name.as_str() {
                Some(s) if !s.trim().is_empty() => {
                    if !seen.insert(s) {
                        result.error(tpath, format!("tier '{s}' is listed more than once"));
                    }
                    tiers.push(s);
                }
                Some(_) => {
                    result.error(tpath.as_str(), format!("{} must not be empty", rel(&tpath)))
                }
                None => result.error(
                    tpath.as_str(),
                    format!("{} must be a string, got {}", rel(&tpath), json_kind(name)),
                ),
            }
        }
    }

    let series = list(block, path, "time_series", MIN_TIME_SERIES, Need::Required, result);
    if let Some(series) = series {
        for (i, entry) in series.iter().enumerate() {
            check_tier_snapshot(entry, &format!("{path}.time_series[{i}]"), &tiers, result);
        }
    }
    if let Some(benchmarks) = list(block, path, "benchmarks", 0, Need::Optional, result) {
        for (i, entry) in benchmarks.iter().enumerate() {
            check_tier_snapshot(entry, &format!("{path}.benchmarks[{i}]"), &tiers, result);
        }
    }
}

fn check_tier_snapshot(value: &Value, path: &str, tiers: &[&str], result: &mut ValidationResult) {
    let Some(entry) = object(value, path, result) else { return };
    text(entry, path, "event", Need::Required, result);

    let dpath = format!("{path}.data");
    let data = match entry.get("data") {
        None | Some(Value::Null) => {
            result.error(dpath.as_str(), format!("{} is required", rel(&dpath)));
            return;
        }
        Some(v) => v,
    };
    let Some(data) = object(data, &dpath, result) else { return };
    if data.is_empty() {
        result.error(dpath.as_str(), format!("{} must not be empty", rel(&dpath)));
        return;
    }

    for (tier, metrics) in data {
        let mpath = format!("{dpath}.{tier}");
        if !tiers.is_empty() && !tiers.contains(&tier.as_str()) {
            result.warn(
                mpath.as_str(),
                format!("tier '{tier}' is not listed in tiers and is ignored"),
            );
        }
        let Some(m) = object(metrics, &mpath, result) else { continue };
        number(m, &mpath, "revenue", Range::NonNegative, Need::Required, result);
        number(m, &mpath, "pay_rate", Range::Percent, Need::Required, result);
        number(m, &mpath, "arpu", Range::NonNegative, Need::Required, result);
        number(m, &mpath, "arppu", Range::NonNegative, Need::Required, result);
    }
    for tier in tiers {
        if !data.contains_key(*tier) {
            result.warn(
                dpath.as_str(),
                format!("{} has no entry for tier '{tier}'; it counts as zero", rel(&dpath)),
            );
        }
    }
}

fn check_conversion(value: &Value, result: &mut ValidationResult) {
    let path = "payment_conversion";
    let Some(block) = object(value, path, result) else { return };

    let cpath = format!("{path}.current");
    match block.get("current") {
        None | Some(Value::Null) => result.error(cpath.as_str(), "current is required"),
        Some(current) => {
            if let Some(current) = object(current, &cpath, result) {
                check_price_tiers(current, &cpath, MIN_PRICE_TIERS, result);
            }
        }
    }

    if let Some(comparisons) = list(block, path, "comparisons", 0, Need::Optional, result) {
        for (i, comparison) in comparisons.iter().enumerate() {
            let ppath = format!("{path}.comparisons[{i}]");
            let Some(c) = object(comparison, &ppath, result) else { continue };
            text(c, &ppath, "event", Need::Required, result);
            check_price_tiers(c, &ppath, 1, result);
        }
    }
}

fn check_price_tiers(
    obj: &Map<String, Value>,
    path: &str,
    min: usize,
    result: &mut ValidationResult,
) {
    let Some(tiers) = list(obj, path, "price_tiers", min, Need::Required, result) else { return };
    for (i, tier) in tiers.iter().enumerate() {
        let tpath = format!("{path}.price_tiers[{i}]");
        let Some(t) = object(tier, &tpath, result) else { continue };
        number(t, &tpath, "price", Range::NonNegative, Need::Required, result);
        number(t, &tpath, "purchases", Range::NonNegative, Need::Required, result);
        number(t, &tpath, "payers", Range::NonNegative, Need::Required, result);
    }
}

fn check_reward(value: &Value, result: &mut ValidationResult) {
    let path = "core_reward";
    let Some(block) = object(value, path, result) else { return };
    let Some(items) = list(block, path, "items", 1, Need::Required, result) else { return };
    for (i, item) in items.iter().enumerate() {
        let ipath = format!("{path}.items[{i}]");
        let Some(it) = object(item, &ipath, result) else { continue };
        text(it, &ipath, "reward_name", Need::Required, result);
        number(it, &ipath, "expected_value", Range::NonNegative, Need::Required, result);
        number(it, &ipath, "actual_value", Range::NonNegative, Need::Required, result);
        text(it, &ipath, "unit", Need::Required, result);
        number(it, &ipath, "expected_cost", Range::NonNegative, Need::Optional, result);
        number(it, &ipath, "actual_cost", Range::NonNegative, Need::Optional, result);
        text(it, &ipath, "cost_unit", Need::Optional, result);
    }
}

fn check_packages(value: &Value, result: &mut ValidationResult) {
    let path = "gift_packages";
    let Some(block) = object(value, path, result) else { return };
    if let Some(packages) = list(block, path, "packages", 1, Need::Required, result) {
        check_package_list(packages, &format!("{path}.packages"), result);
    }
    if let Some(comparisons) = list(block, path, "comparisons", 0, Need::Optional, result) {
        for (i, comparison) in comparisons.iter().enumerate() {
            let cpath = format!("{path}.comparisons[{i}]");
            let Some(c) = object(comparison, &cpath, result) else { continue };
            text(c, &cpath, "event", Need::Required, result);
            if let Some(packages) = list(c, &cpath, "packages", 1, Need::Required, result) {
                check_package_list(packages, &format!("{cpath}.packages"), result);
            }
        }
    }
}

fn check_package_list(packages: &[Value], path: &str, result: &mut ValidationResult) {
    for (i, package) in packages.iter().enumerate() {
        let ppath = format!("{path}[{i}]");
        let Some(p) = object(package, &ppath, result) else { continue };
        text(p, &ppath, "package_name", Need::Required, result);
        number(p, &ppath, "price", Range::NonNegative, Need::Required, result);
        number(p, &ppath, "revenue", Range::NonNegative, Need::Required, result);
        number(p, &ppath, "payers", Range::NonNegative, Need::Required, result);
    }
}

// ── Field helpers ───────────────────────────────────────────────────

/// Path relative to its block: `"gift_packages.packages[0]"` → `"packages[0]"`.
fn rel(path: &str) -> &str {
    path.split_once('.').map(|(_, rest)| rest).unwrap_or(path)
}

fn object<'v>(
    value: &'v Value,
    path: &str,
    result: &mut ValidationResult,
) -> Option<&'v Map<String, Value>> {
    match value.as_object() {
        Some(obj) => Some(obj),
        None => {
            let kind = json_kind(value);
            result.error(path, format!("{} must be an object, got {kind}", rel(path)));
            None
        }
    }
}

fn list<'v>(
    obj: &'v Map<String, Value>,
    parent: &str,
    key: &str,
    min: usize,
    need: Need,
    result: &mut ValidationResult,
) -> Option<&'v [Value]> {
    let path = format!("{parent}.{key}");
    match obj.get(key) {
        None | Some(Value::Null) => {
            if need == Need::Required {
                result.error(path.as_str(), format!("{} is required", rel(&path)));
            }
            None
        }
        Some(Value::Array(items)) => {
            if items.len() < min {
                result.error(
                    path.as_str(),
                    format!(
                        "{} requires at least {} entries, got {}",
                        rel(&path),
                        min,
                        items.len()
                    ),
                );
            }
            Some(items.as_slice())
        }
        Some(other) => {
            result.error(
                path.as_str(),
                format!("{} must be an array, got {}", rel(&path), json_kind(other)),
            );
            None
        }
    }
}

fn number(
    obj: &Map<String, Value>,
    parent: &str,
    key: &str,
    range: Range,
    need: Need,
    result: &mut ValidationResult,
) -> Option<f64> {
    let path = format!("{parent}.{key}");
    let value = match obj.get(key) {
        None | Some(Value::Null) => {
            if need == Need::Required {
                result.error(path.as_str(), format!("{} is required", rel(&path)));
            }
            return None;
        }
        Some(Value::Number(n)) => n.as_f64()?,
        Some(other) => {
            result.error(
                path.as_str(),
                format!("{} must be a number, got {}", rel(&path), json_kind(other)),
            );
            return None;
        }
    };
    match range {
        Range::NonNegative if value < 0.0 => {
            result.error(path.as_str(), format!("{} must be >= 0, got {}", rel(&path), value));
        }
        Range::Percent if !(0.0..=100.0).contains(&value) => {
            result.error(
                path.as_str(),
                format!("{} must be between 0 and 100, got {}", rel(&path), value),
            );
        }
        _ => {}
    }
    Some(value)
}

fn text<'v>(
    obj: &'v Map<String, Value>,
    parent: &str,
    key: &str,
    need: Need,
    result: &mut ValidationResult,
) -> Option<&'v str> {
    let path = format!("{parent}.{key}");
    match obj.get(key) {
        None | Some(Value::Null) => {
            if need == Need::Required {
                result.error(path.as_str(), format!("{} is required", rel(&path)));
            }
            None
        }
        Some(Value::String(s)) => {
            if need == Need::Required && s.trim().is_empty() {
                result.error(path.as_str(), format!("{} must not be empty", rel(&path)));
            }
            Some(s.as_str())
        }
        Some(other) => {
            result.error(
                path.as_str(),
                format!("{} must be a string, got {}", rel(&path), json_kind(other)),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        serde_json::from_str(include_str!("../../../../data/samples/spring_festival.json")).unwrap()
    }

    fn run(value: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();
        validate_document(value, &mut result);
        result
    }

    fn messages(result: &ValidationResult) -> Vec<String> {
        result.errors.iter().map(|e| e.to_string()).collect()
    }

    fn has(msgs: &[String], expected: &str) -> bool {
        msgs.iter().any(|m| m == expected)
    }

    #[test]
    fn sample_document_is_clean() {
        let result = run(&sample());
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn short_time_series_is_block_qualified() {
        let mut doc = sample();
        let series = doc["payment_overview"]["time_series"].as_array_mut().unwrap();
        series.truncate(3);
        let result = run(&doc);
        assert!(has(
            &messages(&result),
            "[payment_overview] time_series requires at least 6 entries, got 3"
        ));
    }

    #[test]
    fn every_error_is_reported_at_once() {
        let mut doc = sample();
        doc["meta"]["event_name"] = json!("");
        doc["payment_overview"]["time_series"][0]["pay_rate"] = json!(150.0);
        doc["gift_packages"]["packages"][1]["revenue"] = json!(-5);
        doc["core_reward"]["items"][0].as_object_mut().unwrap().remove("unit");
        let msgs = messages(&run(&doc));
        assert_eq!(msgs.len(), 4, "{msgs:?}");
        assert!(has(&msgs, "[meta] event_name must not be empty"));
        assert!(has(
            &msgs,
            "[payment_overview] time_series[0].pay_rate must be between 0 and 100, got 150"
        ));
        assert!(has(&msgs, "[gift_packages] packages[1].revenue must be >= 0, got -5"));
        assert!(has(&msgs, "[core_reward] items[0].unit is required"));
    }

    #[test]
    fn missing_block_with_typo_gets_suggestion() {
        let mut doc = sample();
        let packages = doc.as_object_mut().unwrap().remove("gift_packages").unwrap();
        doc["gift_package"] = packages;
        let result = run(&doc);
        assert!(!result.valid);
        let err = &result.errors[0];
        assert_eq!(err.path, "gift_packages");
        assert!(err.suggestion.as_deref().unwrap().contains("gift_package"));
        assert!(result.warnings.iter().any(|w| w.path == "gift_package"));
    }

    #[test]
    fn missing_behavior_block_is_only_a_warning() {
        let mut doc = sample();
        doc.as_object_mut().unwrap().remove("behavior_data");
        let result = run(&doc);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].block(), "behavior_data");
    }

    #[test]
    fn empty_behavior_metrics_is_a_warning() {
        let mut doc = sample();
        doc["behavior_data"]["metrics"] = json!([]);
        let result = run(&doc);
        assert!(result.valid);
        assert_eq!(result.warnings[0].path, "behavior_data.metrics");
    }

    #[test]
    fn non_monotonic_funnel_is_a_warning() {
        let mut doc = sample();
        doc["reach_conversion"]["stages"][2]["users"] = json!(70000);
        let result = run(&doc);
        assert!(result.valid);
        assert!(result.warnings[0].message.contains("funnel stages are expected to narrow"));
    }

    #[test]
    fn short_funnel_and_price_tiers_are_errors() {
        let mut doc = sample();
        doc["reach_conversion"]["stages"].as_array_mut().unwrap().truncate(2);
        doc["payment_conversion"]["current"]["price_tiers"].as_array_mut().unwrap().truncate(2);
        let msgs = messages(&run(&doc));
        assert!(has(&msgs, "[reach_conversion] stages requires at least 3 entries, got 2"));
        assert!(has(
            &msgs,
            "[payment_conversion] current.price_tiers requires at least 3 entries, got 2"
        ));
    }

    #[test]
    fn wrong_types_are_named() {
        let mut doc = sample();
        doc["reach_conversion"]["stages"][0]["users"] = json!("100000");
        doc["core_reward"]["items"] = json!({});
        let msgs = messages(&run(&doc));
        assert!(has(&msgs, "[reach_conversion] stages[0].users must be a number, got string"));
        assert!(has(&msgs, "[core_reward] items must be an array, got object"));
    }

    #[test]
    fn tier_without_data_is_a_warning() {
        let mut doc = sample();
        doc["r_tier_payment"]["time_series"][0]["data"]
            .as_object_mut()
            .unwrap()
            .remove("小R");
        let result = run(&doc);
        assert!(result.valid);
        assert!(result.warnings[0].message.contains("小R"));
    }

    #[test]
    fn duplicate_tier_is_an_error() {
        let mut doc = sample();
        doc["r_tier_payment"]["tiers"] = json!(["超R", "大R", "超R"]);
        let msgs = messages(&run(&doc));
        assert!(msgs.iter().any(|m| m.contains("listed more than once")));
    }

    #[test]
    fn non_object_document_is_rejected() {
        let result = run(&json!([1, 2, 3]));
        assert_eq!(
            messages(&result),
            vec!["[document] input document must be an object, got array"]
        );
    }

    #[test]
    fn empty_document_lists_all_required_blocks() {
        let result = run(&json!({}));
        assert_eq!(result.errors.len(), REQUIRED_BLOCKS.len());
        assert_eq!(result.warnings.len(), 1);
    }
}
