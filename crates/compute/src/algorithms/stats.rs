//! Shared statistics every analyzer grades with.

use review_core::Severity;

/// Round to a fixed number of decimals (half away from zero).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Percentage change from `previous` to `current`, rounded to 2 decimals.
///
/// A zero baseline yields `100.0` when something appeared from nothing and
/// `0.0` when both are zero.
pub fn change_rate(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current == 0.0 { 0.0 } else { 100.0 };
    }
    round_to((current - previous) / previous * 100.0, 2)
}

/// `part / whole * 100` rounded, or 0 for an empty whole.
pub fn percent_of(part: f64, whole: f64, decimals: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    round_to(part / whole * 100.0, decimals)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Compute z-score for a value against a baseline.
pub fn z_score(value: f64, mean: f64, stddev: f64) -> f64 {
    if stddev <= f64::EPSILON {
        return 0.0;
    }
    (value - mean) / stddev
}

/// Indices whose population z-score reaches `threshold` in absolute value.
///
/// Series shorter than 3 points and flat series have no anomalies.
pub fn detect_anomaly(values: &[f64], threshold: f64) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    let m = mean(values);
    let sd = std_dev(values);
    if sd <= f64::EPSILON {
        return Vec::new();
    }
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| z_score(**v, m, sd).abs() >= threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Least-squares slope of `values` against their index. 0 for fewer than 2 points.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    if den == 0.0 { 0.0 } else { num / den }
}

/// Grade a percentage change: `>=5` Normal, `>=-5` Watch, `>=-20` Anomalous,
/// else Critical. When a rise is bad, pass `positive_is_good = false`.
pub fn severity_from_change(rate: f64, positive_is_good: bool) -> Severity {
    let effective = if positive_is_good { rate } else { -rate };
    if effective >= 5.0 {
        Severity::Normal
    } else if effective >= -5.0 {
        Severity::Watch
    } else if effective >= -20.0 {
        Severity::Anomalous
    } else {
        Severity::Critical
    }
}
