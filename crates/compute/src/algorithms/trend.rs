use serde::{Deserialize, Serialize};
use tracing::debug;

use review_rules::thresholds::PaymentThresholds;

use super::stats::linear_slope;

/// Shape of a revenue series across activity runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendPattern {
    /// Deep interior dip followed by a strong recovery.
    #[serde(rename = "V型反转")]
    VReversal,
    #[serde(rename = "上升通道")]
    Uptrend,
    /// Falling or flat first half, rising second half.
    #[serde(rename = "触底回升")]
    BottomingOut,
    #[serde(rename = "下降通道")]
    Downtrend,
    /// Rising or flat first half, falling second half.
    #[serde(rename = "冲高回落")]
    PeakPullback,
    #[serde(rename = "横盘震荡")]
    Sideways,
    #[serde(rename = "数据不足")]
    InsufficientData,
}

impl TrendPattern {
    pub fn label(&self) -> &'static str {
        match self {
            TrendPattern::VReversal => "V型反转",
            TrendPattern::Uptrend => "上升通道",
            TrendPattern::BottomingOut => "触底回升",
            TrendPattern::Downtrend => "下降通道",
            TrendPattern::PeakPullback => "冲高回落",
            TrendPattern::Sideways => "横盘震荡",
            TrendPattern::InsufficientData => "数据不足",
        }
    }
}

impl std::fmt::Display for TrendPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies a series: V-shape first, then the slopes of its leading and
/// recent halves (odd lengths share the middle point).
#[derive(Debug, Clone)]
pub struct TrendClassifier {
    /// Relative drop from the first point to the minimum required for a V.
    v_drop_ratio: f64,
    /// Relative rise from the minimum to the last point required for a V.
    v_rise_ratio: f64,
}

impl TrendClassifier {
    pub fn new() -> Self {
        Self {
            v_drop_ratio: 0.3,
            v_rise_ratio: 0.3,
        }
    }

    pub fn with_config(config: &PaymentThresholds) -> Self {
        Self {
            v_drop_ratio: config.v_drop_ratio,
            v_rise_ratio: config.v_rise_ratio,
        }
    }

    pub fn classify(&self, values: &[f64]) -> TrendPattern {
        let n = values.len();
        if n < 3 {
            return TrendPattern::InsufficientData;
        }
        if self.is_v_shape(values) {
            return TrendPattern::VReversal;
        }

        let lead = linear_slope(&values[..n - n / 2]);
        let recent = linear_slope(&values[n / 2..]);
        debug!(lead, recent, "trend slopes");

        if recent > 0.0 {
            if lead > 0.0 {
                TrendPattern::Uptrend
            } else {
                TrendPattern::BottomingOut
            }
        } else if recent < 0.0 {
            if lead < 0.0 {
                TrendPattern::Downtrend
            } else {
                TrendPattern::PeakPullback
            }
        } else {
            TrendPattern::Sideways
        }
    }

    fn is_v_shape(&self, values: &[f64]) -> bool {
        let (min_idx, min) = values
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::INFINITY), |best, (i, v)| if v < best.1 { (i, v) } else { best });
        if min_idx == 0 || min_idx == values.len() - 1 {
            return false;
        }
        let first = values[0];
        let last = values[values.len() - 1];
        if first <= 0.0 {
            return false;
        }
        let drop = (first - min) / first;
        let rise = if min > 0.0 {
            (last - min) / min
        } else if last > min {
            f64::INFINITY
        } else {
            0.0
        };
        drop > self.v_drop_ratio && rise > self.v_rise_ratio
    }
}

impl Default for TrendClassifier {
    fn default() -> Self {
        Self::new()
    }
}
