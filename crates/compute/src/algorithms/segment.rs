//! Schema-free segmentation of price tiers into named buckets.
//!
//! Buckets are contiguous runs of the price-sorted tiers, so every price
//! belongs to exactly one bucket and bucket ranges never overlap.

use serde::{Deserialize, Serialize};
use tracing::debug;

use review_core::PriceTier;
use review_rules::thresholds::ConversionThresholds;

/// How the final buckets were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentMethod {
    /// Split wherever adjacent payer decay exceeds the cliff threshold.
    Cliff,
    /// Equal-width bands in log10(price).
    LogEqual,
    /// Near-equal tier counts; last resort for degenerate price spreads.
    EqualCount,
}

impl SegmentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            SegmentMethod::Cliff => "断崖切分",
            SegmentMethod::LogEqual => "对数等宽",
            SegmentMethod::EqualCount => "等量切分",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    /// Display name, e.g. `"中额(68-128)"`.
    pub label: String,
    pub low: f64,
    pub high: f64,
    /// Half-open index range into the sorted tiers.
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub method: SegmentMethod,
    pub buckets: Vec<PriceBucket>,
}

impl Segmentation {
    /// Bucket receiving an arbitrary price: the last bucket whose lower bound
    /// is at or below it, else the first.
    pub fn bucket_for(&self, price: f64) -> usize {
        self.buckets
            .iter()
            .rposition(|b| b.low <= price)
            .unwrap_or(0)
    }
}

/// Sort by price and fold tiers sharing a price into one.
pub fn merge_sorted(tiers: &[PriceTier]) -> Vec<PriceTier> {
    let mut sorted = tiers.to_vec();
    sorted.sort_by(|a, b| a.price.total_cmp(&b.price));
    let mut merged: Vec<PriceTier> = Vec::with_capacity(sorted.len());
    for tier in sorted {
        match merged.last_mut() {
            Some(last) if last.price == tier.price => {
                last.purchases += tier.purchases;
                last.payers += tier.payers;
            }
            _ => merged.push(tier),
        }
    }
    merged
}

#[derive(Debug, Clone)]
pub struct PriceSegmenter {
    cliff_decay: f64,
    min_buckets: usize,
    max_buckets: usize,
}

impl PriceSegmenter {
    pub fn new() -> Self {
        Self::with_config(&ConversionThresholds::default())
    }

    pub fn with_config(config: &ConversionThresholds) -> Self {
        Self {
            cliff_decay: config.cliff_decay,
            min_buckets: config.min_buckets.max(2),
            max_buckets: config.max_buckets.max(config.min_buckets.max(2)),
        }
    }

    /// Segment tiers that are already sorted by strictly increasing price
    /// (see [`merge_sorted`]).
    pub fn segment(&self, tiers: &[PriceTier]) -> Segmentation {
        let n = tiers.len();
        if n < 2 {
            return self.finish(tiers, SegmentMethod::EqualCount, vec![(0, n)]);
        }

        let cliff = self.cliff_runs(tiers);
        if (self.min_buckets..=self.max_buckets).contains(&cliff.len()) {
            return self.finish(tiers, SegmentMethod::Cliff, cliff);
        }

        let groups = (n / 2).clamp(3, 5);
        if let Some(runs) = log_equal_runs(tiers, groups) {
            if (self.min_buckets..=self.max_buckets).contains(&runs.len()) {
                return self.finish(tiers, SegmentMethod::LogEqual, runs);
            }
        }

        let k = 3.min(n).clamp(self.min_buckets.min(n), self.max_buckets);
        self.finish(tiers, SegmentMethod::EqualCount, equal_count_runs(n, k))
    }

    fn cliff_runs(&self, tiers: &[PriceTier]) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut start = 0;
        for i in 1..tiers.len() {
            let prev = tiers[i - 1].payers;
            let decay = if prev > 0.0 { (prev - tiers[i].payers) / prev } else { 0.0 };
            if decay > self.cliff_decay {
                runs.push((start, i));
                start = i;
            }
        }
        runs.push((start, tiers.len()));
        runs
    }

    fn finish(
        &self,
        tiers: &[PriceTier],
        method: SegmentMethod,
        runs: Vec<(usize, usize)>,
    ) -> Segmentation {
        let names = bucket_names(runs.len());
        let buckets: Vec<PriceBucket> = runs
            .into_iter()
            .filter(|(start, end)| end > start)
            .zip(names)
            .map(|((start, end), name)| {
                let low = tiers[start].price;
                let high = tiers[end - 1].price;
                let range = if low == high {
                    fmt_price(low)
                } else {
                    format!("{}-{}", fmt_price(low), fmt_price(high))
                };
                PriceBucket {
                    label: format!("{name}({range})"),
                    low,
                    high,
                    start,
                    end,
                }
            })
            .collect();
        debug!(method = ?method, buckets = buckets.len(), "price tiers segmented");
        Segmentation { method, buckets }
    }
}

impl Default for PriceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Log-equal bands with empty bands dropped. `None` when a price is not positive
/// or all prices are equal.
fn log_equal_runs(tiers: &[PriceTier], groups: usize) -> Option<Vec<(usize, usize)>> {
    let first = tiers.first()?.price;
    let last = tiers.last()?.price;
    if first <= 0.0 || last <= first {
        return None;
    }
    let lo = first.log10();
    let step = (last.log10() - lo) / groups as f64;

    let mut runs = Vec::new();
    let mut start = 0;
    let mut current_band = 0;
    for (i, tier) in tiers.iter().enumerate() {
        let band = (((tier.price.log10() - lo) / step).floor() as usize).min(groups - 1);
        if i > 0 && band != current_band {
            runs.push((start, i));
            start = i;
        }
        current_band = band;
    }
    runs.push((start, tiers.len()));
    Some(runs)
}

fn equal_count_runs(n: usize, k: usize) -> Vec<(usize, usize)> {
    let k = k.max(1);
    let mut runs = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let end = start + n / k + usize::from(i < n % k);
        runs.push((start, end));
        start = end;
    }
    runs
}

/// Names spread across the low→high scale for the bucket count.
fn bucket_names(k: usize) -> Vec<String> {
    let names: &[&str] = match k {
        1 => &["全价位"],
        2 => &["低额", "高额"],
        3 => &["低额", "中额", "高额"],
        4 => &["低额", "中低额", "中高额", "高额"],
        5 => &["低额", "中低额", "中额", "中高额", "高额"],
        6 => &["低额", "中低额", "中额", "中高额", "高额", "超高额"],
        _ => return (1..=k).map(|i| format!("档位{i}")).collect(),
    };
    names.iter().map(|s| s.to_string()).collect()
}

fn fmt_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        format!("{price}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers(spec: &[(f64, f64)]) -> Vec<PriceTier> {
        spec.iter()
            .map(|&(price, payers)| PriceTier { price, purchases: payers, payers })
            .collect()
    }

    fn assert_partition(tiers: &[PriceTier], seg: &Segmentation) {
        assert!((2..=6).contains(&seg.buckets.len()), "{} buckets", seg.buckets.len());
        let mut expected_start = 0;
        for bucket in &seg.buckets {
            assert_eq!(bucket.start, expected_start);
            assert!(bucket.end > bucket.start);
            expected_start = bucket.end;
        }
        assert_eq!(expected_start, tiers.len());
        for pair in seg.buckets.windows(2) {
            assert!(pair[0].high < pair[1].low);
        }
        for (i, tier) in tiers.iter().enumerate() {
            let owners = seg
                .buckets
                .iter()
                .filter(|b| b.low <= tier.price && tier.price <= b.high)
                .count();
            assert_eq!(owners, 1, "price {} at {}", tier.price, i);
        }
    }

    #[test]
    fn cliffs_split_buckets() {
        let t = tiers(&[
            (6.0, 5000.0),
            (30.0, 4000.0),
            (68.0, 3200.0),
            (128.0, 1500.0),
            (328.0, 1200.0),
            (648.0, 500.0),
        ]);
        let seg = PriceSegmenter::new().segment(&t);
        assert_eq!(seg.method, SegmentMethod::Cliff);
        let ranges: Vec<(usize, usize)> = seg.buckets.iter().map(|b| (b.start, b.end)).collect();
        assert_eq!(ranges, vec![(0, 3), (3, 5), (5, 6)]);
        assert_eq!(seg.buckets[0].label, "低额(6-68)");
        assert_eq!(seg.buckets[2].label, "高额(648)");
        assert_partition(&t, &seg);
    }

    #[test]
    fn smooth_decay_falls_back_to_log_bands() {
        let t = tiers(&[
            (1.0, 1000.0),
            (3.0, 900.0),
            (6.0, 800.0),
            (12.0, 700.0),
            (30.0, 600.0),
            (68.0, 550.0),
            (128.0, 500.0),
            (328.0, 450.0),
            (648.0, 400.0),
        ]);
        let seg = PriceSegmenter::new().segment(&t);
        assert_eq!(seg.method, SegmentMethod::LogEqual);
        assert_partition(&t, &seg);
    }

    #[test]
    fn every_step_a_cliff_exceeds_max_buckets() {
        let t = tiers(&[
            (1.0, 10000.0),
            (2.0, 5000.0),
            (4.0, 2500.0),
            (8.0, 1200.0),
            (16.0, 600.0),
            (32.0, 300.0),
            (64.0, 150.0),
            (128.0, 70.0),
        ]);
        let seg = PriceSegmenter::new().segment(&t);
        assert_ne!(seg.method, SegmentMethod::Cliff);
        assert_partition(&t, &seg);
    }

    #[test]
    fn zero_price_uses_equal_count() {
        let t = tiers(&[(0.0, 100.0), (6.0, 95.0), (30.0, 90.0), (68.0, 85.0)]);
        let seg = PriceSegmenter::new().segment(&t);
        assert_eq!(seg.method, SegmentMethod::EqualCount);
        assert_partition(&t, &seg);
    }

    #[test]
    fn partition_holds_across_shapes() {
        // deterministic pseudo-random price ladders
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };
        for _ in 0..200 {
            let n = 3 + (next() % 12) as usize;
            let mut price = 1.0;
            let mut payers = 10_000.0;
            let mut raw = Vec::with_capacity(n);
            for _ in 0..n {
                price += 1.0 + (next() % 300) as f64;
                payers *= 0.3 + (next() % 70) as f64 / 100.0;
                raw.push((price, payers.round()));
            }
            let t = merge_sorted(&tiers(&raw));
            let seg = PriceSegmenter::new().segment(&t);
            assert_partition(&t, &seg);
        }
    }

    #[test]
    fn merge_sorted_folds_duplicate_prices() {
        let t = tiers(&[(30.0, 10.0), (6.0, 50.0), (30.0, 5.0)]);
        let merged = merge_sorted(&t);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].price, 6.0);
        assert_eq!(merged[1].payers, 15.0);
    }

    #[test]
    fn bucket_for_assigns_gaps_to_lower_bucket() {
        let t = tiers(&[
            (6.0, 5000.0),
            (30.0, 4000.0),
            (68.0, 3200.0),
            (128.0, 1500.0),
            (328.0, 1200.0),
            (648.0, 500.0),
        ]);
        let seg = PriceSegmenter::new().segment(&t);
        assert_eq!(seg.bucket_for(1.0), 0);
        assert_eq!(seg.bucket_for(98.0), 0);
        assert_eq!(seg.bucket_for(128.0), 1);
        assert_eq!(seg.bucket_for(1000.0), 2);
    }

    #[test]
    fn bucket_names_spread() {
        assert_eq!(bucket_names(2), vec!["低额", "高额"]);
        assert_eq!(bucket_names(7)[6], "档位7");
    }
}
