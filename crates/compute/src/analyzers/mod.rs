//! The seven analysis dimensions.
//!
//! Each analyzer reads one input block (plus `meta`) and produces an
//! [`AnalysisResult`](review_core::AnalysisResult) with a typed chart payload.
//! Wherever a block carries a list of benchmarks, the first entry is primary
//! and drives severity; later entries only add detail lines.

pub mod behavior;
pub mod conversion;
pub mod package;
pub mod payment_overview;
pub mod r_tier;
pub mod reach;
pub mod reward;

pub use behavior::BehaviorAnalyzer;
pub use conversion::ConversionAnalyzer;
pub use package::PackageAnalyzer;
pub use payment_overview::PaymentOverviewAnalyzer;
pub use r_tier::RTierAnalyzer;
pub use reach::ReachAnalyzer;
pub use reward::RewardAnalyzer;
