pub mod algorithms;
pub mod analyzer;
pub mod analyzers;
pub mod engine;
pub mod format;

pub use algorithms::stats::{change_rate, detect_anomaly, severity_from_change};
pub use algorithms::trend::{TrendClassifier, TrendPattern};
pub use analyzer::{AnalyzeError, Analyzer};
pub use engine::AnalysisEngine;
