use review_core::{AnalysisResult, InputDocument, Module};

/// Error type for a single analyzer run.
///
/// The engine never propagates these: each one becomes a degraded
/// "数据不足" result for the module so the rest of the report still renders.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("computation failed: {0}")]
    Computation(String),
    #[error("chart payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One analysis dimension over a validated input document.
///
/// Implementations read only their own block plus `meta`, hold no mutable
/// state, and may run in any order.
pub trait Analyzer: Send + Sync {
    /// Which report section this analyzer fills.
    fn module(&self) -> Module;

    /// Analyze the document, returning the module's graded finding.
    fn analyze(&self, doc: &InputDocument) -> Result<AnalysisResult, AnalyzeError>;
}

/// Reject NaN/infinite intermediate values before they reach a payload.
pub(crate) fn ensure_finite(label: &str, value: f64) -> Result<f64, AnalyzeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalyzeError::Computation(format!("{label} is not finite")))
    }
}
