use review_rules::ValidationResult;

/// Errors raised while rendering or writing reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a whole analysis run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input was rejected; carries every problem found.
    #[error("{0}")]
    Validation(ValidationResult),

    #[error(transparent)]
    Report(#[from] ReportError),
}
