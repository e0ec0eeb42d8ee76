//! Validation with structured, block-qualified errors.
//!
//! Validates raw review input documents (required blocks, list lengths,
//! numeric ranges) and `AnalysisThresholds` configs. Returns a
//! [`ValidationResult`] with errors (block analysis) and warnings (advisory).
//! Every problem is collected, so one correction pass can fix the source.

pub(crate) mod config_checks;
mod input_checks;

mod fuzzy;

use std::fmt;

use review_core::InputDocument;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::thresholds::ThresholdsRule;

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// JSON-path-like location, e.g. `"payment_overview.time_series[2].revenue"`.
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

/// Top-level segment of a path: `"a.b[0].c"` → `"a"`.
fn block_of(path: &str) -> &str {
    let end = path.find(|c: char| c == '.' || c == '[').unwrap_or(path.len());
    &path[..end]
}

impl ValidationError {
    pub fn block(&self) -> &str {
        block_of(&self.path)
    }
}

impl ValidationWarning {
    pub fn block(&self) -> &str {
        block_of(&self.path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.block(), self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.block(), self.message)
    }
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// All errors on one line each, suitable for a single user-facing report.
    pub fn summary(&self) -> String {
        let mut out = format!("{} validation error(s):", self.errors.len());
        for error in &self.errors {
            out.push_str("\n  - ");
            out.push_str(&error.to_string());
        }
        out
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// A document that passed validation, with any advisory warnings.
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pub document: InputDocument,
    pub warnings: Vec<ValidationWarning>,
}

/// Validate a raw input document without converting it.
pub fn validate_input(value: &serde_json::Value) -> ValidationResult {
    let mut result = ValidationResult::new();
    input_checks::validate_document(value, &mut result);
    debug!(
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "input validation complete"
    );
    result
}

/// Validate a raw input document and convert it into typed records.
///
/// Returns the whole [`ValidationResult`] when any error is found.
pub fn into_document(value: serde_json::Value) -> Result<ValidatedInput, ValidationResult> {
    let mut result = validate_input(&value);
    if !result.valid {
        return Err(result);
    }
    for warning in &result.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    match InputDocument::from_value(value) {
        Ok(document) => Ok(ValidatedInput {
            document,
            warnings: result.warnings,
        }),
        Err(e) => {
            result.error("document", format!("document does not match the input schema: {e}"));
            Err(result)
        }
    }
}

/// Validate a parsed [`ThresholdsRule`].
pub fn validate_thresholds_rule(rule: &ThresholdsRule) -> ValidationResult {
    let mut result = ValidationResult::new();
    config_checks::validate_thresholds(rule, &mut result);
    result
}

/// Parse raw YAML and validate. Returns parse errors merged with validation errors.
pub fn validate_thresholds_yaml(yaml: &str) -> ValidationResult {
    match serde_yaml::from_str::<ThresholdsRule>(yaml) {
        Ok(rule) => validate_thresholds_rule(&rule),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error("", format!("YAML parse error: {e}"));
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_block_qualified() {
        let mut result = ValidationResult::new();
        result.error(
            "payment_overview.time_series",
            "time_series requires at least 6 entries, got 3",
        );
        assert_eq!(
            result.errors[0].to_string(),
            "[payment_overview] time_series requires at least 6 entries, got 3"
        );
        assert!(!result.valid);
    }

    #[test]
    fn block_of_handles_indexes() {
        assert_eq!(block_of("gift_packages[0].price"), "gift_packages");
        assert_eq!(block_of("meta"), "meta");
        assert_eq!(block_of(""), "");
    }

    #[test]
    fn warnings_do_not_invalidate() {
        let mut result = ValidationResult::new();
        result.warn("reach_conversion.stages", "users increase");
        assert!(result.valid);
        assert_eq!(result.warnings[0].block(), "reach_conversion");
    }

    #[test]
    fn summary_lists_every_error() {
        let mut result = ValidationResult::new();
        result.error("meta.event_name", "event_name is required");
        result.error_with_suggestion(
            "gift_packages",
            "missing required block",
            "did you mean 'gift_packages'?",
        );
        let summary = result.summary();
        assert!(summary.starts_with("2 validation error(s):"));
        assert!(summary.contains("[meta] event_name is required"));
        assert!(summary.contains("(did you mean 'gift_packages'?)"));
    }

    #[test]
    fn validate_thresholds_yaml_reports_parse_errors() {
        let result = validate_thresholds_yaml("apiVersion: [");
        assert!(!result.valid);
        assert!(result.errors[0].message.starts_with("YAML parse error"));
    }
}
