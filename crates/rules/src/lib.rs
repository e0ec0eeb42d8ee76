//! Input validation and analysis threshold configuration.
//!
//! This crate provides:
//! - Block-qualified validation of raw review input documents
//! - The `AnalysisThresholds` YAML config kind with defaults and checks

pub mod error;
pub mod thresholds;
pub mod validation;

pub use error::{Result, RuleError};
pub use thresholds::{load_thresholds, Thresholds, ThresholdsRule};
pub use validation::{
    into_document, validate_input, ValidatedInput, ValidationError, ValidationResult,
    ValidationWarning,
};
