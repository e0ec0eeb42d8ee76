//! Report assembly for the seven-dimension review.
//!
//! Turns the ordered analysis results into an executive summary, a
//! P0/P1/P2 action plan and two markdown dialects (Notion and Wiki), and
//! exposes the [`run_analysis`] entry point that drives the whole pass.

pub mod actions;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod summary;

pub use actions::ActionPlan;
pub use error::{PipelineError, ReportError};
pub use output::{safe_name, write_reports, WrittenReports};
pub use pipeline::{run_analysis, run_analysis_with, AnalysisOutput, ChartPayload};
pub use render::{ReportOptions, ReportRenderer};
pub use summary::ExecutiveSummary;
