use std::path::PathBuf;

use clap::Parser;

/// Event review report generator.
///
/// Validates a review input document, runs the seven analysis modules and
/// writes the Notion and Wiki markdown reports.
#[derive(Parser, Debug)]
#[command(name = "event-review", version, about)]
pub struct CliArgs {
    /// Input document (JSON).
    #[arg(long, short)]
    pub input: PathBuf,

    /// Directory receiving the reports (overrides REVIEW_OUTPUT_DIR).
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,

    /// AnalysisThresholds YAML (overrides REVIEW_THRESHOLDS).
    #[arg(long)]
    pub thresholds: Option<PathBuf>,

    /// Directory with rendered charts, linked from the Notion report when present.
    #[arg(long)]
    pub chart_dir: Option<PathBuf>,

    /// Skip analysis_results.json and chart_data.json.
    #[arg(long)]
    pub no_json: bool,
}
