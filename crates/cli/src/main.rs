mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use review_core::config::load_dotenv;
use review_core::{read_json_file, Config};
use review_report::{run_analysis_with, write_reports, PipelineError, ReportOptions};
use review_rules::{load_thresholds, Thresholds};

use crate::cli::CliArgs;

fn main() -> Result<()> {
    load_dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    config.log_summary();

    let thresholds = match args.thresholds.as_ref().or(config.analysis.thresholds_path.as_ref()) {
        Some(path) => load_thresholds(path)
            .with_context(|| format!("failed to load thresholds from {}", path.display()))?,
        None => Thresholds::default(),
    };

    let input = read_json_file(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    info!(input = %args.input.display(), "analyzing");

    let options = ReportOptions {
        chart_dir: args.chart_dir.clone(),
        generated_at: None,
    };
    let output = match run_analysis_with(input, &thresholds, &options) {
        Ok(output) => output,
        Err(PipelineError::Validation(result)) => bail!("input rejected\n{}", result.summary()),
        Err(e) => return Err(e).context("analysis failed"),
    };
    for warning in &output.warnings {
        warn!("{warning}");
    }

    println!("{}", output.notion_title);
    for r in &output.analysis_results {
        println!("  {} {}: {} ({})", r.severity.marker(), r.module_name, r.conclusion, r.severity);
    }

    let dir = args.output_dir.unwrap_or(config.output.dir);
    let write_json = config.output.write_json && !args.no_json;
    let written = write_reports(&output, &dir, write_json)
        .with_context(|| format!("failed to write reports to {}", dir.display()))?;

    println!("Notion report: {}", written.notion.display());
    println!("Wiki report:   {}", written.wiki.display());
    if let (Some(results), Some(charts)) = (&written.analysis_json, &written.chart_json) {
        println!("Results:       {}", results.display());
        println!("Chart data:    {}", charts.display());
    }
    Ok(())
}
