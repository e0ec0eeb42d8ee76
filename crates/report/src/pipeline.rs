use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use review_compute::AnalysisEngine;
use review_core::{AnalysisResult, Module};
use review_rules::{into_document, Thresholds, ValidationWarning};

use crate::error::PipelineError;
use crate::render::{ReportOptions, ReportRenderer};

/// Chart input for one module, handed to the external renderer.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload {
    pub module: Module,
    pub module_name: String,
    pub chart_file: String,
    pub data: serde_json::Value,
}

impl ChartPayload {
    fn from_result(result: &AnalysisResult) -> Self {
        Self {
            module: result.module,
            module_name: result.module_name.clone(),
            chart_file: result.module.chart_file().to_string(),
            data: result.chart_data.clone(),
        }
    }
}

/// Everything one review run produces.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// One result per module, in report order.
    pub analysis_results: Vec<AnalysisResult>,
    pub chart_payloads: Vec<ChartPayload>,
    pub notion_title: String,
    pub notion_markdown: String,
    pub wiki_markdown: String,
    /// Advisory validation findings that did not block the run.
    pub warnings: Vec<ValidationWarning>,
}

/// Validate, analyze and render with the built-in thresholds.
pub fn run_analysis(input: serde_json::Value) -> Result<AnalysisOutput, PipelineError> {
    run_analysis_with(input, &Thresholds::default(), &ReportOptions::default())
}

/// Validate `input`, run the seven analyzers and render both report dialects.
///
/// Validation errors abort the run before any analyzer executes and come
/// back all at once. Analyzer failures never abort it: the affected module
/// is reported as data-insufficient instead.
pub fn run_analysis_with(
    input: serde_json::Value,
    thresholds: &Thresholds,
    options: &ReportOptions,
) -> Result<AnalysisOutput, PipelineError> {
    let start = Instant::now();

    let validated = into_document(input).map_err(|result| {
        warn!(errors = result.errors.len(), "input rejected");
        PipelineError::Validation(result)
    })?;
    let doc = validated.document;
    info!(
        event = %doc.meta.event_name,
        warnings = validated.warnings.len(),
        "[1/3] input validated"
    );

    let mut results = AnalysisEngine::standard(thresholds).run_all(&doc);
    results.sort_by_key(|r| r.module);
    info!(modules = results.len(), "[2/3] analysis finished");

    let renderer = ReportRenderer::new()?;
    let notion_markdown = renderer.render_notion(&doc, &results, options)?;
    let wiki_markdown = renderer.render_wiki(&doc, &results, options)?;
    info!(
        notion_bytes = notion_markdown.len(),
        wiki_bytes = wiki_markdown.len(),
        "[3/3] reports rendered in {:.1}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(AnalysisOutput {
        chart_payloads: results.iter().map(ChartPayload::from_result).collect(),
        analysis_results: results,
        notion_title: doc.report_title(),
        notion_markdown,
        wiki_markdown,
        warnings: validated.warnings,
    })
}
