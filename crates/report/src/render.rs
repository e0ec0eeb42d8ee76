//! Minijinja rendering of the two report dialects.
//!
//! Both templates are compiled into the binary and registered once per
//! [`ReportRenderer`]. They receive the same context, so the two dialects
//! always carry identical content: executive summary, meta table, the
//! seven module sections in report order, and the tiered action list.

use std::path::PathBuf;

use minijinja::Environment;
use serde::Serialize;

use review_core::{AnalysisResult, InputDocument, Severity};

use crate::actions::{ActionPlan, NO_ACTIONS};
use crate::error::ReportError;
use crate::summary::ExecutiveSummary;

const NOTION_TEMPLATE: &str = "notion.md";
const WIKI_TEMPLATE: &str = "wiki.md";

/// Knobs that only affect presentation.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Directory holding rendered charts. Notion sections link a chart only
    /// when its file exists here.
    pub chart_dir: Option<PathBuf>,
    /// Footer timestamp; the local time of rendering when unset.
    pub generated_at: Option<String>,
}

// ── Template context ──────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MetaContext<'a> {
    event_name: &'a str,
    event_type: &'a str,
    period: String,
    benchmarks: String,
    change_description: &'a str,
}

#[derive(Debug, Serialize)]
struct SectionContext<'a> {
    title: &'static str,
    severity: Severity,
    conclusion: &'a str,
    details: &'a [String],
    suggestions: &'a [String],
    chart_file: &'static str,
    chart_ready: bool,
}

#[derive(Debug, Serialize)]
struct ReportContext<'a> {
    title: String,
    summary: &'a ExecutiveSummary,
    distribution: String,
    meta: MetaContext<'a>,
    sections: Vec<SectionContext<'a>>,
    actions: &'a ActionPlan,
    empty_message: Option<&'static str>,
    generated_at: String,
}

// ── Renderer ──────────────────────────────────────────────────

pub struct ReportRenderer {
    env: Environment<'static>,
}

impl ReportRenderer {
    pub fn new() -> Result<Self, ReportError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_filter("severity_color", severity_color);
        env.add_template(NOTION_TEMPLATE, include_str!("../templates/notion.md.j2"))?;
        env.add_template(WIKI_TEMPLATE, include_str!("../templates/wiki.md.j2"))?;
        Ok(Self { env })
    }

    /// Render the Notion dialect: callouts, colored spans and a `<table>` meta block.
    pub fn render_notion(
        &self,
        doc: &InputDocument,
        results: &[AnalysisResult],
        options: &ReportOptions,
    ) -> Result<String, ReportError> {
        self.render(NOTION_TEMPLATE, doc, results, options)
    }

    /// Render the Wiki dialect: plain headers, blockquotes and tables only.
    pub fn render_wiki(
        &self,
        doc: &InputDocument,
        results: &[AnalysisResult],
        options: &ReportOptions,
    ) -> Result<String, ReportError> {
        self.render(WIKI_TEMPLATE, doc, results, options)
    }

    fn render(
        &self,
        name: &str,
        doc: &InputDocument,
        results: &[AnalysisResult],
        options: &ReportOptions,
    ) -> Result<String, ReportError> {
        let summary = ExecutiveSummary::from_results(results);
        let actions = ActionPlan::from_results(results);
        let ctx = ReportContext {
            title: doc.report_title(),
            distribution: summary.distribution(),
            summary: &summary,
            meta: meta_context(doc),
            sections: results.iter().map(|r| section_context(r, options)).collect(),
            actions: &actions,
            empty_message: actions.is_empty().then_some(NO_ACTIONS),
            generated_at: options
                .generated_at
                .clone()
                .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()),
        };
        Ok(self.env.get_template(name)?.render(&ctx)?)
    }
}

fn meta_context(doc: &InputDocument) -> MetaContext<'_> {
    let meta = &doc.meta;
    let names: Vec<String> = doc.benchmark_names().into_iter().collect();
    MetaContext {
        event_name: &meta.event_name,
        event_type: meta.event_type.as_deref().unwrap_or(""),
        period: format!(
            "{} ~ {}",
            meta.event_start_date.as_deref().unwrap_or(""),
            meta.event_end_date.as_deref().unwrap_or("")
        ),
        benchmarks: names.join("、"),
        change_description: &meta.change_description,
    }
}

fn section_context<'a>(r: &'a AnalysisResult, options: &ReportOptions) -> SectionContext<'a> {
    let chart_file = r.module.chart_file();
    SectionContext {
        title: r.module.section_title(),
        severity: r.severity,
        conclusion: &r.conclusion,
        details: &r.details,
        suggestions: &r.suggestions,
        chart_file,
        chart_ready: options
            .chart_dir
            .as_ref()
            .is_some_and(|dir| dir.join(chart_file).exists()),
    }
}

/// Notion span color for a severity label.
fn severity_color(label: String) -> String {
    let color = match label.parse::<Severity>() {
        Ok(Severity::Normal) => "green",
        Ok(Severity::Watch) => "orange",
        Ok(Severity::Anomalous | Severity::Critical) => "red",
        Err(_) => "default",
    };
    color.to_string()
}
