use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::error::ReportError;
use crate::pipeline::AnalysisOutput;

/// Paths of the files written for one run.
#[derive(Debug, Clone)]
pub struct WrittenReports {
    pub notion: PathBuf,
    pub wiki: PathBuf,
    pub analysis_json: Option<PathBuf>,
    pub chart_json: Option<PathBuf>,
}

#[derive(Serialize)]
struct ChartEntry<'a> {
    chart_file: &'a str,
    data: &'a serde_json::Value,
}

/// Replace path separators, colons and spaces so a report title can be a file name.
pub fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

/// Write both markdown reports and, when `write_json` is set, the
/// `analysis_results.json` and `chart_data.json` side files.
///
/// The directory is created if missing. Failures surface as I/O errors.
pub fn write_reports(
    output: &AnalysisOutput,
    dir: &Path,
    write_json: bool,
) -> Result<WrittenReports, ReportError> {
    fs::create_dir_all(dir)?;
    let stem = safe_name(&output.notion_title);

    let notion = dir.join(format!("{stem}.md"));
    fs::write(&notion, &output.notion_markdown)?;
    let wiki = dir.join(format!("{stem}_wiki.md"));
    fs::write(&wiki, &output.wiki_markdown)?;

    let (analysis_json, chart_json) = if write_json {
        let analysis_path = dir.join("analysis_results.json");
        fs::write(
            &analysis_path,
            serde_json::to_string_pretty(&output.analysis_results)?,
        )?;

        let charts: IndexMap<&str, ChartEntry<'_>> = output
            .chart_payloads
            .iter()
            .map(|p| {
                (
                    p.module_name.as_str(),
                    ChartEntry {
                        chart_file: &p.chart_file,
                        data: &p.data,
                    },
                )
            })
            .collect();
        let chart_path = dir.join("chart_data.json");
        fs::write(&chart_path, serde_json::to_string_pretty(&charts)?)?;
        (Some(analysis_path), Some(chart_path))
    } else {
        (None, None)
    };

    info!(dir = %dir.display(), json = write_json, "reports written");
    Ok(WrittenReports {
        notion,
        wiki,
        analysis_json,
        chart_json,
    })
}
