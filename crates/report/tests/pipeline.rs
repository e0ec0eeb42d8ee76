use std::path::Path;

use review_core::{Module, Severity};
use review_report::{run_analysis, run_analysis_with, write_reports, PipelineError, ReportOptions};
use review_rules::load_thresholds;

const SAMPLE: &str = include_str!("../../../data/samples/spring_festival.json");

fn sample() -> serde_json::Value {
    serde_json::from_str(SAMPLE).unwrap()
}

fn fixed_time() -> ReportOptions {
    ReportOptions {
        chart_dir: None,
        generated_at: Some("2025-02-12 10:00".into()),
    }
}

#[test]
fn sample_run_produces_seven_ordered_results() {
    let output = run_analysis(sample()).unwrap();

    let modules: Vec<Module> = output.analysis_results.iter().map(|r| r.module).collect();
    assert_eq!(modules, Module::ORDER.to_vec());
    assert!(output
        .analysis_results
        .iter()
        .all(|r| r.severity == Severity::Normal));
    assert!(output.warnings.is_empty());

    assert_eq!(output.notion_title, "2025春节活动 复盘报告");
    assert_eq!(output.chart_payloads.len(), 7);
    assert_eq!(output.chart_payloads[2].chart_file, "3_Payment_Overview.png");
    assert_eq!(output.chart_payloads[2].data["current_index"], 5);

    assert!(output.notion_markdown.contains("**Executive Summary**: 整体表现良好"));
    assert!(output.wiki_markdown.starts_with("# 2025春节活动 复盘报告"));
    assert!(output.wiki_markdown.contains("## 综合建议"));
}

#[test]
fn missing_behavior_block_degrades_one_module() {
    let mut input = sample();
    input.as_object_mut().unwrap().remove("behavior_data");
    let output = run_analysis_with(input, &Default::default(), &fixed_time()).unwrap();

    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].block(), "behavior_data");

    let behavior = &output.analysis_results[1];
    assert_eq!(behavior.module, Module::Behavior);
    assert_eq!(behavior.severity, Severity::Watch);
    assert_eq!(behavior.conclusion, "行为分析数据不足，跳过分析");
    assert!(output.wiki_markdown.contains("> [关注] 行为分析数据不足，跳过分析"));

    let others = output
        .analysis_results
        .iter()
        .filter(|r| r.module != Module::Behavior);
    assert!(others.into_iter().all(|r| r.severity == Severity::Normal));
}

#[test]
fn invalid_input_returns_every_error() {
    let mut input = sample();
    input["payment_overview"]["time_series"]
        .as_array_mut()
        .unwrap()
        .truncate(3);
    input["meta"]["change_description"] = serde_json::json!("");

    match run_analysis(input) {
        Err(PipelineError::Validation(result)) => {
            assert!(!result.valid);
            assert_eq!(result.errors.len(), 2, "{}", result.summary());
            let text = result.summary();
            assert!(
                text.contains("[payment_overview] time_series requires at least 6 entries, got 3")
            );
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn shipped_thresholds_match_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/thresholds.yml");
    let thresholds = load_thresholds(&path).unwrap();
    let with_file = run_analysis_with(sample(), &thresholds, &fixed_time()).unwrap();
    let with_defaults = run_analysis_with(sample(), &Default::default(), &fixed_time()).unwrap();
    assert_eq!(with_file.notion_markdown, with_defaults.notion_markdown);
}

#[test]
fn reports_are_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_analysis_with(sample(), &Default::default(), &fixed_time()).unwrap();
    let written = write_reports(&output, dir.path(), true).unwrap();

    assert_eq!(written.notion, dir.path().join("2025春节活动_复盘报告.md"));
    assert_eq!(written.wiki, dir.path().join("2025春节活动_复盘报告_wiki.md"));
    let notion = std::fs::read_to_string(&written.notion).unwrap();
    assert_eq!(notion, output.notion_markdown);

    let read_json = |path: Option<std::path::PathBuf>| -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path.unwrap()).unwrap()).unwrap()
    };
    let charts = read_json(written.chart_json);
    assert_eq!(charts["触达分析"]["chart_file"], "1_Reach_Funnel.png");
    assert_eq!(charts.as_object().unwrap().len(), 7);

    let results = read_json(written.analysis_json);
    assert_eq!(results[6]["module_name"], "礼包分析");
    assert_eq!(results[6]["severity"], "正常");
}

#[test]
fn json_side_files_are_optional() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("out/run1");
    let output = run_analysis_with(sample(), &Default::default(), &fixed_time()).unwrap();
    let written = write_reports(&output, &nested, false).unwrap();

    assert!(written.analysis_json.is_none());
    assert!(written.notion.exists());
    assert!(!nested.join("chart_data.json").exists());
}
