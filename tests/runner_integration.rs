//! Integration tests for the scan runner and report output.

use std::path::PathBuf;

use gnarl::config::Config;
use gnarl::detect::{Rule, Runner, Severity, SuppressionType};
use gnarl::report;
use tempfile::TempDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn run_testdata() -> gnarl::ScanResult {
    let runner = Runner::new(testdata_path(), Config::default());
    let files = runner.collect_files().expect("should collect fixtures");
    runner.run(&files).expect("scan should succeed")
}

#[test]
fn test_scan_covers_every_fixture() {
    let result = run_testdata();
    assert_eq!(result.scanned, 3);
    assert!(result.failed.is_empty());

    let paths: Vec<_> = result.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["consumer.py", "sample.py", "sample.ts"]);
    assert!(!result.has_errors());
}

#[test]
fn test_findings_are_derived_from_all_passes() {
    let result = run_testdata();

    let route_smells: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.file == "sample.py" && f.line == 45 && f.rule != Rule::Pattern)
        .map(|f| f.rule)
        .collect();
    assert_eq!(
        route_smells,
        vec![Rule::DeepNesting, Rule::HighCognitive, Rule::HighCyclomatic]
    );

    let dead = result
        .findings
        .iter()
        .find(|f| f.file == "consumer.py" && f.rule == Rule::DeadCode)
        .unwrap();
    assert_eq!(dead.severity, Severity::Info);
    assert!(dead.message.contains("'use_imports'"));
    assert!(dead.message.contains("high confidence"));

    assert!(result
        .findings
        .iter()
        .any(|f| f.file == "sample.ts" && f.code == "empty_catch"));
}

#[test]
fn test_json_report_for_fixtures() {
    let result = run_testdata();
    let value = serde_json::to_value(report::json_report("testdata", None, &result)).unwrap();

    assert_eq!(value["passed"], true);
    assert_eq!(value["config"], serde_json::Value::Null);
    assert_eq!(value["summary"]["files_scanned"], 3);
    assert_eq!(value["summary"]["errors"], 0);

    let sample = &value["files"][1];
    assert_eq!(sample["language"], "python");
    let route = sample["functions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "route")
        .unwrap();
    assert_eq!(route["cyclomatic"], 11);
    assert_eq!(route["rating"], "high");
    assert_eq!(route["line"], 45);
}

#[test]
fn test_suppressions_and_exit_status() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("danger.py"),
        "# gnarl:ignore-file dead_code - Plugin entry points\n\
         def run(expr):\n    \
             return eval(expr)\n\
         \n\
         def load(expr):\n    \
             return eval(expr)  # gnarl:ignore eval_exec_calls - Sandbox\n",
    )
    .unwrap();

    let runner = Runner::new(temp.path(), Config::default());
    let files = runner.collect_files().unwrap();
    let result = runner.run(&files).unwrap();

    assert!(result.has_errors());
    let errors: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line, 3);

    let file_level = result
        .suppressed
        .iter()
        .filter(|s| s.suppression.suppression_type == SuppressionType::File)
        .count();
    assert_eq!(file_level, 2);
    assert!(result
        .suppressed
        .iter()
        .any(|s| s.finding.code == "eval_exec_calls" && s.finding.line == 6));
}

#[test]
fn test_sarif_report_for_fixtures() {
    let result = run_testdata();
    let value = serde_json::to_value(report::sarif_report(&result)).unwrap();
    assert_eq!(value["version"], "2.1.0");
    assert_eq!(value["runs"][0]["tool"]["driver"]["name"], "gnarl");

    let results = value["runs"][0]["results"].as_array().unwrap();
    assert_eq!(results.len(), result.findings.len());
    assert!(results.iter().any(|r| r["ruleId"] == "dead_code" && r["level"] == "note"));
}
