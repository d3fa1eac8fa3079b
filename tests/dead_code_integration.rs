//! Integration tests for the single-file dead-code heuristic.

use std::path::PathBuf;

use gnarl::analysis::SymbolKind;
use gnarl::{analyze_source, registry, Confidence, Config, FileAnalysis};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn analyze_fixture(name: &str, language: &str) -> FileAnalysis {
    let source = std::fs::read(testdata_path().join(name)).expect("should read fixture");
    analyze_source(registry(), language, name, &source, &Config::default())
        .expect("analysis should succeed")
}

fn graded(analysis: &FileAnalysis) -> Vec<(&str, Confidence)> {
    analysis
        .dead_code
        .iter()
        .map(|d| (d.name.as_str(), d.confidence))
        .collect()
}

#[test]
fn test_python_sample_candidates() {
    let analysis = analyze_fixture("sample.py", "python");
    assert_eq!(
        graded(&analysis),
        vec![
            ("UNUSED_CONSTANT", Confidence::High),
            ("__init__", Confidence::Medium),
            ("_audit", Confidence::Medium),
            ("unused_function", Confidence::High),
            ("_private_unused", Confidence::High),
            ("UnusedClass", Confidence::High),
            ("method_one", Confidence::Medium),
        ]
    );

    let constant = &analysis.dead_code[0];
    assert_eq!(constant.kind, SymbolKind::Variable);
    assert_eq!(constant.line, 6);
}

#[test]
fn test_python_referenced_symbols_are_not_candidates() {
    let analysis = analyze_fixture("sample.py", "python");
    for name in ["Warehouse", "restock", "double", "route", "main", "MAX_RETRIES"] {
        assert!(
            analysis.dead_code.iter().all(|d| d.name != name),
            "{} should be referenced",
            name
        );
    }
}

#[test]
fn test_imports_are_not_definitions() {
    let analysis = analyze_fixture("consumer.py", "py");
    assert_eq!(graded(&analysis), vec![("use_imports", Confidence::High)]);
}

#[test]
fn test_typescript_sample_candidates() {
    let analysis = analyze_fixture("sample.ts", "typescript");

    let high: Vec<_> = analysis
        .dead_code
        .iter()
        .filter(|d| d.confidence == Confidence::High)
        .map(|d| (d.name.as_str(), d.kind))
        .collect();
    assert_eq!(
        high,
        vec![
            ("UnusedType", SymbolKind::Type),
            ("UNUSED_SECRET", SymbolKind::Variable),
            ("unusedInternalFunction", SymbolKind::Function),
            ("UnusedHelper", SymbolKind::Class),
        ]
    );

    let service = analysis
        .dead_code
        .iter()
        .find(|d| d.name == "OrderService")
        .unwrap();
    assert_eq!(service.confidence, Confidence::Medium);
    assert_eq!(service.reason, Some("exported; may be used by other modules"));

    let ctor = analysis
        .dead_code
        .iter()
        .find(|d| d.name == "constructor")
        .unwrap();
    assert_eq!(ctor.confidence, Confidence::Medium);

    for name in ["Order", "LineItem", "TAX_RATE", "applyTax"] {
        assert!(analysis.dead_code.iter().all(|d| d.name != name));
    }
}

#[test]
fn test_entry_points_are_downgraded() {
    let config = Config {
        entry_points: vec!["unused_function".to_string()],
        ..Config::default()
    };
    let source = std::fs::read(testdata_path().join("sample.py")).unwrap();
    let analysis = analyze_source(registry(), "python", "sample.py", &source, &config).unwrap();
    let candidate = analysis
        .dead_code
        .iter()
        .find(|d| d.name == "unused_function")
        .unwrap();
    assert_eq!(candidate.confidence, Confidence::Medium);
    assert_eq!(candidate.reason, Some("configured entry point"));
}
