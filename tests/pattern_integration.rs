//! Integration tests for the structural pattern library.

use std::path::PathBuf;

use gnarl::analysis::{PatternCategory, PatternSet, ParsedFile};
use gnarl::{analyze_source, registry, Config, LanguageAnalyzer, LanguageId, PatternDef, Severity};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(testdata_path().join(name)).expect("should read fixture")
}

#[test]
fn test_builtin_patterns_on_python_sample() {
    let analysis =
        analyze_source(registry(), "python", "sample.py", &fixture("sample.py"), &Config::default())
            .unwrap();
    assert_eq!(analysis.skipped_pattern_count(), 0);

    let too_many: Vec<_> = analysis
        .pattern_matches
        .iter()
        .filter(|m| m.pattern_id == "too_many_parameters")
        .collect();
    assert_eq!(too_many.len(), 1);
    assert_eq!(too_many[0].line, 81);

    let undocumented: Vec<_> = analysis
        .pattern_matches
        .iter()
        .filter(|m| m.pattern_id == "missing_docstring")
        .map(|m| m.text.as_str())
        .collect();
    assert!(undocumented.contains(&"route"));
    assert!(undocumented.contains(&"main"));
    assert!(!undocumented.contains(&"classify"));
}

#[test]
fn test_empty_catch_in_typescript_sample() {
    let analysis =
        analyze_source(registry(), "ts", "sample.ts", &fixture("sample.ts"), &Config::default())
            .unwrap();
    let catches: Vec<_> = analysis
        .pattern_matches
        .iter()
        .filter(|m| m.pattern_id == "empty_catch")
        .collect();
    assert_eq!(catches.len(), 1);
    assert_eq!(catches[0].line, 68);
    assert!(analysis
        .pattern_matches
        .iter()
        .all(|m| m.severity != Severity::Error));
}

#[test]
fn test_malformed_pattern_is_skipped_and_counted() {
    let analyzer = registry().analyzer(LanguageId::Python).unwrap();
    let defs = vec![
        PatternDef::new(
            "calls",
            PatternCategory::CodeSmell,
            Severity::Info,
            "function calls",
            "(call) @call",
            "call",
        ),
        PatternDef::new(
            "returns",
            PatternCategory::CodeSmell,
            Severity::Info,
            "return statements",
            "(return_statement) @ret",
            "ret",
        ),
        PatternDef::new(
            "broken",
            PatternCategory::CodeSmell,
            Severity::Info,
            "unbalanced parens",
            "(call (identifier) @f",
            "f",
        ),
        PatternDef::new(
            "classes",
            PatternCategory::CodeSmell,
            Severity::Info,
            "class definitions",
            "(class_definition) @class",
            "class",
        ),
        PatternDef::new(
            "comparisons",
            PatternCategory::CodeSmell,
            Severity::Info,
            "comparisons",
            "(comparison_operator) @cmp",
            "cmp",
        ),
    ];

    let compiled = PatternSet::new(defs).compile(analyzer.grammar());
    assert_eq!(compiled.len(), 4);
    assert_eq!(compiled.skipped().len(), 1);
    assert_eq!(compiled.skipped()[0].id, "broken");

    let parsed = ParsedFile::parse(analyzer, "sample.py", &fixture("sample.py")).unwrap();
    let scan = compiled.run(&parsed);
    assert_eq!(scan.skipped_count(), 1);
    assert_eq!(scan.by_pattern("classes").len(), 2);
    assert!(!scan.by_pattern("returns").is_empty());
}

#[test]
fn test_user_pattern_from_yaml_config() {
    let yaml = r#"
disabled_patterns: [missing_docstring]
patterns:
  - id: print_call
    query: '(call function: (identifier) @f (#eq? @f "print")) @call'
    capture: call
    severity: info
    languages: [python]
  - id: not_a_query
    query: '((('
    capture: x
"#;
    let config = Config::parse_str(yaml).unwrap();
    let analysis =
        analyze_source(registry(), "python", "sample.py", &fixture("sample.py"), &config).unwrap();

    let prints: Vec<_> = analysis
        .pattern_matches
        .iter()
        .filter(|m| m.pattern_id == "print_call")
        .collect();
    assert_eq!(prints.len(), 1);
    assert_eq!(prints[0].line, 89);
    assert!(analysis
        .pattern_matches
        .iter()
        .all(|m| m.pattern_id != "missing_docstring"));
    assert_eq!(analysis.skipped_pattern_count(), 1);
    assert_eq!(analysis.skipped_patterns[0].id, "not_a_query");
}
