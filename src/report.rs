//! Output formatting for gnarl results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal tables for human readability
//! - JSON: structured output for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::analysis::{FileAnalysis, FunctionMetrics, Rating};
use crate::detect::{Finding, Rule, ScanResult, Severity, SuppressedFinding, SuppressionType};

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    /// Config file used, or null for built-in defaults.
    pub config: Option<String>,
    pub passed: bool,
    pub summary: JsonSummary,
    pub files: Vec<JsonFile>,
    pub findings: Vec<JsonFinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<JsonSuppressedFinding>,
    pub suppressed_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<JsonSkippedFile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<JsonSkippedFile>,
}

#[derive(Serialize)]
pub struct JsonSummary {
    pub files_scanned: usize,
    pub functions: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub skipped_patterns: usize,
}

#[derive(Serialize)]
pub struct JsonFile {
    pub path: String,
    pub language: String,
    pub total_lines: usize,
    pub has_parse_errors: bool,
    pub functions: Vec<JsonFunction>,
    pub pattern_matches: Vec<JsonPatternMatch>,
    pub dead_code: Vec<JsonDeadCode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_patterns: Vec<JsonSkippedPattern>,
}

#[derive(Serialize)]
pub struct JsonFunction {
    pub name: String,
    pub kind: String,
    pub line: usize,
    pub end_line: usize,
    pub lines: usize,
    pub parameters: usize,
    pub cyclomatic: u32,
    pub cognitive: u32,
    pub max_nesting: u32,
    pub rating: String,
}

#[derive(Serialize)]
pub struct JsonPatternMatch {
    pub pattern_id: String,
    pub capture: String,
    pub severity: String,
    pub line: usize,
    pub column: usize,
    pub text: String,
}

#[derive(Serialize)]
pub struct JsonDeadCode {
    pub name: String,
    pub kind: String,
    pub line: usize,
    pub confidence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct JsonSkippedPattern {
    pub id: String,
    pub row: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Serialize)]
pub struct JsonFinding {
    pub rule: String,
    pub code: String,
    pub severity: String,
    pub file: String,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
}

#[derive(Serialize)]
pub struct JsonSuppressedFinding {
    pub finding: JsonFinding,
    pub suppression: JsonSuppression,
}

#[derive(Serialize)]
pub struct JsonSuppression {
    pub rule: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    pub line: usize,
    #[serde(rename = "type")]
    pub suppression_type: String,
}

#[derive(Serialize)]
pub struct JsonSkippedFile {
    pub path: String,
    pub reason: String,
}

/// Build the JSON report without printing it.
pub fn json_report(path: &str, config_path: Option<&str>, result: &ScanResult) -> JsonReport {
    let (errors, warnings, infos) = result.severity_counts();

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        config: config_path.map(str::to_string),
        passed: !result.has_errors(),
        summary: JsonSummary {
            files_scanned: result.scanned,
            functions: result.function_count(),
            errors,
            warnings,
            infos,
            skipped_patterns: result.skipped_pattern_count(),
        },
        files: result.files.iter().map(file_to_json).collect(),
        findings: result.findings.iter().map(finding_to_json).collect(),
        suppressed: result
            .suppressed
            .iter()
            .map(|sf| JsonSuppressedFinding {
                finding: finding_to_json(&sf.finding),
                suppression: JsonSuppression {
                    rule: sf.suppression.rule.clone(),
                    reason: sf.suppression.reason.clone(),
                    line: sf.suppression.line,
                    suppression_type: suppression_type_name(sf.suppression.suppression_type)
                        .to_string(),
                },
            })
            .collect(),
        suppressed_count: result.suppressed_count(),
        skipped_files: result
            .skipped_files
            .iter()
            .map(|s| JsonSkippedFile {
                path: s.path.clone(),
                reason: s.reason.clone(),
            })
            .collect(),
        failed_files: result
            .failed
            .iter()
            .map(|s| JsonSkippedFile {
                path: s.path.clone(),
                reason: s.reason.clone(),
            })
            .collect(),
    }
}

/// Write results in JSON format.
pub fn write_json(path: &str, config_path: Option<&str>, result: &ScanResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&json_report(path, config_path, result))?;
    println!("{}", json);
    Ok(())
}

fn file_to_json(file: &FileAnalysis) -> JsonFile {
    JsonFile {
        path: file.path.clone(),
        language: file.language.to_string(),
        total_lines: file.total_lines,
        has_parse_errors: file.has_parse_errors,
        functions: file.functions.iter().map(function_to_json).collect(),
        pattern_matches: file
            .pattern_matches
            .iter()
            .map(|m| JsonPatternMatch {
                pattern_id: m.pattern_id.clone(),
                capture: m.capture.clone(),
                severity: m.severity.to_string(),
                line: m.line,
                column: m.column,
                text: m.text.clone(),
            })
            .collect(),
        dead_code: file
            .dead_code
            .iter()
            .map(|d| JsonDeadCode {
                name: d.name.clone(),
                kind: d.kind.to_string(),
                line: d.line,
                confidence: d.confidence.to_string(),
                reason: d.reason.map(str::to_string),
            })
            .collect(),
        skipped_patterns: file
            .skipped_patterns
            .iter()
            .map(|s| JsonSkippedPattern {
                id: s.id.clone(),
                row: s.error.row,
                column: s.error.column,
                message: s.error.message.clone(),
            })
            .collect(),
    }
}

fn function_to_json(f: &FunctionMetrics) -> JsonFunction {
    JsonFunction {
        name: f.record.display_name().to_string(),
        kind: f.record.kind.to_string(),
        line: f.record.line(),
        end_line: f.record.span.end_line,
        lines: f.line_count,
        parameters: f.record.parameter_count,
        cyclomatic: f.score.cyclomatic,
        cognitive: f.score.cognitive,
        max_nesting: f.score.max_nesting,
        rating: f.score.rating.to_string(),
    }
}

fn finding_to_json(f: &Finding) -> JsonFinding {
    JsonFinding {
        rule: f.rule.as_str().to_string(),
        code: f.code.clone(),
        severity: f.severity.to_string(),
        file: f.file.clone(),
        line: f.line,
        column: f.column,
        message: f.message.clone(),
    }
}

fn suppression_type_name(t: SuppressionType) -> &'static str {
    match t {
        SuppressionType::Line => "line",
        SuppressionType::NextLine => "next_line",
        SuppressionType::File => "file",
    }
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "gnarl";

#[derive(Serialize)]
pub struct SarifReport {
    pub version: String,
    #[serde(rename = "$schema")]
    pub schema: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Serialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Serialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Serialize)]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    pub rules: Vec<SarifRule>,
}

#[derive(Serialize)]
pub struct SarifRule {
    pub id: String,
    pub name: String,
    #[serde(rename = "shortDescription")]
    pub short_description: SarifMessage,
    #[serde(rename = "defaultConfiguration")]
    pub default_config: SarifRuleConfig,
}

#[derive(Serialize)]
pub struct SarifRuleConfig {
    pub level: String,
}

#[derive(Serialize)]
pub struct SarifResult {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub level: String,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Serialize)]
pub struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
pub struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    pub artifact_location: SarifArtifact,
    pub region: SarifRegion,
}

#[derive(Serialize)]
pub struct SarifArtifact {
    pub uri: String,
}

#[derive(Serialize)]
pub struct SarifRegion {
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "startColumn", skip_serializing_if = "Option::is_none")]
    pub start_column: Option<usize>,
}

fn rule_name(rule: Rule) -> &'static str {
    match rule {
        Rule::HighCyclomatic => "HighCyclomaticComplexity",
        Rule::HighCognitive => "HighCognitiveComplexity",
        Rule::DeepNesting => "DeepNesting",
        Rule::LongFunction => "LongFunction",
        Rule::LongParameterList => "LongParameterList",
        Rule::Pattern => "StructuralPattern",
        Rule::DeadCode => "DeadCode",
    }
}

fn rule_description(rule: Rule) -> &'static str {
    match rule {
        Rule::HighCyclomatic => "Function has more independent paths than the configured limit",
        Rule::HighCognitive => "Function is harder to read than the configured limit",
        Rule::DeepNesting => "Function nests control flow deeper than the configured limit",
        Rule::LongFunction => "Function spans more lines than the configured limit",
        Rule::LongParameterList => "Function declares more parameters than the configured limit",
        Rule::Pattern => "Structural code pattern",
        Rule::DeadCode => "Declaration is never referenced in its own file",
    }
}

fn map_severity_to_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

/// Build the SARIF log. Each distinct finding code becomes one rule.
pub fn sarif_report(result: &ScanResult) -> SarifReport {
    let mut rules: BTreeMap<&str, SarifRule> = BTreeMap::new();
    for f in &result.findings {
        rules.entry(f.code.as_str()).or_insert_with(|| {
            let description = if f.rule == Rule::Pattern {
                f.message.clone()
            } else {
                rule_description(f.rule).to_string()
            };
            SarifRule {
                id: f.code.clone(),
                name: rule_name(f.rule).to_string(),
                short_description: SarifMessage { text: description },
                default_config: SarifRuleConfig {
                    level: map_severity_to_level(f.severity).to_string(),
                },
            }
        });
    }

    let results = result
        .findings
        .iter()
        .map(|f| SarifResult {
            rule_id: f.code.clone(),
            level: map_severity_to_level(f.severity).to_string(),
            message: SarifMessage {
                text: f.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: f.file.replace('\\', "/"),
                    },
                    region: SarifRegion {
                        start_line: f.line.max(1),
                        start_column: f.column,
                    },
                },
            }],
        })
        .collect();

    SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules: rules.into_values().collect(),
                },
            },
            results,
        }],
    }
}

/// Write results in SARIF format.
pub fn write_sarif(result: &ScanResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&sarif_report(result))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(
    path: &str,
    config_path: Option<&str>,
    result: &ScanResult,
    show_suppressed: bool,
) {
    println!();
    print!("  ");
    print!("{}", "gnarl".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Analyzing: ".dimmed());
    println!("{}", path);
    print!("  {}", "Config:    ".dimmed());
    println!("{}", config_path.unwrap_or("(defaults)"));
    println!();

    for file in &result.files {
        write_file_table(file);
    }

    if !result.findings.is_empty() {
        write_findings(&result.findings);
        println!();
    }

    if !result.suppressed.is_empty() {
        write_suppressed_summary(&result.suppressed, show_suppressed);
        println!();
    }

    write_summary(result);
    println!();
}

fn write_file_table(file: &FileAnalysis) {
    print!("  {}", file.path.blue().bold());
    print!("{}", format!("  {} · {} lines", file.language, file.total_lines).dimmed());
    if file.has_parse_errors {
        print!("  {}", "(syntax errors)".yellow());
    }
    println!();

    if file.functions.is_empty() {
        println!("    {}", "no functions".dimmed());
        println!();
        return;
    }

    let width = file
        .functions
        .iter()
        .map(|f| f.record.display_name().len())
        .max()
        .unwrap_or(0)
        .clamp(8, 48);

    println!(
        "    {}",
        format!(
            "{:<width$}  {:>4}  {:>4}  {:>4}  {:>6}  {:>5}  {}",
            "Function",
            "CC",
            "CogC",
            "Nest",
            "Params",
            "Lines",
            "Rating",
            width = width
        )
        .dimmed()
    );

    for f in &file.functions {
        let name = truncate(f.record.display_name(), width);
        println!(
            "    {:<width$}  {:>4}  {:>4}  {:>4}  {:>6}  {:>5}  {}",
            name,
            f.score.cyclomatic,
            f.score.cognitive,
            f.score.max_nesting,
            f.record.parameter_count,
            f.line_count,
            colored_rating(f.score.rating),
            width = width
        );
    }
    println!();
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let kept: String = name.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

fn colored_rating(rating: Rating) -> ColoredString {
    match rating {
        Rating::Low => rating.as_str().green(),
        Rating::Medium => rating.as_str().yellow(),
        Rating::High => rating.as_str().red().bold(),
    }
}

fn write_findings(findings: &[Finding]) {
    println!("  {} ({}):", "Findings".bold(), findings.len());
    println!();

    for f in findings {
        write_severity_tag(f.severity);
        print!("   ");
        print!("{:<22}", f.code.as_str().dimmed());
        print!("{}", f.file.blue());
        if f.line > 0 {
            print!("{}", format!(":{}", f.line).dimmed());
        }
        println!();

        println!("            {}", f.message);
        println!();
    }
}

fn write_severity_tag(severity: Severity) {
    match severity {
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}

fn write_suppressed_summary(suppressed: &[SuppressedFinding], show_details: bool) {
    println!("  {} ({}):", "Suppressed".dimmed(), suppressed.len());

    if !show_details {
        println!("    {}", "(use --show-suppressed to see details)".dimmed());
        return;
    }

    println!();
    for sf in suppressed {
        let f = &sf.finding;
        let s = &sf.suppression;

        print!("    {:<22}", f.code.as_str().dimmed());
        print!("{}", f.file.blue());
        if s.suppression_type == SuppressionType::File {
            print!("{}", ":* (file)".dimmed());
        } else if f.line > 0 {
            print!("{}", format!(":{}", f.line).dimmed());
        }
        println!();

        if !s.reason.is_empty() {
            println!("            {}", format!("reason: {:?}", s.reason).dimmed());
        }
    }
}

fn write_summary(result: &ScanResult) {
    let (errors, warnings, infos) = result.severity_counts();

    if result.has_errors() {
        print!("  {}", "✗ FAIL".red());
    } else {
        print!("  {}", "✓ PASS".green());
    }
    print!(
        "  {} files, {} functions",
        result.scanned,
        result.function_count()
    );
    print!(
        "  {} {} {}",
        format!("{} errors", errors).red(),
        format!("{} warnings", warnings).yellow(),
        format!("{} info", infos).blue()
    );
    if result.suppressed_count() > 0 {
        print!(
            "  {}",
            format!("({} suppressed)", result.suppressed_count()).dimmed()
        );
    }
    println!();

    let skipped_patterns = result.skipped_pattern_count();
    if skipped_patterns > 0 {
        println!(
            "  {}",
            format!("{} pattern(s) failed to compile and were skipped", skipped_patterns).yellow()
        );
    }
    if !result.skipped_files.is_empty() {
        println!(
            "  {}",
            format!("{} file(s) skipped", result.skipped_files.len()).dimmed()
        );
    }
    for failed in &result.failed {
        println!("  {} {}: {}", "failed".red(), failed.path, failed.reason);
    }
}
