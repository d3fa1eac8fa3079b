//! Core types for scan results.

use serde::{Deserialize, Serialize};

use crate::analysis::{FileAnalysis, SmellKind};

/// Severity levels for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Rule names that findings are reported (and suppressed) under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    HighCyclomatic,
    HighCognitive,
    DeepNesting,
    LongFunction,
    LongParameterList,
    Pattern,
    DeadCode,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::HighCyclomatic => "high_cyclomatic",
            Rule::HighCognitive => "high_cognitive",
            Rule::DeepNesting => "deep_nesting",
            Rule::LongFunction => "long_function",
            Rule::LongParameterList => "long_parameter_list",
            Rule::Pattern => "pattern",
            Rule::DeadCode => "dead_code",
        }
    }
}

impl From<SmellKind> for Rule {
    fn from(kind: SmellKind) -> Self {
        match kind {
            SmellKind::HighCyclomatic => Rule::HighCyclomatic,
            SmellKind::HighCognitive => Rule::HighCognitive,
            SmellKind::DeepNesting => Rule::DeepNesting,
            SmellKind::LongFunction => Rule::LongFunction,
            SmellKind::LongParameterList => Rule::LongParameterList,
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reportable issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: Rule,
    /// Pattern id for pattern findings, otherwise the rule name.
    pub code: String,
    pub message: String,
    pub file: String,
    pub line: usize,
    /// 1-indexed; absent when only the line is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub severity: Severity,
}

/// A file the runner did not analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Results of a scan over a set of files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub files: Vec<FileAnalysis>,
    pub findings: Vec<Finding>,
    /// Findings silenced by inline comments
    pub suppressed: Vec<super::SuppressedFinding>,
    /// Number of files analyzed
    pub scanned: usize,
    pub skipped_files: Vec<SkippedFile>,
    /// Files that could not be read or parsed
    pub failed: Vec<SkippedFile>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there are any error-severity findings.
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn suppressed_count(&self) -> usize {
        self.suppressed.len()
    }

    /// Malformed patterns summed over every analyzed file.
    pub fn skipped_pattern_count(&self) -> usize {
        self.files.iter().map(|f| f.skipped_pattern_count()).sum()
    }

    pub fn function_count(&self) -> usize {
        self.files.iter().map(|f| f.functions.len()).sum()
    }

    /// Findings per severity, as (errors, warnings, infos).
    pub fn severity_counts(&self) -> (usize, usize, usize) {
        self.findings
            .iter()
            .fold((0, 0, 0), |(e, w, i), f| match f.severity {
                Severity::Error => (e + 1, w, i),
                Severity::Warning => (e, w + 1, i),
                Severity::Info => (e, w, i + 1),
            })
    }
}
