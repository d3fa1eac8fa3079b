//! Inline suppression of findings via comments.
//!
//! Supports suppression comments like:
//! - `# gnarl:ignore <rule> - <reason>`
//! - `// gnarl:ignore-next-line <rule> - <reason>`
//! - `/* gnarl:ignore-file <rule> - <reason> */`
//!
//! `<rule>` is a rule name (`high_cyclomatic`, `dead_code`, ...), a pattern
//! id (`eval_call`), or `*` for everything.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

use super::Finding;
use crate::analysis::LanguageId;

/// File-level directives are honoured only in the header or this many lines.
const FILE_DIRECTIVE_WINDOW: usize = 10;

/// How a suppression applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionType {
    /// Applies to the same line
    Line,
    /// Applies to the next line
    NextLine,
    /// Applies to the entire file
    File,
}

/// An inline suppression directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suppression {
    /// Rule name, pattern id, or "*" for all
    pub rule: String,
    pub reason: String,
    pub file: String,
    /// Line number (0 for file-level)
    pub line: usize,
    pub suppression_type: SuppressionType,
}

/// A finding that was suppressed, with the directive that silenced it.
#[derive(Debug, Clone, Serialize)]
pub struct SuppressedFinding {
    pub finding: Finding,
    pub suppression: Suppression,
}

static SUPPRESSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // JS/TS line comments
        r"//\s*gnarl:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*))?",
        // Python comments
        r"#\s*gnarl:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*))?",
        // Block comments
        r"/\*\s*gnarl:(ignore(?:-file|-next-line)?)\s+(\S+?)\s*(?:-\s*(.*?))?\s*\*/",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

fn comment_prefixes(file_path: &str) -> &'static [&'static str] {
    match LanguageId::from_path(Path::new(file_path)) {
        Some(LanguageId::Python) => &["#"],
        Some(_) => &["//", "/*", "*"],
        None => &["//", "#", "/*", "*"],
    }
}

/// Check if a trimmed line is a comment or empty for the given file type.
fn is_comment_or_empty(line: &str, file_path: &str) -> bool {
    line.is_empty()
        || comment_prefixes(file_path)
            .iter()
            .any(|prefix| line.starts_with(prefix))
}

/// Parse suppression directives from file content.
pub fn parse_suppressions(file_path: &str, content: &str) -> Vec<Suppression> {
    let mut suppressions = Vec::new();
    let mut in_header = true;

    for (idx, line) in content.lines().enumerate() {
        let line_number = idx + 1;
        let trimmed = line.trim();

        if in_header && !is_comment_or_empty(trimmed, file_path) {
            in_header = false;
        }

        let Some(caps) = SUPPRESSION_PATTERNS.iter().find_map(|re| re.captures(line)) else {
            continue;
        };
        let start = caps.get(0).map_or(0, |m| m.start());

        let directive = caps.get(1).map_or("", |m| m.as_str());
        let rule = caps.get(2).map_or("", |m| m.as_str());
        let reason = caps
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        let suppression_type = match directive {
            "ignore-file" => {
                if !in_header && line_number > FILE_DIRECTIVE_WINDOW {
                    tracing::debug!(
                        file = file_path,
                        line = line_number,
                        "ignoring file-level suppression below the header"
                    );
                    continue;
                }
                SuppressionType::File
            }
            "ignore-next-line" => SuppressionType::NextLine,
            _ => {
                // A directive alone on its line covers the next line.
                if line[..start].trim().is_empty() {
                    SuppressionType::NextLine
                } else {
                    SuppressionType::Line
                }
            }
        };

        suppressions.push(Suppression {
            rule: rule.to_string(),
            reason,
            file: file_path.to_string(),
            line: if suppression_type == SuppressionType::File {
                0
            } else {
                line_number
            },
            suppression_type,
        });
    }

    suppressions
}

/// Check if a finding matches a suppression.
pub fn matches_suppression(finding: &Finding, suppression: &Suppression) -> bool {
    if finding.file != suppression.file {
        return false;
    }

    if suppression.rule != "*"
        && suppression.rule != finding.rule.as_str()
        && suppression.rule != finding.code
    {
        return false;
    }

    match suppression.suppression_type {
        SuppressionType::File => true,
        SuppressionType::Line => finding.line == suppression.line,
        SuppressionType::NextLine => finding.line == suppression.line + 1,
    }
}

/// Separate findings into active and suppressed based on suppressions.
pub fn filter_suppressed(
    findings: Vec<Finding>,
    suppressions: &[Suppression],
) -> (Vec<Finding>, Vec<SuppressedFinding>) {
    let mut active = Vec::new();
    let mut suppressed = Vec::new();

    for finding in findings {
        match suppressions
            .iter()
            .find(|s| matches_suppression(&finding, s))
        {
            Some(suppression) => suppressed.push(SuppressedFinding {
                finding,
                suppression: suppression.clone(),
            }),
            None => active.push(finding),
        }
    }

    (active, suppressed)
}
