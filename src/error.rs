//! Typed errors for the analysis library.
//!
//! The application layer (CLI, runner, config loading) works in
//! `anyhow::Result`; these types are what library callers match on.

use serde::Serialize;
use thiserror::Error;

use crate::analysis::LanguageId;

/// The requested configuration cannot drive an analysis.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unsupported language {0:?} (expected one of: python, typescript, tsx, javascript)")]
    UnsupportedLanguage(String),

    #[error("no analyzer registered for language {0}")]
    MissingAnalyzer(LanguageId),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A tree-sitter query failed to compile.
///
/// Pattern compilation failures are local: the pattern is skipped and the
/// rest of the batch keeps running.
#[derive(Debug, Clone, Error, Serialize)]
#[error("pattern {pattern_id:?} failed to compile at {row}:{column} ({kind}): {message}")]
pub struct PatternCompileError {
    pub pattern_id: String,
    /// Row of the offending token in the query source (0-indexed).
    pub row: usize,
    /// Column of the offending token in the query source (0-indexed).
    pub column: usize,
    pub kind: String,
    pub message: String,
}

impl PatternCompileError {
    pub fn from_query_error(pattern_id: &str, err: tree_sitter::QueryError) -> Self {
        Self {
            pattern_id: pattern_id.to_string(),
            row: err.row,
            column: err.column,
            kind: format!("{:?}", err.kind),
            message: err.message,
        }
    }

    /// A query compiled but does not expose the capture the pattern reports on.
    pub fn unknown_capture(pattern_id: &str, capture: &str) -> Self {
        Self {
            pattern_id: pattern_id.to_string(),
            row: 0,
            column: 0,
            kind: "Capture".to_string(),
            message: format!("query has no capture named @{}", capture),
        }
    }
}

/// Failure of a single-file analysis call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("failed to load {language} grammar: {source}")]
    Grammar {
        language: LanguageId,
        #[source]
        source: tree_sitter::LanguageError,
    },

    #[error("parser returned no tree for {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_language_message() {
        let err = ConfigurationError::UnsupportedLanguage("cobol".to_string());
        assert!(err.to_string().contains("\"cobol\""));
    }

    #[test]
    fn test_unknown_capture_message() {
        let err = PatternCompileError::unknown_capture("eval_call", "call");
        assert_eq!(err.pattern_id, "eval_call");
        assert!(err.to_string().contains("@call"));
    }
}
