//! Records produced by a single analysis pass.

use std::fmt;

use serde::Serialize;

use super::patterns::{PatternMatch, SkippedPattern};
use super::smells::Smell;
use super::LanguageId;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }

    /// Number of source lines covered, inclusive.
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Shape of a function-like node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Function,
    Method,
    Arrow,
}

impl FunctionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Method => "method",
            FunctionKind::Arrow => "arrow",
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One function-like node found in a tree.
///
/// The span is the only link back to the tree; the record owns nothing from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRecord {
    /// Qualified name (`Class.method` for methods), `None` for anonymous functions.
    pub name: Option<String>,
    pub kind: FunctionKind,
    pub span: Span,
    pub parameter_count: usize,
}

impl FunctionRecord {
    /// Name for display, with a placeholder for anonymous functions.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    /// Start line (1-indexed).
    pub fn line(&self) -> usize {
        self.span.start_line
    }
}

/// Coarse complexity grade, derived from cyclomatic complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Low,
    Medium,
    High,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Low => "low",
            Rating::Medium => "medium",
            Rating::High => "high",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Complexity metrics for one function. Immutable once computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComplexityScore {
    /// 1 + decision points. Never below 1.
    pub cyclomatic: u32,
    /// Nesting-weighted readability cost.
    pub cognitive: u32,
    /// Deepest nesting level below the function node.
    pub max_nesting: u32,
    pub rating: Rating,
}

/// A function, its score, and the smells the score triggers.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionMetrics {
    pub record: FunctionRecord,
    pub score: ComplexityScore,
    pub line_count: usize,
    pub smells: Vec<Smell>,
}

/// Kind of a top-level declaration considered by the dead-code heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Variable,
    Type,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Variable => "variable",
            SymbolKind::Type => "type",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declaration extracted for dead-code analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub kind: SymbolKind,
    pub line: usize,
    /// Enclosing class for methods.
    pub parent: Option<String>,
    pub is_decorated: bool,
    pub is_exported: bool,
}

impl Definition {
    pub fn new(name: impl Into<String>, kind: SymbolKind, line: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            line,
            parent: None,
            is_decorated: false,
            is_exported: false,
        }
    }

    pub fn is_method(&self) -> bool {
        self.parent.is_some()
    }
}

/// How much to trust a dead-code candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declared symbol with no reference in the same file. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadCodeCandidate {
    pub name: String,
    pub kind: SymbolKind,
    pub confidence: Confidence,
    pub line: usize,
    /// Why the candidate was downgraded to medium confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Everything one pass over one file produced.
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub path: String,
    pub language: LanguageId,
    pub total_lines: usize,
    /// The parser recovered from syntax errors; metrics still cover the whole tree.
    pub has_parse_errors: bool,
    pub functions: Vec<FunctionMetrics>,
    pub pattern_matches: Vec<PatternMatch>,
    pub skipped_patterns: Vec<SkippedPattern>,
    pub dead_code: Vec<DeadCodeCandidate>,
}

impl FileAnalysis {
    /// Find a function by its (qualified) name.
    pub fn function(&self, name: &str) -> Option<&FunctionMetrics> {
        self.functions
            .iter()
            .find(|f| f.record.name.as_deref() == Some(name))
    }

    /// Number of patterns that were skipped because they failed to compile.
    pub fn skipped_pattern_count(&self) -> usize {
        self.skipped_patterns.len()
    }
}
