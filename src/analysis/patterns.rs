//! Structural pattern matching with tree-sitter queries.
//!
//! Queries are structural, not semantic: they cannot count, negate or follow
//! data flow. Patterns that need any of that carry a [`PostFilter`], which is
//! applied in ordinary code after the query cursor has produced its matches.
//!
//! A pattern that fails to compile is skipped and reported; the rest of the
//! batch still runs.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor, QueryMatch};

use super::facts::Span;
use super::languages::LanguageId;
use super::traits::{named_children, ParsedFile};
use crate::detect::Severity;
use crate::error::PatternCompileError;

/// Grouping used by reports and the `patterns` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Security,
    #[default]
    CodeSmell,
    Documentation,
    Imports,
}

impl PatternCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCategory::Security => "security",
            PatternCategory::CodeSmell => "code_smell",
            PatternCategory::Documentation => "documentation",
            PatternCategory::Imports => "imports",
        }
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Second-pass check applied to each query match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostFilter {
    /// Keep the match when the capture has more than `limit` named children
    /// (comments excluded). A non-empty `kinds` counts only those kinds.
    MoreNamedChildrenThan {
        capture: String,
        limit: usize,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        kinds: Vec<String>,
    },
    /// Keep the match when every named child of the capture has one of `kinds`.
    NamedChildrenOnly { capture: String, kinds: Vec<String> },
    /// Drop matches whose reported node is also captured as `capture` by `query`.
    Without { query: String, capture: String },
}

fn default_severity() -> Severity {
    Severity::Warning
}

/// A pattern as declared, before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDef {
    pub id: String,
    #[serde(default)]
    pub category: PatternCategory,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    pub query: String,
    /// Capture whose node is reported.
    pub capture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<PostFilter>,
    /// Languages the pattern applies to. Empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<LanguageId>,
}

impl PatternDef {
    pub fn new(
        id: &str,
        category: PatternCategory,
        severity: Severity,
        description: &str,
        query: &str,
        capture: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            category,
            severity,
            description: description.to_string(),
            query: query.to_string(),
            capture: capture.to_string(),
            filter: None,
            languages: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: PostFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn applies_to(&self, language: LanguageId) -> bool {
        self.languages.is_empty() || self.languages.contains(&language)
    }
}

/// A matched node, detached from the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedNode {
    pub span: Span,
    /// 1-indexed.
    pub line: usize,
    /// 1-indexed.
    pub column: usize,
    pub text: String,
}

impl CapturedNode {
    fn from_node(parsed: &ParsedFile, node: Node) -> Self {
        let span = Span::from_node(node);
        Self {
            line: span.start_line,
            column: span.start_col,
            text: parsed.node_text(node).to_string(),
            span,
        }
    }
}

/// Capture name to captured nodes, in match order.
pub type CaptureMap = BTreeMap<String, Vec<CapturedNode>>;

/// One reported match of a library pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternMatch {
    pub pattern_id: String,
    pub capture: String,
    pub category: PatternCategory,
    pub severity: Severity,
    pub description: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
    pub text: String,
}

/// A pattern that was dropped from the batch.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedPattern {
    pub id: String,
    pub error: PatternCompileError,
}

/// Run a single query and group every capture by name.
///
/// ERROR and MISSING nodes are never reported.
pub fn run_pattern(parsed: &ParsedFile, pattern: &str) -> Result<CaptureMap, PatternCompileError> {
    let query = Query::new(&parsed.grammar, pattern)
        .map_err(|e| PatternCompileError::from_query_error("<inline>", e))?;
    let names = query.capture_names();

    let mut captures = CaptureMap::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, parsed.root(), &parsed.source[..]);
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if is_broken(capture.node) {
                continue;
            }
            captures
                .entry(names[capture.index as usize].to_string())
                .or_default()
                .push(CapturedNode::from_node(parsed, capture.node));
        }
    }
    Ok(captures)
}

fn is_broken(node: Node) -> bool {
    node.is_error() || node.is_missing()
}

/// An ordered batch of pattern definitions.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    defs: Vec<PatternDef>,
}

impl PatternSet {
    pub fn new(defs: Vec<PatternDef>) -> Self {
        Self { defs }
    }

    /// Built-in library plus user patterns, minus disabled ids, for one language.
    pub fn assemble(
        builtin: Vec<PatternDef>,
        user: &[PatternDef],
        disabled: &[String],
        language: LanguageId,
    ) -> Self {
        let defs = builtin
            .into_iter()
            .chain(user.iter().cloned())
            .filter(|d| d.applies_to(language))
            .filter(|d| !disabled.iter().any(|id| id == &d.id))
            .collect();
        Self { defs }
    }

    pub fn defs(&self) -> &[PatternDef] {
        &self.defs
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Compile every definition against `grammar`. Failures are recorded, not raised.
    pub fn compile(&self, grammar: &tree_sitter::Language) -> CompiledPatterns {
        let mut patterns = Vec::new();
        let mut skipped = Vec::new();

        for def in &self.defs {
            match CompiledPattern::compile(grammar, def) {
                Ok(p) => patterns.push(p),
                Err(error) => {
                    tracing::warn!(pattern = %def.id, error = %error, "skipping pattern");
                    skipped.push(SkippedPattern {
                        id: def.id.clone(),
                        error,
                    });
                }
            }
        }

        CompiledPatterns { patterns, skipped }
    }
}

enum CompiledFilter {
    MoreNamedChildrenThan {
        capture: u32,
        limit: usize,
        kinds: Vec<String>,
    },
    NamedChildrenOnly { capture: u32, kinds: Vec<String> },
    Without { query: Query, capture: u32 },
}

struct CompiledPattern {
    def: PatternDef,
    query: Query,
    capture: u32,
    filter: Option<CompiledFilter>,
}

fn capture_index(query: &Query, id: &str, name: &str) -> Result<u32, PatternCompileError> {
    query
        .capture_index_for_name(name)
        .ok_or_else(|| PatternCompileError::unknown_capture(id, name))
}

impl CompiledPattern {
    fn compile(grammar: &tree_sitter::Language, def: &PatternDef) -> Result<Self, PatternCompileError> {
        let query = Query::new(grammar, &def.query)
            .map_err(|e| PatternCompileError::from_query_error(&def.id, e))?;
        let capture = capture_index(&query, &def.id, &def.capture)?;

        let filter = match &def.filter {
            None => None,
            Some(PostFilter::MoreNamedChildrenThan {
                capture,
                limit,
                kinds,
            }) => Some(CompiledFilter::MoreNamedChildrenThan {
                capture: capture_index(&query, &def.id, capture)?,
                limit: *limit,
                kinds: kinds.clone(),
            }),
            Some(PostFilter::NamedChildrenOnly { capture, kinds }) => {
                Some(CompiledFilter::NamedChildrenOnly {
                    capture: capture_index(&query, &def.id, capture)?,
                    kinds: kinds.clone(),
                })
            }
            Some(PostFilter::Without { query: source, capture }) => {
                let negated = Query::new(grammar, source)
                    .map_err(|e| PatternCompileError::from_query_error(&def.id, e))?;
                let capture = capture_index(&negated, &def.id, capture)?;
                Some(CompiledFilter::Without {
                    query: negated,
                    capture,
                })
            }
        };

        Ok(Self {
            def: def.clone(),
            query,
            capture,
            filter,
        })
    }

    fn run(&self, parsed: &ParsedFile, out: &mut Vec<PatternMatch>) {
        let excluded = match &self.filter {
            Some(CompiledFilter::Without { query, capture }) => {
                captured_ranges(parsed, query, *capture)
            }
            _ => HashSet::new(),
        };

        let mut seen = HashSet::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, parsed.root(), &parsed.source[..]);
        while let Some(m) = matches.next() {
            if !self.keeps(m) {
                continue;
            }
            for capture in m.captures.iter().filter(|c| c.index == self.capture) {
                let node = capture.node;
                let range = (node.start_byte(), node.end_byte());
                if is_broken(node) || excluded.contains(&range) || !seen.insert(range) {
                    continue;
                }
                let captured = CapturedNode::from_node(parsed, node);
                out.push(PatternMatch {
                    pattern_id: self.def.id.clone(),
                    capture: self.def.capture.clone(),
                    category: self.def.category,
                    severity: self.def.severity,
                    description: self.def.description.clone(),
                    span: captured.span,
                    line: captured.line,
                    column: captured.column,
                    text: captured.text,
                });
            }
        }
    }

    fn keeps(&self, m: &QueryMatch) -> bool {
        let node_for = |index: u32| m.captures.iter().find(|c| c.index == index).map(|c| c.node);
        match &self.filter {
            None | Some(CompiledFilter::Without { .. }) => true,
            Some(CompiledFilter::MoreNamedChildrenThan {
                capture,
                limit,
                kinds,
            }) => node_for(*capture).is_some_and(|n| {
                named_children(n)
                    .filter(|c| c.kind() != "comment")
                    .filter(|c| kinds.is_empty() || kinds.iter().any(|k| k == c.kind()))
                    .count()
                    > *limit
            }),
            Some(CompiledFilter::NamedChildrenOnly { capture, kinds }) => node_for(*capture)
                .is_some_and(|n| {
                    named_children(n).all(|c| kinds.iter().any(|k| k == c.kind()))
                }),
        }
    }
}

fn captured_ranges(parsed: &ParsedFile, query: &Query, capture: u32) -> HashSet<(usize, usize)> {
    let mut ranges = HashSet::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, parsed.root(), &parsed.source[..]);
    while let Some(m) = matches.next() {
        for c in m.captures.iter().filter(|c| c.index == capture) {
            ranges.insert((c.node.start_byte(), c.node.end_byte()));
        }
    }
    ranges
}

/// Patterns that compiled, plus the ones that did not.
pub struct CompiledPatterns {
    patterns: Vec<CompiledPattern>,
    skipped: Vec<SkippedPattern>,
}

impl CompiledPatterns {
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn skipped(&self) -> &[SkippedPattern] {
        &self.skipped
    }

    /// Run every compiled pattern over the tree.
    pub fn run(&self, parsed: &ParsedFile) -> PatternScan {
        let mut matches = Vec::new();
        for pattern in &self.patterns {
            pattern.run(parsed, &mut matches);
        }
        matches.sort_by(|a, b| {
            (a.line, a.column, &a.pattern_id).cmp(&(b.line, b.column, &b.pattern_id))
        });
        PatternScan {
            matches,
            skipped: self.skipped.clone(),
        }
    }
}

/// Result of running a compiled batch over one file.
#[derive(Debug, Clone, Default)]
pub struct PatternScan {
    pub matches: Vec<PatternMatch>,
    pub skipped: Vec<SkippedPattern>,
}

impl PatternScan {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn by_pattern(&self, id: &str) -> Vec<&PatternMatch> {
        self.matches.iter().filter(|m| m.pattern_id == id).collect()
    }
}
