//! Core traits for language analysis.

use std::collections::HashSet;

use tree_sitter::{Language, Node, Parser, Tree};

use super::facts::{Definition, FunctionRecord};
use super::languages::{LanguageConfig, LanguageId};
use super::patterns::PatternDef;
use crate::error::AnalysisError;

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// The tree is built once per analysis call and shared by the metric,
/// pattern and dead-code passes.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
    pub language: LanguageId,
    /// Grammar the tree was produced with; queries compile against it.
    pub grammar: Language,
}

impl ParsedFile {
    /// Parse `source` with the analyzer's grammar.
    ///
    /// Syntax errors are not fatal: the tree contains ERROR/MISSING nodes and
    /// [`ParsedFile::has_errors`] reports them.
    pub fn parse(
        analyzer: &dyn LanguageAnalyzer,
        path: &str,
        source: &[u8],
    ) -> Result<Self, AnalysisError> {
        let language = analyzer.language_id();
        let grammar = analyzer.grammar().clone();

        let mut parser = Parser::new();
        parser
            .set_language(&grammar)
            .map_err(|source| AnalysisError::Grammar { language, source })?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| AnalysisError::Parse(path.to_string()))?;

        Ok(Self {
            tree,
            source: source.to_vec(),
            path: path.to_string(),
            language,
            grammar,
        })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Line count over the raw bytes, so invalid UTF-8 still counts.
    pub fn line_count(&self) -> usize {
        let newlines = self.source.iter().filter(|&&b| b == b'\n').count();
        match self.source.last() {
            None | Some(b'\n') => newlines,
            Some(_) => newlines + 1,
        }
    }
}

/// A discovered function together with the node it was found at.
///
/// The node borrows the tree; the record does not.
pub struct FunctionSite<'t> {
    pub node: Node<'t>,
    pub record: FunctionRecord,
}

/// Language-specific analyzer trait.
///
/// Each language family implements this once; the metric engine only sees
/// the tables returned by [`LanguageAnalyzer::config`].
///
/// # Thread Safety
///
/// `tree_sitter::Parser` is not `Sync`, so parsers are created per call in
/// [`ParsedFile::parse`]; analyzers only hold the grammar handle.
pub trait LanguageAnalyzer: Send + Sync {
    fn language_id(&self) -> LanguageId;

    /// Node-kind tables for the metric engine.
    fn config(&self) -> &'static LanguageConfig;

    fn grammar(&self) -> &Language;

    /// Every function-like node in the tree, in document order.
    fn find_functions<'t>(&self, parsed: &'t ParsedFile) -> Vec<FunctionSite<'t>>;

    /// Top-level declarations (and methods of top-level classes).
    fn extract_definitions(&self, parsed: &ParsedFile) -> Vec<Definition>;

    /// Every identifier used in a non-defining position.
    fn extract_references(&self, parsed: &ParsedFile) -> HashSet<String>;

    /// Names the runtime calls implicitly (`__init__`, `constructor`).
    fn is_magic_name(&self, name: &str) -> bool;

    /// The bundled structural pattern library.
    fn builtin_patterns(&self) -> Vec<PatternDef>;
}

/// Children of `node` in reverse document order, for pushing on a work stack.
pub(crate) fn children_rev<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    (0..node.child_count()).rev().filter_map(move |i| node.child(i))
}

/// Named children of `node` in document order.
pub(crate) fn named_children<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    (0..node.named_child_count()).filter_map(move |i| node.named_child(i))
}
