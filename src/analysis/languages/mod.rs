//! Language registry: per-language node-kind tables and analyzers.
//!
//! Tables are `'static` and never mutated. The engine receives either the
//! [`Registry`] or a single analyzer explicitly; nothing reads them through
//! ambient state except [`crate::registry`], which is a convenience for
//! callers that do not want to build their own.

mod ecmascript;
mod python;

pub use ecmascript::EcmaScriptAnalyzer;
pub use python::PythonAnalyzer;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use super::LanguageAnalyzer;
use crate::error::ConfigurationError;

/// A language the registry knows how to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    #[serde(alias = "py")]
    Python,
    #[serde(alias = "ts")]
    TypeScript,
    Tsx,
    #[serde(alias = "js")]
    JavaScript,
}

impl LanguageId {
    pub const ALL: [LanguageId; 4] = [
        LanguageId::Python,
        LanguageId::TypeScript,
        LanguageId::Tsx,
        LanguageId::JavaScript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageId::Python => "python",
            LanguageId::TypeScript => "typescript",
            LanguageId::Tsx => "tsx",
            LanguageId::JavaScript => "javascript",
        }
    }

    /// Map a file extension (without dot) to a language.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" => Some(LanguageId::Python),
            "ts" | "mts" | "cts" => Some(LanguageId::TypeScript),
            "tsx" => Some(LanguageId::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(LanguageId::JavaScript),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether the language uses the ECMAScript tables.
    pub fn is_ecmascript(&self) -> bool {
        !matches!(self, LanguageId::Python)
    }

    /// Whether source written for `other` can be read with this grammar.
    pub fn shares_family(&self, other: LanguageId) -> bool {
        *self == other || (self.is_ecmascript() && other.is_ecmascript())
    }
}

impl FromStr for LanguageId {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(LanguageId::Python),
            "typescript" | "ts" => Ok(LanguageId::TypeScript),
            "tsx" => Ok(LanguageId::Tsx),
            "javascript" | "js" => Ok(LanguageId::JavaScript),
            _ => Err(ConfigurationError::UnsupportedLanguage(s.to_string())),
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A node kind that is a decision point only for some operator tokens.
#[derive(Debug)]
pub struct OperatorDecision {
    pub kind: &'static str,
    pub operators: &'static [&'static str],
}

/// One row of a cognitive weight table.
#[derive(Debug)]
pub struct CognitiveRule {
    pub kind: &'static str,
    /// Base increment. Zero-weight rows add nothing regardless of depth.
    pub weight: u32,
    /// Add the current nesting depth on top of `weight`.
    pub nested: bool,
    /// Restrict the rule to these operator tokens. Empty means any.
    pub operators: &'static [&'static str],
}

impl CognitiveRule {
    pub const fn nested(kind: &'static str) -> Self {
        Self {
            kind,
            weight: 1,
            nested: true,
            operators: &[],
        }
    }

    pub const fn flat(kind: &'static str) -> Self {
        Self {
            kind,
            weight: 1,
            nested: false,
            operators: &[],
        }
    }

    pub const fn zero(kind: &'static str) -> Self {
        Self {
            kind,
            weight: 0,
            nested: false,
            operators: &[],
        }
    }

    pub const fn flat_for(kind: &'static str, operators: &'static [&'static str]) -> Self {
        Self {
            kind,
            weight: 1,
            nested: false,
            operators,
        }
    }

    fn matches(&self, node: Node) -> bool {
        node.kind() == self.kind
            && (self.operators.is_empty() || operator_in(node, self.operators))
    }

    /// Increment contributed by a matching node at `depth`.
    pub fn increment(&self, depth: u32) -> u32 {
        match (self.weight, self.nested) {
            (0, _) => 0,
            (w, true) => w + depth,
            (w, false) => w,
        }
    }
}

/// Weight table driving cognitive complexity.
#[derive(Debug)]
pub struct CognitiveTable {
    pub rules: &'static [CognitiveRule],
    /// Kinds whose subtree sits one level deeper.
    pub nesting_kinds: &'static [&'static str],
    /// Kinds that add a flat +1 when nested.
    pub flow_break_kinds: &'static [&'static str],
}

impl CognitiveTable {
    pub fn rule_for(&self, node: Node) -> Option<&CognitiveRule> {
        self.rules.iter().find(|r| r.matches(node))
    }

    pub fn increases_nesting(&self, kind: &str) -> bool {
        self.nesting_kinds.contains(&kind)
    }

    pub fn is_flow_break(&self, kind: &str) -> bool {
        self.flow_break_kinds.contains(&kind)
    }
}

/// Immutable node-kind tables for one grammar family.
#[derive(Debug)]
pub struct LanguageConfig {
    pub decision_kinds: &'static [&'static str],
    pub operator_decisions: &'static [OperatorDecision],
    /// Kinds that open a nesting level for max-depth measurement.
    pub nesting_kinds: &'static [&'static str],
    pub cognitive: CognitiveTable,
}

impl LanguageConfig {
    pub fn is_decision(&self, node: Node) -> bool {
        let kind = node.kind();
        self.decision_kinds.contains(&kind)
            || self
                .operator_decisions
                .iter()
                .any(|d| d.kind == kind && operator_in(node, d.operators))
    }

    pub fn is_nesting(&self, kind: &str) -> bool {
        self.nesting_kinds.contains(&kind)
    }
}

/// Whether the node's `operator` field is one of `operators`.
fn operator_in(node: Node, operators: &[&str]) -> bool {
    node.child_by_field_name("operator")
        .is_some_and(|op| operators.contains(&op.kind()))
}

/// One analyzer per supported language.
pub struct Registry {
    analyzers: Vec<Box<dyn LanguageAnalyzer>>,
}

impl Registry {
    /// An empty registry. Mostly useful in tests.
    pub fn empty() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    /// The registry with every bundled grammar.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PythonAnalyzer::new()));
        registry.register(Box::new(EcmaScriptAnalyzer::typescript()));
        registry.register(Box::new(EcmaScriptAnalyzer::tsx()));
        registry.register(Box::new(EcmaScriptAnalyzer::javascript()));
        registry
    }

    /// Add an analyzer, replacing any previous one for the same language.
    pub fn register(&mut self, analyzer: Box<dyn LanguageAnalyzer>) {
        let id = analyzer.language_id();
        self.analyzers.retain(|a| a.language_id() != id);
        self.analyzers.push(analyzer);
    }

    pub fn get(&self, id: LanguageId) -> Option<&dyn LanguageAnalyzer> {
        self.analyzers
            .iter()
            .find(|a| a.language_id() == id)
            .map(|a| a.as_ref())
    }

    /// Like [`Registry::get`], failing with a configuration error.
    pub fn analyzer(&self, id: LanguageId) -> Result<&dyn LanguageAnalyzer, ConfigurationError> {
        self.get(id).ok_or(ConfigurationError::MissingAnalyzer(id))
    }

    /// Resolve a language identifier string.
    pub fn by_name(&self, name: &str) -> Result<&dyn LanguageAnalyzer, ConfigurationError> {
        let id: LanguageId = name.parse()?;
        self.analyzer(id)
    }

    pub fn for_path(&self, path: &Path) -> Option<&dyn LanguageAnalyzer> {
        LanguageId::from_path(path).and_then(|id| self.get(id))
    }

    pub fn languages(&self) -> Vec<LanguageId> {
        let mut ids: Vec<_> = self.analyzers.iter().map(|a| a.language_id()).collect();
        ids.sort();
        ids
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_str() {
        assert_eq!("python".parse::<LanguageId>().unwrap(), LanguageId::Python);
        assert_eq!("py".parse::<LanguageId>().unwrap(), LanguageId::Python);
        assert_eq!("TS".parse::<LanguageId>().unwrap(), LanguageId::TypeScript);
        assert_eq!("tsx".parse::<LanguageId>().unwrap(), LanguageId::Tsx);
        assert_eq!("js".parse::<LanguageId>().unwrap(), LanguageId::JavaScript);
    }

    #[test]
    fn test_unsupported_language() {
        let err = "cobol".parse::<LanguageId>().unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedLanguage(ref s) if s == "cobol"));
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(LanguageId::from_extension("py"), Some(LanguageId::Python));
        assert_eq!(LanguageId::from_extension("mts"), Some(LanguageId::TypeScript));
        assert_eq!(LanguageId::from_extension("tsx"), Some(LanguageId::Tsx));
        assert_eq!(LanguageId::from_extension("cjs"), Some(LanguageId::JavaScript));
        assert_eq!(LanguageId::from_extension("rs"), None);
        assert_eq!(
            LanguageId::from_path(Path::new("src/app/view.jsx")),
            Some(LanguageId::JavaScript)
        );
    }

    #[test]
    fn test_language_families() {
        assert!(LanguageId::Python.shares_family(LanguageId::Python));
        assert!(LanguageId::Tsx.shares_family(LanguageId::JavaScript));
        assert!(LanguageId::TypeScript.shares_family(LanguageId::Tsx));
        assert!(!LanguageId::JavaScript.shares_family(LanguageId::Python));
        assert!(!LanguageId::Python.shares_family(LanguageId::TypeScript));
    }

    #[test]
    fn test_standard_registry_covers_all_languages() {
        let registry = Registry::standard();
        assert_eq!(registry.languages(), LanguageId::ALL.to_vec());
        for id in LanguageId::ALL {
            assert_eq!(registry.analyzer(id).unwrap().language_id(), id);
        }
    }

    #[test]
    fn test_empty_registry_reports_missing_analyzer() {
        let registry = Registry::empty();
        let err = registry.by_name("python").err().unwrap();
        assert!(matches!(err, ConfigurationError::MissingAnalyzer(LanguageId::Python)));
    }

    #[test]
    fn test_zero_weight_rule_ignores_depth() {
        assert_eq!(CognitiveRule::zero("else_clause").increment(3), 0);
        assert_eq!(CognitiveRule::nested("if_statement").increment(2), 3);
        assert_eq!(CognitiveRule::flat("boolean_operator").increment(5), 1);
    }
}
