//! Python language analyzer using tree-sitter.

use std::collections::HashSet;

use tree_sitter::{Language, Node};

use super::{CognitiveRule, CognitiveTable, LanguageConfig, LanguageId};
use crate::analysis::facts::{Definition, FunctionKind, FunctionRecord, Span, SymbolKind};
use crate::analysis::patterns::{PatternCategory, PatternDef, PostFilter};
use crate::analysis::traits::{children_rev, named_children, FunctionSite};
use crate::analysis::{LanguageAnalyzer, ParsedFile};
use crate::detect::Severity;

static PYTHON_CONFIG: LanguageConfig = LanguageConfig {
    decision_kinds: &[
        "if_statement",
        "elif_clause",
        "for_statement",
        "while_statement",
        "except_clause",
        "boolean_operator",
        "conditional_expression",
        "list_comprehension",
        "dictionary_comprehension",
        "set_comprehension",
        "generator_expression",
    ],
    operator_decisions: &[],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "try_statement",
        "with_statement",
        "function_definition",
        "class_definition",
    ],
    cognitive: CognitiveTable {
        rules: &[
            CognitiveRule::nested("if_statement"),
            CognitiveRule::nested("elif_clause"),
            CognitiveRule::nested("for_statement"),
            CognitiveRule::nested("while_statement"),
            CognitiveRule::nested("except_clause"),
            CognitiveRule::nested("conditional_expression"),
            CognitiveRule::flat("boolean_operator"),
            CognitiveRule::zero("else_clause"),
            CognitiveRule::zero("with_statement"),
            CognitiveRule::zero("try_statement"),
        ],
        nesting_kinds: &[
            "if_statement",
            "for_statement",
            "while_statement",
            "try_statement",
            "with_statement",
        ],
        flow_break_kinds: &["break_statement", "continue_statement", "return_statement"],
    },
};

const PARAMETER_KINDS: &[&str] = &[
    "identifier",
    "typed_parameter",
    "default_parameter",
    "typed_default_parameter",
    "list_splat_pattern",
    "dictionary_splat_pattern",
];

const IMPORT_KINDS: &[&str] = &[
    "import_statement",
    "import_from_statement",
    "future_import_statement",
];

/// Parent kinds whose direct identifier children are always bindings.
const BINDING_PARENTS: &[&str] = &[
    "parameters",
    "lambda_parameters",
    "typed_parameter",
    "list_splat_pattern",
    "dictionary_splat_pattern",
];

pub struct PythonAnalyzer {
    language: Language,
}

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// Name of the class whose body directly holds `func`.
    fn enclosing_class(&self, parsed: &ParsedFile, func: Node) -> Option<String> {
        let mut parent = func.parent()?;
        if parent.kind() == "decorated_definition" {
            parent = parent.parent()?;
        }
        if parent.kind() != "block" {
            return None;
        }
        let class = parent.parent()?;
        if class.kind() != "class_definition" {
            return None;
        }
        class
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n).to_string())
    }

    fn count_parameters(&self, func: Node) -> usize {
        func.child_by_field_name("parameters")
            .map(|params| {
                named_children(params)
                    .filter(|p| PARAMETER_KINDS.contains(&p.kind()))
                    .count()
            })
            .unwrap_or(0)
    }

    fn method_definitions(&self, parsed: &ParsedFile, class: Node, class_name: &str) -> Vec<Definition> {
        let Some(body) = class.child_by_field_name("body") else {
            return Vec::new();
        };
        named_children(body)
            .filter_map(|member| {
                let (func, decorated) = unwrap_decorated(member);
                if func.kind() != "function_definition" {
                    return None;
                }
                let name = func.child_by_field_name("name")?;
                let mut def = Definition::new(
                    parsed.node_text(name),
                    SymbolKind::Function,
                    Span::from_node(func).start_line,
                );
                def.parent = Some(class_name.to_string());
                def.is_decorated = decorated;
                Some(def)
            })
            .collect()
    }

    /// The UPPER_CASE target of a module-level `NAME = value` statement.
    fn constant_name<'t>(&self, stmt: Node<'t>) -> Option<Node<'t>> {
        if stmt.kind() != "expression_statement" {
            return None;
        }
        let assignment = stmt.named_child(0)?;
        if assignment.kind() != "assignment" {
            return None;
        }
        assignment
            .child_by_field_name("left")
            .filter(|left| left.kind() == "identifier")
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// `(definition, is_decorated)` for a possibly decorated statement.
fn unwrap_decorated(node: Node) -> (Node, bool) {
    if node.kind() == "decorated_definition" {
        if let Some(def) = node.child_by_field_name("definition") {
            return (def, true);
        }
    }
    (node, false)
}

fn is_field(parent: Node, field: &str, node: Node) -> bool {
    parent.child_by_field_name(field) == Some(node)
}

/// Whether the identifier binds a name rather than using one.
fn is_binding(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "function_definition" | "class_definition" => is_field(parent, "name", node),
        "assignment" => is_field(parent, "left", node),
        "default_parameter" | "typed_default_parameter" | "keyword_argument" => {
            is_field(parent, "name", node)
        }
        kind => BINDING_PARENTS.contains(&kind),
    }
}

/// Conventional constant name: upper case letters, digits and underscores.
fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn language_id(&self) -> LanguageId {
        LanguageId::Python
    }

    fn config(&self) -> &'static LanguageConfig {
        &PYTHON_CONFIG
    }

    fn grammar(&self) -> &Language {
        &self.language
    }

    fn find_functions<'t>(&self, parsed: &'t ParsedFile) -> Vec<FunctionSite<'t>> {
        let mut sites = Vec::new();
        let mut stack = vec![parsed.root()];

        while let Some(node) = stack.pop() {
            if node.kind() == "function_definition" {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| parsed.node_text(n).to_string());
                let class = self.enclosing_class(parsed, node);
                let (name, kind) = match (name, class) {
                    (Some(name), Some(class)) => {
                        (Some(format!("{}.{}", class, name)), FunctionKind::Method)
                    }
                    (name, _) => (name, FunctionKind::Function),
                };
                sites.push(FunctionSite {
                    node,
                    record: FunctionRecord {
                        name,
                        kind,
                        span: Span::from_node(node),
                        parameter_count: self.count_parameters(node),
                    },
                });
            }
            stack.extend(children_rev(node));
        }

        sites
    }

    fn extract_definitions(&self, parsed: &ParsedFile) -> Vec<Definition> {
        let mut definitions = Vec::new();

        for stmt in named_children(parsed.root()) {
            let (node, decorated) = unwrap_decorated(stmt);
            match node.kind() {
                "function_definition" | "class_definition" => {
                    let Some(name_node) = node.child_by_field_name("name") else {
                        continue;
                    };
                    let name = parsed.node_text(name_node);
                    let kind = if node.kind() == "class_definition" {
                        SymbolKind::Class
                    } else {
                        SymbolKind::Function
                    };
                    let mut def = Definition::new(name, kind, Span::from_node(node).start_line);
                    def.is_decorated = decorated;
                    definitions.push(def);

                    if kind == SymbolKind::Class {
                        definitions.extend(self.method_definitions(parsed, node, name));
                    }
                }
                _ => {
                    if let Some(left) = self.constant_name(node) {
                        let name = parsed.node_text(left);
                        if is_constant_name(name) {
                            definitions.push(Definition::new(
                                name,
                                SymbolKind::Variable,
                                Span::from_node(node).start_line,
                            ));
                        }
                    }
                }
            }
        }

        definitions
    }

    fn extract_references(&self, parsed: &ParsedFile) -> HashSet<String> {
        let mut references = HashSet::new();
        let mut stack = vec![parsed.root()];

        while let Some(node) = stack.pop() {
            if IMPORT_KINDS.contains(&node.kind()) {
                continue;
            }
            if node.kind() == "identifier" && !is_binding(node) {
                references.insert(parsed.node_text(node).to_string());
            }
            stack.extend(children_rev(node));
        }

        references
    }

    fn is_magic_name(&self, name: &str) -> bool {
        name.len() > 4 && name.starts_with("__") && name.ends_with("__")
    }

    fn builtin_patterns(&self) -> Vec<PatternDef> {
        use PatternCategory::*;

        vec![
            PatternDef::new(
                "eval_exec_calls",
                Security,
                Severity::Error,
                "eval() or exec() call",
                r#"(call
  function: (identifier) @func_name
  (#match? @func_name "^(eval|exec)$")) @dangerous_call"#,
                "dangerous_call",
            ),
            PatternDef::new(
                "subprocess_os_calls",
                Security,
                Severity::Warning,
                "subprocess or os process call",
                r#"(call
  function: (attribute
    object: (identifier) @module
    attribute: (identifier) @method)
  (#match? @module "^(subprocess|os)$")
  (#match? @method "^(call|run|system|popen|Popen|spawn|execv|execve)$")) @subprocess_call"#,
                "subprocess_call",
            ),
            PatternDef::new(
                "shell_true_kwarg",
                Security,
                Severity::Error,
                "call with shell=True",
                r#"(call
  arguments: (argument_list
    (keyword_argument
      name: (identifier) @kw_name
      value: (true) @shell_true)
    (#eq? @kw_name "shell"))) @shell_true_call"#,
                "shell_true_call",
            ),
            PatternDef::new(
                "hardcoded_secrets",
                Security,
                Severity::Error,
                "string literal assigned to a secret-like name",
                r#"(assignment
  left: (identifier) @var_name
  right: (string) @secret_value
  (#match? @var_name "(?i)(password|secret|api_key|token|credential)")) @hardcoded_secret"#,
                "hardcoded_secret",
            ),
            PatternDef::new(
                "sql_string_concat",
                Security,
                Severity::Warning,
                "SQL string built by concatenation",
                r#"(binary_operator
  left: (string) @sql_string
  operator: "+"
  (#match? @sql_string "(?i)(SELECT|INSERT|UPDATE|DELETE|FROM|WHERE)")) @sql_concat"#,
                "sql_concat",
            ),
            PatternDef::new(
                "fstring_with_interpolation",
                Security,
                Severity::Info,
                "f-string with interpolated values",
                r#"(string
  (string_start) @start
  (interpolation) @interp
  (#match? @start "^[fF]")) @fstring"#,
                "fstring",
            ),
            PatternDef::new(
                "bare_except",
                CodeSmell,
                Severity::Warning,
                "bare except clause catches every exception",
                "(except_clause) @except_clause",
                "except_clause",
            )
            .with_filter(PostFilter::NamedChildrenOnly {
                capture: "except_clause".to_string(),
                kinds: vec!["block".to_string(), "comment".to_string()],
            }),
            PatternDef::new(
                "pass_only_except",
                CodeSmell,
                Severity::Warning,
                "except block that only passes",
                "(except_clause (block (pass_statement)) @handler) @swallowed_except",
                "swallowed_except",
            )
            .with_filter(PostFilter::NamedChildrenOnly {
                capture: "handler".to_string(),
                kinds: vec!["pass_statement".to_string(), "comment".to_string()],
            }),
            PatternDef::new(
                "deeply_nested_if",
                CodeSmell,
                Severity::Warning,
                "if statements nested three levels deep",
                r#"(if_statement
  consequence: (block
    (if_statement
      consequence: (block
        (if_statement) @level3)) @level2)) @level1"#,
                "level1",
            ),
            PatternDef::new(
                "too_many_parameters",
                CodeSmell,
                Severity::Warning,
                "function declares more than five parameters",
                "(function_definition parameters: (parameters) @params) @function",
                "function",
            )
            .with_filter(PostFilter::MoreNamedChildrenThan {
                capture: "params".to_string(),
                limit: 5,
                kinds: PARAMETER_KINDS.iter().map(|k| k.to_string()).collect(),
            }),
            PatternDef::new(
                "missing_docstring",
                Documentation,
                Severity::Info,
                "function without a docstring",
                "(function_definition name: (identifier) @name) @function",
                "name",
            )
            .with_filter(PostFilter::Without {
                query: "(function_definition name: (identifier) @name body: (block . (expression_statement (string))))"
                    .to_string(),
                capture: "name".to_string(),
            }),
            PatternDef::new(
                "star_import",
                Imports,
                Severity::Warning,
                "wildcard import",
                r#"(import_from_statement
  module_name: (dotted_name) @module
  (wildcard_import) @star) @star_import"#,
                "star_import",
            ),
            PatternDef::new(
                "global_statement",
                CodeSmell,
                Severity::Info,
                "global statement",
                "(global_statement) @global",
                "global",
            ),
            PatternDef::new(
                "chained_comparison",
                CodeSmell,
                Severity::Info,
                "comparison chain with three or more operands",
                "(comparison_operator) @comparison",
                "comparison",
            )
            .with_filter(PostFilter::MoreNamedChildrenThan {
                capture: "comparison".to_string(),
                limit: 2,
                kinds: Vec::new(),
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::patterns::PatternSet;

    fn parse_python(source: &str) -> (PythonAnalyzer, ParsedFile) {
        let analyzer = PythonAnalyzer::new();
        let parsed = ParsedFile::parse(&analyzer, "test.py", source.as_bytes()).unwrap();
        (analyzer, parsed)
    }

    #[test]
    fn test_find_functions_qualifies_methods() {
        let source = r#"
def simple():
    pass

class Repo:
    def load(self, key, default=None, *args, **kwargs):
        pass

    @staticmethod
    def build():
        def inner(a: int, b: str = ""):
            pass
        return inner
"#;
        let (analyzer, parsed) = parse_python(source);
        let sites = analyzer.find_functions(&parsed);
        let names: Vec<_> = sites.iter().map(|s| s.record.display_name().to_string()).collect();
        assert_eq!(names, vec!["simple", "Repo.load", "Repo.build", "inner"]);

        assert_eq!(sites[0].record.kind, FunctionKind::Function);
        assert_eq!(sites[1].record.kind, FunctionKind::Method);
        assert_eq!(sites[1].record.parameter_count, 5);
        assert_eq!(sites[3].record.parameter_count, 2);
        assert_eq!(sites[1].record.line(), 6);
    }

    #[test]
    fn test_extract_definitions() {
        let source = r#"
import os
MAX_RETRIES = 3
counter = 0

@dataclass
class Config:
    host: str

    def __init__(self):
        pass

def main():
    pass
"#;
        let (analyzer, parsed) = parse_python(source);
        let defs = analyzer.extract_definitions(&parsed);
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["MAX_RETRIES", "Config", "__init__", "main"]);

        let config = defs.iter().find(|d| d.name == "Config").unwrap();
        assert!(config.is_decorated);
        assert_eq!(config.kind, SymbolKind::Class);

        let init = defs.iter().find(|d| d.name == "__init__").unwrap();
        assert_eq!(init.parent.as_deref(), Some("Config"));
    }

    #[test]
    fn test_references_skip_bindings_and_imports() {
        let source = r#"
from helpers import unused_import
def helper(arg, flag=True):
    return arg

result = helper(value, flag=False)
obj.method()
"#;
        let (analyzer, parsed) = parse_python(source);
        let refs = analyzer.extract_references(&parsed);
        assert!(refs.contains("helper"));
        assert!(refs.contains("value"));
        assert!(refs.contains("arg"));
        assert!(refs.contains("method"));
        assert!(!refs.contains("unused_import"));
        assert!(!refs.contains("flag"));
        assert!(!refs.contains("result"));
    }

    #[test]
    fn test_constant_names() {
        assert!(is_constant_name("MAX_RETRIES"));
        assert!(is_constant_name("V2"));
        assert!(!is_constant_name("counter"));
        assert!(!is_constant_name("_"));
        assert!(!is_constant_name("Config"));
    }

    #[test]
    fn test_magic_names() {
        let analyzer = PythonAnalyzer::new();
        assert!(analyzer.is_magic_name("__init__"));
        assert!(!analyzer.is_magic_name("__"));
        assert!(!analyzer.is_magic_name("_private"));
    }

    #[test]
    fn test_builtin_library_compiles() {
        let analyzer = PythonAnalyzer::new();
        let compiled = PatternSet::new(analyzer.builtin_patterns()).compile(analyzer.grammar());
        assert!(compiled.skipped().is_empty(), "{:?}", compiled.skipped());
        assert_eq!(compiled.len(), 14);
    }

    #[test]
    fn test_builtin_library_matches() {
        let source = r#"
from os.path import *
API_TOKEN = "sk-1234"

def run(cmd, user_id):
    """Run things."""
    global counter
    eval(cmd)
    subprocess.run(cmd, shell=True)
    query = "SELECT * FROM users WHERE id = " + user_id
    try:
        pass
    except:
        pass
    if 0 < user_id < 10:
        return f"user {user_id}"
"#;
        let (analyzer, parsed) = parse_python(source);
        let scan = PatternSet::new(analyzer.builtin_patterns())
            .compile(analyzer.grammar())
            .run(&parsed);

        for id in [
            "star_import",
            "hardcoded_secrets",
            "global_statement",
            "eval_exec_calls",
            "subprocess_os_calls",
            "shell_true_kwarg",
            "sql_string_concat",
            "bare_except",
            "pass_only_except",
            "chained_comparison",
            "fstring_with_interpolation",
        ] {
            assert_eq!(scan.by_pattern(id).len(), 1, "expected one {} match", id);
        }
        assert!(scan.by_pattern("missing_docstring").is_empty());
        assert!(scan.by_pattern("too_many_parameters").is_empty());
    }

    #[test]
    fn test_parameter_pattern_agrees_with_parameter_count() {
        let source = "\
def keyword_only(a, b, c, d, *, e):
    pass

def positional_only(a, b, /, c, d, e):
    pass

def six(a, b, c, d, e, *rest):
    pass
";
        let (analyzer, parsed) = parse_python(source);
        let counts: Vec<_> = analyzer
            .find_functions(&parsed)
            .iter()
            .map(|s| s.record.parameter_count)
            .collect();
        assert_eq!(counts, vec![5, 5, 6]);

        let scan = PatternSet::new(analyzer.builtin_patterns())
            .compile(analyzer.grammar())
            .run(&parsed);
        let hits = scan.by_pattern("too_many_parameters");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, 7);
    }
}
