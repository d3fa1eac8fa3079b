//! TypeScript, TSX and JavaScript analyzer.
//!
//! The three grammars share node kinds for everything the metric engine and
//! the dead-code heuristic look at, so one analyzer type serves all of them;
//! only the grammar handle and the language id differ.

use std::collections::HashSet;

use tree_sitter::{Language, Node};

use super::{CognitiveRule, CognitiveTable, LanguageConfig, LanguageId, OperatorDecision};
use crate::analysis::facts::{Definition, FunctionKind, FunctionRecord, Span, SymbolKind};
use crate::analysis::patterns::{PatternCategory, PatternDef, PostFilter};
use crate::analysis::traits::{children_rev, named_children, FunctionSite};
use crate::analysis::{LanguageAnalyzer, ParsedFile};
use crate::detect::Severity;

const LOGICAL_OPERATORS: &[&str] = &["&&", "||"];

static ECMASCRIPT_CONFIG: LanguageConfig = LanguageConfig {
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_case",
        "catch_clause",
        "ternary_expression",
    ],
    operator_decisions: &[OperatorDecision {
        kind: "binary_expression",
        operators: LOGICAL_OPERATORS,
    }],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "try_statement",
        "switch_statement",
        "function_declaration",
        "method_definition",
        "arrow_function",
        "class_declaration",
    ],
    cognitive: CognitiveTable {
        rules: &[
            CognitiveRule::nested("if_statement"),
            CognitiveRule::nested("for_statement"),
            CognitiveRule::nested("for_in_statement"),
            CognitiveRule::nested("while_statement"),
            CognitiveRule::nested("do_statement"),
            CognitiveRule::nested("catch_clause"),
            CognitiveRule::nested("ternary_expression"),
            CognitiveRule::flat("switch_case"),
            CognitiveRule::flat_for("binary_expression", LOGICAL_OPERATORS),
            CognitiveRule::zero("else_clause"),
        ],
        nesting_kinds: &[
            "if_statement",
            "for_statement",
            "for_in_statement",
            "while_statement",
            "do_statement",
            "try_statement",
            "switch_statement",
        ],
        flow_break_kinds: &["break_statement", "continue_statement", "return_statement"],
    },
};

const PARAMETER_KINDS: &[&str] = &[
    "required_parameter",
    "optional_parameter",
    "identifier",
    "rest_pattern",
    "assignment_pattern",
    "object_pattern",
    "array_pattern",
];

const CLASS_KINDS: &[&str] = &["class_declaration", "abstract_class_declaration", "class"];

const FUNCTION_VALUE_KINDS: &[&str] = &[
    "arrow_function",
    "function_expression",
    "generator_function",
];

/// Declaration kinds whose `name` field binds the declared symbol.
const NAMED_DECLARATIONS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "generator_function",
    "class_declaration",
    "abstract_class_declaration",
    "class",
    "method_definition",
    "method_signature",
    "abstract_method_signature",
    "public_field_definition",
    "type_alias_declaration",
    "interface_declaration",
    "enum_declaration",
    "variable_declarator",
    "type_parameter",
    "property_signature",
];

const REFERENCE_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "property_identifier",
    "shorthand_property_identifier",
];

pub struct EcmaScriptAnalyzer {
    id: LanguageId,
    language: Language,
}

impl EcmaScriptAnalyzer {
    pub fn typescript() -> Self {
        Self {
            id: LanguageId::TypeScript,
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }

    pub fn tsx() -> Self {
        Self {
            id: LanguageId::Tsx,
            language: tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    pub fn javascript() -> Self {
        Self {
            id: LanguageId::JavaScript,
            language: tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    fn class_name(&self, parsed: &ParsedFile, method: Node) -> Option<String> {
        let body = method.parent()?;
        if body.kind() != "class_body" {
            return None;
        }
        let class = body.parent()?;
        if !CLASS_KINDS.contains(&class.kind()) {
            return None;
        }
        class
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n).to_string())
    }

    /// Name and kind for a function-like node, or `None` if it is not one we report.
    fn describe(&self, parsed: &ParsedFile, node: Node) -> Option<(Option<String>, FunctionKind)> {
        let text = |n: Node| parsed.node_text(n).to_string();
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => Some((
                node.child_by_field_name("name").map(text),
                FunctionKind::Function,
            )),
            "method_definition" => {
                let name = node.child_by_field_name("name").map(text)?;
                let qualified = match self.class_name(parsed, node) {
                    Some(class) => format!("{}.{}", class, name),
                    None => name,
                };
                Some((Some(qualified), FunctionKind::Method))
            }
            kind if FUNCTION_VALUE_KINDS.contains(&kind) => {
                let fn_kind = if kind == "arrow_function" {
                    FunctionKind::Arrow
                } else {
                    FunctionKind::Function
                };
                let parent = node.parent()?;
                match parent.kind() {
                    "variable_declarator" => {
                        let name = parent
                            .child_by_field_name("name")
                            .filter(|n| n.kind() == "identifier")
                            .map(text)?;
                        Some((Some(name), fn_kind))
                    }
                    // export default function () {}
                    "export_statement" => Some((None, fn_kind)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn count_parameters(&self, func: Node) -> usize {
        if let Some(params) = func.child_by_field_name("parameters") {
            return named_children(params)
                .filter(|p| PARAMETER_KINDS.contains(&p.kind()))
                .count();
        }
        // x => x + 1
        usize::from(func.child_by_field_name("parameter").is_some())
    }

    fn method_definitions(&self, parsed: &ParsedFile, class: Node, class_name: &str) -> Vec<Definition> {
        let Some(body) = class.child_by_field_name("body") else {
            return Vec::new();
        };
        let mut definitions = Vec::new();
        let mut pending_decorator = false;

        for member in named_children(body) {
            match member.kind() {
                "decorator" => pending_decorator = true,
                "method_definition" => {
                    if let Some(name) = member.child_by_field_name("name") {
                        let mut def = Definition::new(
                            parsed.node_text(name),
                            SymbolKind::Function,
                            Span::from_node(member).start_line,
                        );
                        def.parent = Some(class_name.to_string());
                        def.is_decorated = pending_decorator || has_decorator(member);
                        definitions.push(def);
                    }
                    pending_decorator = false;
                }
                "comment" => {}
                _ => pending_decorator = false,
            }
        }

        definitions
    }

    fn declaration_definitions(
        &self,
        parsed: &ParsedFile,
        node: Node,
        exported: bool,
        out: &mut Vec<Definition>,
    ) {
        let line = Span::from_node(node).start_line;
        let named = |kind: SymbolKind| {
            node.child_by_field_name("name").map(|n| {
                let mut def = Definition::new(parsed.node_text(n), kind, line);
                def.is_exported = exported;
                def.is_decorated = has_decorator(node);
                def
            })
        };

        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                out.extend(named(SymbolKind::Function));
            }
            kind if CLASS_KINDS.contains(&kind) => {
                if let Some(def) = named(SymbolKind::Class) {
                    let methods = self.method_definitions(parsed, node, &def.name);
                    out.push(def);
                    out.extend(methods);
                }
            }
            "type_alias_declaration" | "interface_declaration" | "enum_declaration" => {
                out.extend(named(SymbolKind::Type));
            }
            "lexical_declaration" | "variable_declaration" => {
                for declarator in named_children(node).filter(|n| n.kind() == "variable_declarator") {
                    let Some(name) = declarator
                        .child_by_field_name("name")
                        .filter(|n| n.kind() == "identifier")
                    else {
                        continue;
                    };
                    let kind = match declarator.child_by_field_name("value") {
                        Some(value) if FUNCTION_VALUE_KINDS.contains(&value.kind()) => {
                            SymbolKind::Function
                        }
                        _ => SymbolKind::Variable,
                    };
                    let mut def = Definition::new(
                        parsed.node_text(name),
                        kind,
                        Span::from_node(declarator).start_line,
                    );
                    def.is_exported = exported;
                    out.push(def);
                }
            }
            _ => {}
        }
    }
}

fn has_decorator(node: Node) -> bool {
    named_children(node).any(|c| c.kind() == "decorator")
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
        kind if NAMED_DECLARATIONS.contains(&kind) => is_field(parent, "name", node),
        "required_parameter" | "optional_parameter" => is_field(parent, "pattern", node),
        "arrow_function" => is_field(parent, "parameter", node),
        "assignment_pattern" => is_field(parent, "left", node),
        "pair" | "pair_pattern" => is_field(parent, "key", node),
        "formal_parameters" | "rest_pattern" => true,
        _ => false,
    }
}

impl LanguageAnalyzer for EcmaScriptAnalyzer {
    fn language_id(&self) -> LanguageId {
        self.id
    }

    fn config(&self) -> &'static LanguageConfig {
        &ECMASCRIPT_CONFIG
    }

    fn grammar(&self) -> &Language {
        &self.language
    }

    fn find_functions<'t>(&self, parsed: &'t ParsedFile) -> Vec<FunctionSite<'t>> {
        let mut sites = Vec::new();
        let mut stack = vec![parsed.root()];

        while let Some(node) = stack.pop() {
            if let Some((name, kind)) = self.describe(parsed, node) {
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
            if stmt.kind() == "export_statement" {
                for decl in named_children(stmt) {
                    self.declaration_definitions(parsed, decl, true, &mut definitions);
                }
            } else {
                self.declaration_definitions(parsed, stmt, false, &mut definitions);
            }
        }

        definitions
    }

    fn extract_references(&self, parsed: &ParsedFile) -> HashSet<String> {
        let mut references = HashSet::new();
        let mut stack = vec![parsed.root()];

        while let Some(node) = stack.pop() {
            if node.kind() == "import_statement" {
                continue;
            }
            if REFERENCE_KINDS.contains(&node.kind()) && !is_binding(node) {
                references.insert(parsed.node_text(node).to_string());
            }
            stack.extend(children_rev(node));
        }

        references
    }

    fn is_magic_name(&self, name: &str) -> bool {
        name == "constructor"
    }

    fn builtin_patterns(&self) -> Vec<PatternDef> {
        use PatternCategory::*;

        let mut patterns = vec![
            PatternDef::new(
                "eval_call",
                Security,
                Severity::Error,
                "eval() call",
                r#"(call_expression
  function: (identifier) @func
  (#eq? @func "eval")) @call"#,
                "call",
            ),
            PatternDef::new(
                "function_constructor",
                Security,
                Severity::Error,
                "new Function() builds code from strings",
                r#"(new_expression
  constructor: (identifier) @ctor
  (#eq? @ctor "Function")) @new_function"#,
                "new_function",
            ),
            PatternDef::new(
                "inner_html_assignment",
                Security,
                Severity::Warning,
                "assignment to innerHTML or outerHTML",
                r#"(assignment_expression
  left: (member_expression
    property: (property_identifier) @prop)
  (#match? @prop "^(innerHTML|outerHTML)$")) @assignment"#,
                "assignment",
            ),
            PatternDef::new(
                "child_process_exec",
                Security,
                Severity::Warning,
                "child_process command execution",
                r#"(call_expression
  function: (member_expression
    object: (identifier) @module
    property: (property_identifier) @method)
  (#match? @module "^(child_process|cp)$")
  (#match? @method "^(exec|execSync|spawn|spawnSync)$")) @exec_call"#,
                "exec_call",
            ),
            PatternDef::new(
                "empty_catch",
                CodeSmell,
                Severity::Warning,
                "catch block with an empty body",
                "(catch_clause body: (statement_block) @body) @empty_catch",
                "empty_catch",
            )
            .with_filter(PostFilter::NamedChildrenOnly {
                capture: "body".to_string(),
                kinds: vec!["comment".to_string()],
            }),
            PatternDef::new(
                "too_many_parameters",
                CodeSmell,
                Severity::Warning,
                "function declares more than five parameters",
                "(formal_parameters) @params",
                "params",
            )
            .with_filter(PostFilter::MoreNamedChildrenThan {
                capture: "params".to_string(),
                limit: 5,
                kinds: Vec::new(),
            }),
            PatternDef::new(
                "debugger_statement",
                CodeSmell,
                Severity::Warning,
                "debugger statement left in code",
                "(debugger_statement) @debugger",
                "debugger",
            ),
        ];

        for pattern in &mut patterns {
            pattern.languages = vec![self.id];
        }
        patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::patterns::PatternSet;

    fn parse_ts(source: &str) -> (EcmaScriptAnalyzer, ParsedFile) {
        let analyzer = EcmaScriptAnalyzer::typescript();
        let parsed = ParsedFile::parse(&analyzer, "test.ts", source.as_bytes()).unwrap();
        (analyzer, parsed)
    }

    #[test]
    fn test_find_functions() {
        let source = r#"
function load(a: string, b?: number, ...rest: string[]) {}
const double = x => x * 2;
const handler = function (event) {};
class Store {
  constructor(private readonly db: Db) {}
  fetch(key: string) { return this.db.get(key); }
}
export default function () {}
items.map((item) => item.id);
"#;
        let (analyzer, parsed) = parse_ts(source);
        let sites = analyzer.find_functions(&parsed);
        let names: Vec<_> = sites.iter().map(|s| s.record.name.clone()).collect();
        assert_eq!(
            names,
            vec![
                Some("load".to_string()),
                Some("double".to_string()),
                Some("handler".to_string()),
                Some("Store.constructor".to_string()),
                Some("Store.fetch".to_string()),
                None,
            ]
        );
        assert_eq!(sites[0].record.parameter_count, 3);
        assert_eq!(sites[1].record.kind, FunctionKind::Arrow);
        assert_eq!(sites[1].record.parameter_count, 1);
        assert_eq!(sites[3].record.kind, FunctionKind::Method);
    }

    #[test]
    fn test_logical_operators_are_decisions() {
        let (analyzer, parsed) = parse_ts(
            "function f(a, b, c) {\n  if (a && b || c) { return 1; }\n  return a + b;\n}\n",
        );
        let sites = analyzer.find_functions(&parsed);
        let score = crate::analysis::metrics::score_function(
            sites[0].node,
            analyzer.config(),
            &Default::default(),
        );
        // if, &&, ||
        assert_eq!(score.cyclomatic, 4);
        // if: 1, &&: 1, ||: 1, nested return: 1
        assert_eq!(score.cognitive, 4);
        assert_eq!(score.max_nesting, 1);
    }

    #[test]
    fn test_extract_definitions() {
        let source = r#"
import { helper } from "./helper";
const UNUSED_SECRET = "x";
let counter = 0;
export function publicApi() {}
function internal() {}
export const arrow = () => 1;
type Alias = string;
interface Shape { area(): number }
class Widget {
  constructor() {}
  render() {}
}
"#;
        let (analyzer, parsed) = parse_ts(source);
        let defs = analyzer.extract_definitions(&parsed);
        let summary: Vec<_> = defs
            .iter()
            .map(|d| (d.name.as_str(), d.kind, d.is_exported))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("UNUSED_SECRET", SymbolKind::Variable, false),
                ("counter", SymbolKind::Variable, false),
                ("publicApi", SymbolKind::Function, true),
                ("internal", SymbolKind::Function, false),
                ("arrow", SymbolKind::Function, true),
                ("Alias", SymbolKind::Type, false),
                ("Shape", SymbolKind::Type, false),
                ("Widget", SymbolKind::Class, false),
                ("constructor", SymbolKind::Function, false),
                ("render", SymbolKind::Function, false),
            ]
        );
        assert_eq!(defs[8].parent.as_deref(), Some("Widget"));
    }

    #[test]
    fn test_references() {
        let source = r#"
import { helper } from "./helper";
function run(input: Options, retries = 3) {
  const result = helper(input);
  return new Widget({ size: result }).render();
}
"#;
        let (analyzer, parsed) = parse_ts(source);
        let refs = analyzer.extract_references(&parsed);
        assert!(refs.contains("helper"));
        assert!(refs.contains("input"));
        assert!(refs.contains("Options"));
        assert!(refs.contains("Widget"));
        assert!(refs.contains("render"));
        assert!(!refs.contains("run"));
        assert!(!refs.contains("retries"));
        assert!(!refs.contains("size"));
    }

    #[test]
    fn test_builtin_library_compiles_for_every_grammar() {
        for analyzer in [
            EcmaScriptAnalyzer::typescript(),
            EcmaScriptAnalyzer::tsx(),
            EcmaScriptAnalyzer::javascript(),
        ] {
            let compiled =
                PatternSet::new(analyzer.builtin_patterns()).compile(analyzer.grammar());
            assert!(
                compiled.skipped().is_empty(),
                "{}: {:?}",
                analyzer.language_id(),
                compiled.skipped()
            );
            assert_eq!(compiled.len(), 7);
        }
    }

    #[test]
    fn test_builtin_library_matches_javascript() {
        let source = r#"
function risky(a, b, c, d, e, f) {
  debugger;
  eval(a);
  const fn = new Function("return 1");
  el.innerHTML = b;
  child_process.exec(c);
  try { d(); } catch (err) { }
  try { e(); } catch (err) { log(err); }
}
"#;
        let analyzer = EcmaScriptAnalyzer::javascript();
        let parsed = ParsedFile::parse(&analyzer, "test.js", source.as_bytes()).unwrap();
        let scan = PatternSet::new(analyzer.builtin_patterns())
            .compile(analyzer.grammar())
            .run(&parsed);

        for id in [
            "debugger_statement",
            "eval_call",
            "function_constructor",
            "inner_html_assignment",
            "child_process_exec",
            "empty_catch",
            "too_many_parameters",
        ] {
            assert_eq!(scan.by_pattern(id).len(), 1, "expected one {} match", id);
        }
    }
}
