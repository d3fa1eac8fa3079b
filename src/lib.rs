//! Gnarl - source complexity analyzer.
//!
//! Gnarl parses Python, TypeScript and JavaScript with tree-sitter and
//! reports, per function, cyclomatic complexity, cognitive complexity and
//! maximum nesting depth. The same tree feeds a library of structural query
//! patterns and a single-file dead-code heuristic.
//!
//! # Architecture
//!
//! - `analysis`: language tables, parsing, metrics, patterns, dead code
//! - `detect`: scan runner, findings and inline suppressions
//! - `config`: YAML configuration
//! - `report`: Output formatting (pretty, JSON, SARIF)
//! - `cli`: command-line front end
//!
//! # Example
//!
//! ```no_run
//! use gnarl::{analyze_source, registry, Config};
//!
//! let source = b"def helper(x):\n    if x:\n        return 1\n    return 0\n";
//! let analysis = analyze_source(registry(), "python", "helper.py", source, &Config::default())?;
//! assert_eq!(analysis.functions[0].score.cyclomatic, 2);
//! # Ok::<(), gnarl::AnalysisError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod report;

use once_cell::sync::OnceCell;

pub use analysis::{
    analyze_source, analyze_with, ComplexityScore, Confidence, DeadCodeCandidate, FileAnalysis,
    FunctionMetrics, LanguageAnalyzer, LanguageId, PatternDef, Registry,
};
pub use config::Config;
pub use detect::{Finding, Runner, ScanResult, Severity};
pub use error::{AnalysisError, ConfigurationError, PatternCompileError};

static REGISTRY: OnceCell<Registry> = OnceCell::new();

/// The standard language registry, built on first use.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::standard)
}
