//! Tree-sitter backed source analysis.
//!
//! One call parses a file once and runs three passes over the same tree:
//!
//! - metrics: cyclomatic, cognitive and max nesting per function
//! - patterns: the structural query library plus user patterns
//! - dead code: top-level declarations with no in-file reference
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌─────────────────┐
//! │ Source bytes │────▶│ ParsedFile    │────▶│ metrics         │
//! └──────────────┘     │ (tree-sitter) │  ├─▶│ patterns        │──▶ FileAnalysis
//!                      └───────────────┘  └─▶│ dead_code       │
//!        ┌──────────┐          ▲             └─────────────────┘
//!        │ Registry │──────────┘ LanguageAnalyzer + LanguageConfig tables
//!        └──────────┘
//! ```
//!
//! # Adding a New Language
//!
//! 1. Create a module in `src/analysis/languages/`
//! 2. Write its `LanguageConfig` tables and implement `LanguageAnalyzer`
//! 3. Add a `LanguageId` variant and register the analyzer in `Registry::standard`

pub mod dead_code;
mod facts;
mod languages;
pub mod metrics;
pub mod patterns;
pub mod smells;
mod traits;

pub use dead_code::find_dead_code;
pub use facts::{
    ComplexityScore, Confidence, DeadCodeCandidate, Definition, FileAnalysis, FunctionKind,
    FunctionMetrics, FunctionRecord, Rating, Span, SymbolKind,
};
pub use languages::{
    CognitiveRule, CognitiveTable, EcmaScriptAnalyzer, LanguageConfig, LanguageId,
    OperatorDecision, PythonAnalyzer, Registry,
};
pub use metrics::{
    cognitive_complexity, cyclomatic_complexity, max_nesting_depth, score_function, RatingBands,
};
pub use patterns::{
    run_pattern, CaptureMap, CapturedNode, CompiledPatterns, PatternCategory, PatternDef,
    PatternMatch, PatternScan, PatternSet, PostFilter, SkippedPattern,
};
pub use smells::{detect_smells, Smell, SmellKind, Thresholds};
pub use traits::{FunctionSite, LanguageAnalyzer, ParsedFile};

use crate::config::Config;
use crate::error::AnalysisError;

/// Analyze one source buffer given a language identifier string.
///
/// Fails only for an unknown language, a grammar that cannot be loaded, or a
/// parser that returns no tree. Syntax errors in the input are recorded in
/// [`FileAnalysis::has_parse_errors`] and analysis continues.
pub fn analyze_source(
    registry: &Registry,
    language: &str,
    path: &str,
    source: &[u8],
    config: &Config,
) -> Result<FileAnalysis, AnalysisError> {
    let analyzer = registry.by_name(language)?;
    analyze_with(analyzer, path, source, config)
}

/// Analyze one source buffer with a specific analyzer.
pub fn analyze_with(
    analyzer: &dyn LanguageAnalyzer,
    path: &str,
    source: &[u8],
    config: &Config,
) -> Result<FileAnalysis, AnalysisError> {
    let parsed = ParsedFile::parse(analyzer, path, source)?;
    let has_parse_errors = parsed.has_errors();
    if has_parse_errors {
        tracing::debug!(path, "syntax errors; analyzing the recovered tree");
    }

    let functions = function_metrics(analyzer, &parsed, &config.thresholds, &config.rating);

    let scan = if config.passes.patterns {
        PatternSet::assemble(
            analyzer.builtin_patterns(),
            &config.patterns,
            &config.disabled_patterns,
            analyzer.language_id(),
        )
        .compile(analyzer.grammar())
        .run(&parsed)
    } else {
        PatternScan::default()
    };

    let dead_code = if config.passes.dead_code {
        find_dead_code(analyzer, &parsed, &config.entry_points)
    } else {
        Vec::new()
    };

    Ok(FileAnalysis {
        path: parsed.path.clone(),
        language: parsed.language,
        total_lines: parsed.line_count(),
        has_parse_errors,
        functions,
        pattern_matches: scan.matches,
        skipped_patterns: scan.skipped,
        dead_code,
    })
}

/// Score and smell-check every function in the tree, in document order.
pub fn function_metrics(
    analyzer: &dyn LanguageAnalyzer,
    parsed: &ParsedFile,
    thresholds: &Thresholds,
    bands: &RatingBands,
) -> Vec<FunctionMetrics> {
    analyzer
        .find_functions(parsed)
        .into_iter()
        .map(|site| {
            let score = score_function(site.node, analyzer.config(), bands);
            let line_count = site.record.span.line_count();
            let smells = detect_smells(&site.record, &score, line_count, thresholds);
            FunctionMetrics {
                record: site.record,
                score,
                line_count,
                smells,
            }
        })
        .collect()
}
