//! Single-file dead-code heuristic.
//!
//! Declared top-level symbols minus every identifier the file references.
//! The result is advisory: implicit runtime calls, entry points, dynamic
//! attribute access, inherited call sites and uses from other files are all
//! invisible here. Those cases are graded [`Confidence::Medium`] instead of
//! being hidden.

use super::facts::{Confidence, DeadCodeCandidate, Definition};
use super::traits::{LanguageAnalyzer, ParsedFile};

/// Why a candidate was graded medium, or `None` for high confidence.
fn downgrade_reason(
    analyzer: &dyn LanguageAnalyzer,
    def: &Definition,
    entry_points: &[String],
) -> Option<&'static str> {
    if analyzer.is_magic_name(&def.name) {
        Some("called implicitly by the runtime")
    } else if entry_points.iter().any(|e| e == &def.name) {
        Some("configured entry point")
    } else if def.is_exported {
        Some("exported; may be used by other modules")
    } else if def.is_decorated {
        Some("decorated; may be registered dynamically")
    } else if def.is_method() {
        Some("method; may be called through inheritance or dynamic dispatch")
    } else {
        None
    }
}

/// Declarations with no in-file reference, sorted by line.
pub fn find_dead_code(
    analyzer: &dyn LanguageAnalyzer,
    parsed: &ParsedFile,
    entry_points: &[String],
) -> Vec<DeadCodeCandidate> {
    let references = analyzer.extract_references(parsed);

    let mut candidates: Vec<_> = analyzer
        .extract_definitions(parsed)
        .into_iter()
        .filter(|def| !references.contains(&def.name))
        .map(|def| {
            let reason = downgrade_reason(analyzer, &def, entry_points);
            DeadCodeCandidate {
                confidence: if reason.is_some() {
                    Confidence::Medium
                } else {
                    Confidence::High
                },
                name: def.name,
                kind: def.kind,
                line: def.line,
                reason,
            }
        })
        .collect();

    candidates.sort_by(|a, b| (a.line, &a.name).cmp(&(b.line, &b.name)));
    candidates
}
