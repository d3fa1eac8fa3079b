//! Turning analysis results into findings for a whole scan.

mod runner;
mod suppress;
mod types;

pub use runner::{derive_findings, Runner};
pub use suppress::{
    filter_suppressed, matches_suppression, parse_suppressions, SuppressedFinding, Suppression,
    SuppressionType,
};
pub use types::{Finding, Rule, ScanResult, Severity, SkippedFile};
