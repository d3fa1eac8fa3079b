//! Threshold checks over computed function metrics.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::facts::{ComplexityScore, FunctionRecord};

/// Upper bounds a function may reach before it is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub max_cyclomatic: u32,
    pub max_cognitive: u32,
    pub max_nesting: u32,
    pub max_function_lines: usize,
    pub max_parameters: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_cyclomatic: 10,
            max_cognitive: 15,
            max_nesting: 4,
            max_function_lines: 50,
            max_parameters: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SmellKind {
    HighCyclomatic,
    HighCognitive,
    DeepNesting,
    LongFunction,
    LongParameterList,
}

impl SmellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmellKind::HighCyclomatic => "high_cyclomatic",
            SmellKind::HighCognitive => "high_cognitive",
            SmellKind::DeepNesting => "deep_nesting",
            SmellKind::LongFunction => "long_function",
            SmellKind::LongParameterList => "long_parameter_list",
        }
    }
}

impl fmt::Display for SmellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A metric that exceeded its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Smell {
    pub kind: SmellKind,
    pub value: usize,
    pub limit: usize,
}

impl Smell {
    pub fn message(&self, function: &str) -> String {
        let what = match self.kind {
            SmellKind::HighCyclomatic => "cyclomatic complexity",
            SmellKind::HighCognitive => "cognitive complexity",
            SmellKind::DeepNesting => "nesting depth",
            SmellKind::LongFunction => "line count",
            SmellKind::LongParameterList => "parameter count",
        };
        format!("{} has {} {} (limit {})", function, what, self.value, self.limit)
    }
}

/// Every threshold the function exceeds, in a fixed order.
pub fn detect_smells(
    record: &FunctionRecord,
    score: &ComplexityScore,
    line_count: usize,
    thresholds: &Thresholds,
) -> Vec<Smell> {
    let checks = [
        (
            SmellKind::HighCyclomatic,
            score.cyclomatic as usize,
            thresholds.max_cyclomatic as usize,
        ),
        (
            SmellKind::HighCognitive,
            score.cognitive as usize,
            thresholds.max_cognitive as usize,
        ),
        (
            SmellKind::DeepNesting,
            score.max_nesting as usize,
            thresholds.max_nesting as usize,
        ),
        (SmellKind::LongFunction, line_count, thresholds.max_function_lines),
        (
            SmellKind::LongParameterList,
            record.parameter_count,
            thresholds.max_parameters,
        ),
    ];

    checks
        .into_iter()
        .filter(|(_, value, limit)| value > limit)
        .map(|(kind, value, limit)| Smell { kind, value, limit })
        .collect()
}
