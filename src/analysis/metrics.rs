//! Cyclomatic complexity, cognitive complexity and maximum nesting depth.
//!
//! All three metrics are folds over [`Scoped`], a depth-first walk driven by
//! an explicit work stack. Each stack entry carries the nesting depth of its
//! parent scope, so a sibling always restarts at its parent's depth and deep
//! trees cannot overflow the call stack.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use super::facts::{ComplexityScore, Rating};
use super::languages::{CognitiveTable, LanguageConfig};
use super::traits::children_rev;

/// Rating cut-offs on cyclomatic complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingBands {
    /// Highest cyclomatic value still rated low.
    pub low_max: u32,
    /// Highest cyclomatic value still rated medium.
    pub medium_max: u32,
}

impl Default for RatingBands {
    fn default() -> Self {
        Self {
            low_max: 4,
            medium_max: 10,
        }
    }
}

impl RatingBands {
    pub fn rate(&self, cyclomatic: u32) -> Rating {
        if cyclomatic <= self.low_max {
            Rating::Low
        } else if cyclomatic <= self.medium_max {
            Rating::Medium
        } else {
            Rating::High
        }
    }
}

/// Depth-first walk over the strict descendants of a node.
///
/// Yields each descendant with the depth of the scope it sits in. A node
/// for which `opens` returns true puts its own subtree one level deeper.
pub struct Scoped<'t, F> {
    stack: Vec<(Node<'t>, u32)>,
    opens: F,
}

impl<'t, F> Scoped<'t, F>
where
    F: Fn(Node<'t>) -> bool,
{
    pub fn new(root: Node<'t>, opens: F) -> Self {
        let stack = children_rev(root).map(|child| (child, 0)).collect();
        Self { stack, opens }
    }
}

impl<'t, F> Iterator for Scoped<'t, F>
where
    F: Fn(Node<'t>) -> bool,
{
    type Item = (Node<'t>, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth) = self.stack.pop()?;
        let inner = if (self.opens)(node) { depth + 1 } else { depth };
        self.stack
            .extend(children_rev(node).map(|child| (child, inner)));
        Some((node, depth))
    }
}

/// 1 plus the number of decision points below `node`.
pub fn cyclomatic_complexity(node: Node, config: &LanguageConfig) -> u32 {
    Scoped::new(node, |_| false)
        .filter(|(n, _)| config.is_decision(*n))
        .fold(1, |acc, _| acc + 1)
}

/// Nesting-weighted readability cost of `node`.
pub fn cognitive_complexity(node: Node, table: &CognitiveTable) -> u32 {
    Scoped::new(node, |n| table.increases_nesting(n.kind())).fold(0, |acc, (n, depth)| {
        let structural = table.rule_for(n).map_or(0, |rule| rule.increment(depth));
        let flow_break = u32::from(depth > 0 && table.is_flow_break(n.kind()));
        acc + structural + flow_break
    })
}

/// Deepest nesting level below `node`. The root itself is not counted.
pub fn max_nesting_depth(node: Node, config: &LanguageConfig) -> u32 {
    let opens = |n: Node| config.is_nesting(n.kind());
    Scoped::new(node, opens)
        .map(|(n, depth)| if opens(n) { depth + 1 } else { depth })
        .max()
        .unwrap_or(0)
}

/// All three metrics for one function node.
pub fn score_function(node: Node, config: &LanguageConfig, bands: &RatingBands) -> ComplexityScore {
    let cyclomatic = cyclomatic_complexity(node, config);
    ComplexityScore {
        cyclomatic,
        cognitive: cognitive_complexity(node, &config.cognitive),
        max_nesting: max_nesting_depth(node, config),
        rating: bands.rate(cyclomatic),
    }
}
