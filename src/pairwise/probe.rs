//! Probe expressions for one sampling unit.

use crate::pairwise::SymbolPair;
use serde::Serialize;

/// A boolean expression submitted to the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeExpression {
    pub expr: String,
}

impl ProbeExpression {
    fn new(expr: String) -> Self {
        Self { expr }
    }
}

impl std::fmt::Display for ProbeExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expr)
    }
}

/// Expand a unit into its probes.
///
/// `A` → `A`, `!A`.
/// `(A, B)` → `A && B`, `!A && !B`, `A && !B`, `!A && B`: every truth
/// assignment of the two symbols.
pub fn probes(unit: &SymbolPair<'_>) -> Vec<ProbeExpression> {
    match *unit {
        SymbolPair::Single(a) => vec![
            ProbeExpression::new(a.to_string()),
            ProbeExpression::new(format!("!{a}")),
        ],
        SymbolPair::Pair(a, b) => vec![
            ProbeExpression::new(format!("{a} && {b}")),
            ProbeExpression::new(format!("!{a} && !{b}")),
            ProbeExpression::new(format!("{a} && !{b}")),
            ProbeExpression::new(format!("!{a} && {b}")),
        ],
    }
}
