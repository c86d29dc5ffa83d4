//! Satisfiability oracle module.
//!
//! The oracle decides whether a probe expression is satisfiable under a
//! variability model. It is an external tool; the `Oracle` trait is the seam
//! that lets tests substitute it.

mod command;

pub use command::*;

use crate::models::Result;
use async_trait::async_trait;
use std::path::Path;

/// Outcome of one satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    /// Satisfiable; the text is a satisfying configuration
    Satisfiable(String),
    /// No configuration of the model satisfies the expression
    Unsatisfiable,
}

impl SatResult {
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, Self::Satisfiable(_))
    }
}

/// Capability `(expression, model) → SatResult`.
///
/// Tool failures must surface as `Err`, never as `Unsatisfiable`.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn check(&self, expr: &str, model: &Path) -> Result<SatResult>;
}
