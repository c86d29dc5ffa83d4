//! Record and result types for kpair.
//!
//! These types carry data from the parse workers to the resolver and from
//! the evaluator to the console summary.

use serde::{Deserialize, Serialize};

/// Which grammar a file is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Arbitrary source text, scanned for macro references
    Source,
    /// Kconfig description, parsed for definitions and references
    Declarative,
}

/// Per-file parse result produced by a worker.
///
/// Records are transient: they are merged by the resolver and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Repository-relative path
    pub path: String,
    /// Grammar used
    pub kind: FileKind,
    /// Referenced symbols in order of appearance (duplicates allowed)
    pub references: Vec<String>,
    /// Symbols introduced by `config`/`menuconfig` lines (declarative files only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<String>,
}

impl SourceRecord {
    /// Record for a scanned source file.
    pub fn source(path: impl Into<String>, references: Vec<String>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Source,
            references,
            definitions: Vec::new(),
        }
    }

    /// Record for a parsed Kconfig file.
    pub fn declarative(path: impl Into<String>, defined: Vec<String>, references: Vec<String>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Declarative,
            references,
            definitions: defined,
        }
    }

    /// Whether the file yielded nothing.
    pub fn is_empty(&self) -> bool {
        self.references.is_empty() && self.definitions.is_empty()
    }
}

/// Summary of one sampling session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Distinct symbols in the sampled universe(s)
    pub total_symbols: usize,

    /// Pairs and singletons enumerated
    pub total_units: u64,

    /// Probes submitted to the oracle
    pub total_probes: u64,

    /// Satisfiable probes (one artifact each)
    pub total_valid: u64,

    /// Unsatisfiable probes
    pub total_invalid: u64,

    /// Total runtime in seconds
    pub runtime_secs: f64,

    /// Probes per hour throughput
    pub throughput_per_hour: f64,

    /// Valid share of probes (0.0 - 1.0)
    pub validity_rate: f64,
}

impl RunStats {
    /// Calculate derived stats.
    pub fn finalize(&mut self) {
        if self.total_probes > 0 {
            self.validity_rate = self.total_valid as f64 / self.total_probes as f64;
        }
        if self.runtime_secs > 0.0 {
            self.throughput_per_hour = self.total_probes as f64 / self.runtime_secs * 3600.0;
        }
    }

    /// Final console line.
    pub fn summary_line(&self) -> String {
        format!(
            "Generated {} configurations of {} initial pairs",
            self.total_valid,
            self.total_valid + self.total_invalid
        )
    }
}
