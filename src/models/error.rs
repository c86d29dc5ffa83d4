//! Error types for kpair.
//!
//! Propagation policy:
//! - File-local parse failures: logged and skipped, never abort a run
//! - Tooling failures (oracle, git, artifact I/O): fatal to the run
//! - Cancellation: controlled abort with a non-zero exit

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for kpair.
#[derive(Debug, Error)]
pub enum KpairError {
    // ═══════════════════════════════════════════════════════════════════
    // FILE-LOCAL: recovered by the caller, the run continues
    // ═══════════════════════════════════════════════════════════════════

    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Malformed statement at {}:{line}: {reason}", path.display())]
    MalformedStatement {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // TOOLING: an external collaborator failed, the run is aborted
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Oracle failed on \"{expr}\": {reason}")]
    OracleFailure { expr: String, reason: String },

    #[error("Oracle timed out after {timeout:?} on \"{expr}\"")]
    OracleTimeout { expr: String, timeout: Duration },

    #[error("File listing failed: {0}")]
    FileListing(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // CANCELLATION
    // ═══════════════════════════════════════════════════════════════════

    #[error("Interrupted by user")]
    Interrupted,

    // ═══════════════════════════════════════════════════════════════════
    // INVARIANT VIOLATED: bug, should not happen
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KpairError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the error is confined to a single input file.
    ///
    /// File-local errors are logged and skipped; everything else aborts the run.
    pub fn is_file_local(&self) -> bool {
        matches!(self, Self::MissingFile(_) | Self::MalformedStatement { .. })
    }

    /// Whether the error comes from the satisfiability oracle.
    pub fn is_oracle(&self) -> bool {
        matches!(self, Self::OracleFailure { .. } | Self::OracleTimeout { .. })
    }
}

/// Result type alias for kpair.
pub type Result<T> = std::result::Result<T, KpairError>;
