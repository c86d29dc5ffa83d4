//! kpair - Kconfig symbol cross-referencing and pairwise configuration sampling.
//!
//! ## Architecture
//!
//! kpair uses two logical pools:
//! - **Worker Pool**: Parses the tree (source scanner and Kconfig parser) on
//!   blocking threads
//! - **Probe Evaluator**: Submits probe expressions to a satisfiability oracle
//!
//! ## Pipelines
//!
//! - **Global**: git ls-files → Parse → Cross reference → Pairs over all symbols → Oracle → Artifacts
//! - **Local**: Batch file → Scan each file → Pairs per file → Oracle → Artifacts
//!
//! ## Error Policy
//!
//! - Parse failures are file-local: logged and skipped
//! - Oracle and listing failures abort the run
//! - Cancellation is a single token bound to Ctrl-C at the top level

pub mod models;
pub mod oracle;
pub mod pairwise;
pub mod parser;
pub mod pipeline;
pub mod pool;
pub mod resolver;
pub mod session;

// Re-exports for convenience
pub use models::{Config, KpairError, Result, RunStats};
pub use oracle::{CommandOracle, Oracle, SatResult};
pub use pairwise::{SymbolPair, build_universe, pairs, probes};
pub use parser::Grammar;
pub use pipeline::SamplingPipeline;
pub use pool::{CancelToken, ProbeEvaluator, WorkerPool};
pub use resolver::{CrossReference, CrossReferenceResolver};
pub use session::{ArtifactStore, SamplingSession};
