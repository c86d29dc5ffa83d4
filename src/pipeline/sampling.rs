//! Global pairwise sampling pipeline.
//!
//! Pipeline flow:
//! git ls-files → Parse pool → Cross reference → Universe → Pairs → Oracle → Artifacts

use crate::models::{Config, KpairError, Result, RunStats};
use crate::oracle::Oracle;
use crate::pairwise::{build_universe, pairs};
use crate::parser::Grammar;
use crate::pool::{CancelToken, ProbeEvaluator, WorkerPool};
use crate::resolver::{CrossReference, CrossReferenceResolver};
use crate::session::{ArtifactStore, SamplingSession};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Sampling pipeline for one variability model.
pub struct SamplingPipeline {
    pub(crate) config: Config,
    pub(crate) oracle: Arc<dyn Oracle>,
    pub(crate) model: PathBuf,
    pub(crate) cancel: CancelToken,
}

impl SamplingPipeline {
    /// Create a new pipeline.
    pub fn new(config: Config, oracle: Arc<dyn Oracle>, model: &Path, cancel: CancelToken) -> Self {
        Self {
            config,
            oracle,
            model: model.to_path_buf(),
            cancel,
        }
    }

    /// Rules for the configured macro prefix.
    pub(crate) fn grammar(&self) -> Result<Grammar> {
        Grammar::new(&self.config.scan.prefix)
    }

    /// Build the cross-reference resolver for this configuration.
    pub fn resolver(&self) -> Result<CrossReferenceResolver> {
        let pool = WorkerPool::new(
            self.grammar()?,
            self.config.scan.worker_count(),
            self.cancel.clone(),
        );
        CrossReferenceResolver::new(pool, self.config.scan.ignore.as_deref())
    }

    /// Resolve the tree under `root`.
    pub async fn cross_reference(&self, root: &Path) -> Result<CrossReference> {
        self.resolver()?
            .resolve_tree(root, &self.config.scan.tool_prefix)
            .await
    }

    /// Sorted, prefixed universe of every defined or referenced symbol.
    pub fn universe(&self, xref: &CrossReference) -> Vec<String> {
        build_universe(xref.symbols(), &self.config.scan.prefix)
    }

    /// Start a fresh session: counters at zero, artifacts in the output dir.
    pub(crate) fn start_session(&self) -> Result<Arc<SamplingSession>> {
        let store = ArtifactStore::from_config(&self.config.output)?;
        let existing = store.existing()?;
        if !existing.is_empty() {
            warn!(
                count = existing.len(),
                dir = %store.dir().display(),
                "Artifacts from a previous run will be overwritten"
            );
        }
        Ok(Arc::new(SamplingSession::new(store)))
    }

    pub(crate) fn evaluator(&self) -> ProbeEvaluator {
        ProbeEvaluator::new(
            Arc::clone(&self.oracle),
            &self.model,
            self.config.evaluation.jobs,
            self.cancel.clone(),
        )
    }

    pub(crate) fn progress_bar(total: u64) -> Result<ProgressBar> {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
                .map_err(|e| KpairError::Internal(format!("Invalid progress template: {e}")))?
                .progress_chars("##-"),
        );
        Ok(pb)
    }

    /// Run global sampling over the git tree at `root`.
    pub async fn run_global(&self, root: &Path) -> Result<RunStats> {
        let start = Instant::now();
        let xref = self.cross_reference(root).await?;
        let universe = self.universe(&xref);
        println!("Detected {} distinct symbols in all files.", universe.len());

        let mut stats = self.run_universe(&universe).await?;
        stats.runtime_secs = start.elapsed().as_secs_f64();
        stats.finalize();
        Ok(stats)
    }

    /// Evaluate every pair of an already built universe in a fresh session.
    pub async fn run_universe(&self, universe: &[String]) -> Result<RunStats> {
        let start = Instant::now();
        let session = self.start_session()?;
        let units = pairs(universe);
        let total_probes = units.probe_count();

        info!(
            symbols = universe.len(),
            units = units.unit_count(),
            probes = total_probes,
            jobs = self.config.evaluation.jobs,
            model = %self.model.display(),
            "Starting pairwise sampling"
        );

        let pb = Self::progress_bar(total_probes)?;
        let summary = self.evaluator().evaluate(units, &session, &pb).await;
        let counts = session.counts();
        pb.finish_with_message(format!("valid: {}, invalid: {}", counts.valid, counts.invalid));
        let summary = summary?;

        let mut stats = RunStats {
            total_symbols: universe.len(),
            total_units: summary.units,
            total_probes: summary.probes,
            total_valid: counts.valid,
            total_invalid: counts.invalid,
            runtime_secs: start.elapsed().as_secs_f64(),
            ..Default::default()
        };
        stats.finalize();

        info!(
            valid = stats.total_valid,
            invalid = stats.total_invalid,
            validity = format!("{:.1}%", stats.validity_rate * 100.0),
            throughput = format!("{:.0}/hr", stats.throughput_per_hour),
            "Sampling complete"
        );
        Ok(stats)
    }
}
