//! Probe evaluator: runs probe expressions through the oracle.
//!
//! Probes are dispatched in enumeration order with at most `pool_size`
//! oracle calls in flight. With a pool size of one the evaluation is
//! strictly sequential and artifact numbering follows probe order.

use crate::models::{KpairError, Result};
use crate::oracle::Oracle;
use crate::pairwise::{SymbolPair, probes};
use crate::pool::CancelToken;
use crate::session::{ProbeOutcome, SamplingSession};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

/// What one `evaluate` call enumerated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    /// Pairs and singletons consumed
    pub units: u64,
    /// Probes submitted
    pub probes: u64,
}

/// Evaluates probes against one variability model.
pub struct ProbeEvaluator {
    /// Satisfiability oracle (shared)
    oracle: Arc<dyn Oracle>,
    /// Variability model passed to every call
    model: PathBuf,
    /// Max concurrent oracle calls
    pool_size: usize,
    /// Run-wide cancellation
    cancel: CancelToken,
}

impl ProbeEvaluator {
    /// Create a new evaluator.
    pub fn new(oracle: Arc<dyn Oracle>, model: &Path, pool_size: usize, cancel: CancelToken) -> Self {
        Self {
            oracle,
            model: model.to_path_buf(),
            pool_size: pool_size.max(1),
            cancel,
        }
    }

    /// Evaluate every probe of every unit, recording outcomes in `session`.
    ///
    /// Cancellation and the first oracle failure stop dispatch and interrupt
    /// the oracle calls still running. A probe whose answer has arrived is
    /// always recorded, so tallies and artifacts match the completed probes.
    pub async fn evaluate<'a, I>(
        &self,
        units: I,
        session: &Arc<SamplingSession>,
        progress: &ProgressBar,
    ) -> Result<EvaluationSummary>
    where
        I: IntoIterator<Item = SymbolPair<'a>>,
    {
        let mut tasks: JoinSet<Result<ProbeOutcome>> = JoinSet::new();
        let mut summary = EvaluationSummary::default();
        let mut failure = None;
        // Stops in-flight calls once this evaluation has failed
        let stop = CancelToken::new();

        'dispatch: for unit in units {
            summary.units += 1;
            for probe in probes(&unit) {
                while tasks.len() >= self.pool_size {
                    if let Err(e) = Self::reap(&mut tasks, progress).await {
                        failure = Some(e);
                        break 'dispatch;
                    }
                }
                if self.cancel.is_cancelled() {
                    failure = Some(KpairError::Interrupted);
                    break 'dispatch;
                }

                let oracle = Arc::clone(&self.oracle);
                let session = Arc::clone(session);
                let model = self.model.clone();
                let cancel = self.cancel.clone();
                let stop = stop.clone();
                summary.probes += 1;
                tasks.spawn(async move {
                    let result = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(KpairError::Interrupted),
                        () = stop.cancelled() => return Err(KpairError::Interrupted),
                        result = oracle.check(&probe.expr, &model) => result?,
                    };
                    debug!(expr = %probe.expr, satisfiable = result.is_satisfiable(), "Probe checked");
                    session.record(result).await
                });
            }
        }

        if failure.is_some() {
            stop.cancel();
        }
        while !tasks.is_empty() {
            if let Err(e) = Self::reap(&mut tasks, progress).await {
                if failure.is_none() {
                    stop.cancel();
                    failure = Some(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Wait for one task to finish.
    async fn reap(
        tasks: &mut JoinSet<Result<ProbeOutcome>>,
        progress: &ProgressBar,
    ) -> Result<()> {
        match tasks.join_next().await {
            None => Ok(()),
            Some(Ok(Ok(outcome))) => {
                progress.inc(1);
                if let ProbeOutcome::Valid { sequence, artifact } = &outcome {
                    debug!(sequence, artifact = %artifact.display(), "Configuration saved");
                }
                Ok(())
            }
            Some(Ok(Err(e))) => Err(e),
            Some(Err(e)) => Err(KpairError::Internal(format!("Probe task failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::SatResult;
    use crate::pairwise::pairs;
    use crate::session::{ArtifactStore, SessionCounts};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Satisfiable unless the expression is listed; records every call.
    #[derive(Default)]
    struct ScriptedOracle {
        reject: Vec<String>,
        fail_on: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn check(&self, expr: &str, _model: &Path) -> Result<SatResult> {
            self.calls.lock().unwrap().push(expr.to_string());
            if self.fail_on.as_deref() == Some(expr) {
                return Err(KpairError::OracleFailure {
                    expr: expr.to_string(),
                    reason: "exit status: 1".to_string(),
                });
            }
            if self.reject.iter().any(|r| r == expr) {
                Ok(SatResult::Unsatisfiable)
            } else {
                Ok(SatResult::Satisfiable(format!("{expr}\n")))
            }
        }
    }

    fn session(dir: &TempDir) -> Arc<SamplingSession> {
        Arc::new(SamplingSession::new(
            ArtifactStore::new(dir.path(), "config", "pair").unwrap(),
        ))
    }

    fn universe(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_sequential_order_and_numbering() {
        let temp_dir = TempDir::new().unwrap();
        let oracle = Arc::new(ScriptedOracle {
            reject: vec!["!CONFIG_A && !CONFIG_B".to_string()],
            ..Default::default()
        });
        let evaluator = ProbeEvaluator::new(oracle.clone(), Path::new("x86.model"), 1, CancelToken::new());
        let session = session(&temp_dir);
        let u = universe(&["CONFIG_A", "CONFIG_B"]);

        let summary = evaluator
            .evaluate(pairs(&u), &session, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(summary, EvaluationSummary { units: 1, probes: 4 });
        assert_eq!(session.counts(), SessionCounts { valid: 3, invalid: 1 });
        assert_eq!(
            *oracle.calls.lock().unwrap(),
            vec![
                "CONFIG_A && CONFIG_B",
                "!CONFIG_A && !CONFIG_B",
                "CONFIG_A && !CONFIG_B",
                "!CONFIG_A && CONFIG_B",
            ]
        );
        // Numbering skips the rejected probe
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("config_1.pair")).unwrap(),
            "CONFIG_A && !CONFIG_B\n"
        );
        assert!(!temp_dir.path().join("config_3.pair").exists());
    }

    #[tokio::test]
    async fn test_parallel_evaluation_counts() {
        let temp_dir = TempDir::new().unwrap();
        let oracle = Arc::new(ScriptedOracle::default());
        let evaluator = ProbeEvaluator::new(oracle, Path::new("m"), 4, CancelToken::new());
        let session = session(&temp_dir);
        let u = universe(&["CONFIG_A", "CONFIG_B", "CONFIG_C", "CONFIG_D", "CONFIG_E"]);

        let summary = evaluator
            .evaluate(pairs(&u), &session, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(summary.units, 10);
        assert_eq!(summary.probes, 40);
        assert_eq!(session.counts().valid, 40);
        assert_eq!(session.store().existing().unwrap().len(), 40);
    }

    #[tokio::test]
    async fn test_oracle_failure_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let oracle = Arc::new(ScriptedOracle {
            fail_on: Some("!CONFIG_A && !CONFIG_B".to_string()),
            ..Default::default()
        });
        let evaluator = ProbeEvaluator::new(oracle.clone(), Path::new("m"), 1, CancelToken::new());
        let session = session(&temp_dir);
        let u = universe(&["CONFIG_A", "CONFIG_B", "CONFIG_C"]);

        let err = evaluator
            .evaluate(pairs(&u), &session, &ProgressBar::hidden())
            .await
            .unwrap_err();

        assert!(err.is_oracle());
        // Not counted as invalid, and nothing after it was submitted
        assert_eq!(session.counts(), SessionCounts { valid: 1, invalid: 0 });
        assert_eq!(oracle.calls.lock().unwrap().len(), 2);
    }

    /// Cancels the run while answering; `!CONFIG_X` never answers.
    struct CancellingOracle {
        cancel: CancelToken,
    }

    #[async_trait]
    impl Oracle for CancellingOracle {
        async fn check(&self, expr: &str, _model: &Path) -> Result<SatResult> {
            if expr.starts_with('!') {
                std::future::pending::<()>().await;
            }
            self.cancel.cancel();
            Ok(SatResult::Satisfiable(format!("{expr}\n")))
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_answer_received_before_cancel_is_recorded() {
        let temp_dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let oracle = Arc::new(CancellingOracle { cancel: cancel.clone() });
        let evaluator = ProbeEvaluator::new(oracle, Path::new("m"), 1, cancel);
        let session = session(&temp_dir);
        let u = universe(&["CONFIG_X"]);

        let err = evaluator
            .evaluate(pairs(&u), &session, &ProgressBar::hidden())
            .await
            .unwrap_err();

        assert!(matches!(err, KpairError::Interrupted));
        assert_eq!(session.counts(), SessionCounts { valid: 1, invalid: 0 });
        assert_eq!(file_names(temp_dir.path()), vec!["config_0.pair"]);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_calls_cleanly() {
        let temp_dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let oracle = Arc::new(CancellingOracle { cancel: cancel.clone() });
        let evaluator = ProbeEvaluator::new(oracle, Path::new("m"), 2, cancel);
        let session = session(&temp_dir);
        let u = universe(&["CONFIG_X"]);

        let err = evaluator
            .evaluate(pairs(&u), &session, &ProgressBar::hidden())
            .await
            .unwrap_err();

        // The pending `!CONFIG_X` call is dropped, the answered one kept
        assert!(matches!(err, KpairError::Interrupted));
        assert_eq!(session.counts(), SessionCounts { valid: 1, invalid: 0 });
        assert_eq!(file_names(temp_dir.path()), vec!["config_0.pair"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let temp_dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let oracle = Arc::new(ScriptedOracle::default());
        let evaluator = ProbeEvaluator::new(oracle.clone(), Path::new("m"), 1, cancel);
        let session = session(&temp_dir);
        let u = universe(&["CONFIG_X"]);

        let err = evaluator
            .evaluate(pairs(&u), &session, &ProgressBar::hidden())
            .await
            .unwrap_err();

        assert!(matches!(err, KpairError::Interrupted));
        assert!(oracle.calls.lock().unwrap().is_empty());
        assert_eq!(session.counts(), SessionCounts::default());
    }
}
