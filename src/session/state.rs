//! Session-scoped sampling state.
//!
//! A session owns the artifact sequence number and the valid/invalid tallies.
//! All three are atomics so probes may be evaluated concurrently; nothing is
//! persisted between runs.

use crate::models::Result;
use crate::oracle::SatResult;
use crate::session::ArtifactStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// What happened to one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Satisfiable, persisted under `sequence`
    Valid { sequence: u64, artifact: PathBuf },
    /// Unsatisfiable, nothing written
    Invalid,
}

/// Snapshot of the session tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounts {
    pub valid: u64,
    pub invalid: u64,
}

impl SessionCounts {
    /// Probes classified so far.
    pub fn attempted(&self) -> u64 {
        self.valid + self.invalid
    }
}

/// Mutable aggregate of one sampling run.
#[derive(Debug)]
pub struct SamplingSession {
    store: ArtifactStore,
    next_sequence: AtomicU64,
    valid: AtomicU64,
    invalid: AtomicU64,
}

impl SamplingSession {
    /// Start a session; every counter starts at zero.
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store,
            next_sequence: AtomicU64::new(0),
            valid: AtomicU64::new(0),
            invalid: AtomicU64::new(0),
        }
    }

    /// Artifact store of this session.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Record an oracle answer.
    ///
    /// A satisfiable answer takes the next sequence number and is written
    /// before the valid tally moves, so counts never run ahead of artifacts.
    pub async fn record(&self, result: SatResult) -> Result<ProbeOutcome> {
        match result {
            SatResult::Satisfiable(configuration) => {
                let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
                let artifact = self.store.write(sequence, &configuration).await?;
                self.valid.fetch_add(1, Ordering::SeqCst);
                Ok(ProbeOutcome::Valid { sequence, artifact })
            }
            SatResult::Unsatisfiable => {
                self.invalid.fetch_add(1, Ordering::SeqCst);
                Ok(ProbeOutcome::Invalid)
            }
        }
    }

    /// Current tallies.
    pub fn counts(&self) -> SessionCounts {
        SessionCounts {
            valid: self.valid.load(Ordering::SeqCst),
            invalid: self.invalid.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> SamplingSession {
        SamplingSession::new(ArtifactStore::new(dir.path(), "config", "pair").unwrap())
    }

    #[tokio::test]
    async fn test_record_sequences_only_valid() {
        let temp_dir = TempDir::new().unwrap();
        let session = session(&temp_dir);

        let first = session
            .record(SatResult::Satisfiable("A=y\n".to_string()))
            .await
            .unwrap();
        let second = session.record(SatResult::Unsatisfiable).await.unwrap();
        let third = session
            .record(SatResult::Satisfiable("A=n\n".to_string()))
            .await
            .unwrap();

        assert!(matches!(first, ProbeOutcome::Valid { sequence: 0, .. }));
        assert_eq!(second, ProbeOutcome::Invalid);
        assert!(matches!(third, ProbeOutcome::Valid { sequence: 1, .. }));
        assert_eq!(session.counts(), SessionCounts { valid: 2, invalid: 1 });
        assert_eq!(session.counts().attempted(), 3);
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("config_1.pair")).unwrap(),
            "A=n\n"
        );
    }

    #[tokio::test]
    async fn test_concurrent_records_get_unique_sequences() {
        let temp_dir = TempDir::new().unwrap();
        let session = Arc::new(session(&temp_dir));

        let mut handles = Vec::new();
        for i in 0..32 {
            let session = Arc::clone(&session);
            handles.push(tokio::spawn(async move {
                session
                    .record(SatResult::Satisfiable(format!("probe {i}\n")))
                    .await
                    .unwrap()
            }));
        }

        let mut sequences = Vec::new();
        for handle in handles {
            if let ProbeOutcome::Valid { sequence, .. } = handle.await.unwrap() {
                sequences.push(sequence);
            }
        }
        sequences.sort_unstable();
        assert_eq!(sequences, (0..32).collect::<Vec<u64>>());
        assert_eq!(session.counts().valid, 32);
        assert_eq!(session.store().existing().unwrap().len(), 32);
    }
}
