//! Worker pool for the parse fan-out.
//!
//! Files are sharded round-robin across a fixed number of blocking workers.
//! Workers share nothing mutable: each returns the records of its shard and
//! the orchestrator merges only after every shard has completed.

use crate::models::{FileKind, KpairError, Result, SourceRecord};
use crate::parser::{Grammar, parse_kconfig_file, scan_source_file};
use crate::pool::CancelToken;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Bounded pool of parse workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    /// Number of shards (and concurrent workers)
    pool_size: usize,
    /// Rules shared by every worker
    grammar: Grammar,
    /// Run-wide cancellation
    cancel: CancelToken,
}

impl WorkerPool {
    /// Create a new worker pool.
    pub fn new(grammar: Grammar, pool_size: usize, cancel: CancelToken) -> Self {
        Self {
            pool_size: pool_size.max(1),
            grammar,
            cancel,
        }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.pool_size
    }

    /// Parse `files` (relative to `root`) with the grammar for `kind`.
    ///
    /// Returns one record per file. On cancellation, in-flight workers stop
    /// at their next file and all partial results are discarded.
    pub async fn parse_batch(
        &self,
        root: &Path,
        files: Vec<String>,
        kind: FileKind,
    ) -> Result<Vec<SourceRecord>> {
        let mut workers = JoinSet::new();

        for (index, shard) in partition(files, self.pool_size).into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(KpairError::Interrupted);
            }
            if shard.is_empty() {
                continue;
            }
            let grammar = self.grammar.clone();
            let cancel = self.cancel.clone();
            let root = root.to_path_buf();
            debug!(shard = index, files = shard.len(), ?kind, "Dispatching shard");
            workers.spawn_blocking(move || parse_shard(&grammar, &root, shard, kind, &cancel));
        }

        let mut records = Vec::new();
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    workers.abort_all();
                    return Err(KpairError::Interrupted);
                }
                next = workers.join_next() => match next {
                    None => break,
                    Some(Ok(Ok(shard_records))) => records.extend(shard_records),
                    Some(Ok(Err(e))) => {
                        workers.abort_all();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        workers.abort_all();
                        return Err(KpairError::Internal(format!("Parse worker failed: {e}")));
                    }
                },
            }
        }

        Ok(records)
    }
}

/// Parse one shard. Runs on a blocking thread.
fn parse_shard(
    grammar: &Grammar,
    root: &Path,
    shard: Vec<String>,
    kind: FileKind,
    cancel: &CancelToken,
) -> Result<Vec<SourceRecord>> {
    let mut records = Vec::with_capacity(shard.len());

    for path in shard {
        if cancel.is_cancelled() {
            return Err(KpairError::Interrupted);
        }
        let full: PathBuf = root.join(&path);
        let record = match kind {
            FileKind::Source => SourceRecord::source(path, scan_source_file(grammar, &full)),
            FileKind::Declarative => {
                let parsed = parse_kconfig_file(grammar, &full);
                for diagnostic in &parsed.diagnostics {
                    warn!(error = %diagnostic, "Skipping statement");
                }
                SourceRecord::declarative(path, parsed.defined, parsed.referenced)
            }
        };
        if record.is_empty() {
            debug!(path = %record.path, "No symbols");
        }
        records.push(record);
    }

    Ok(records)
}

/// Split `items` into `parts` round-robin shards (`items[i::parts]`).
pub fn partition<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    let parts = parts.max(1);
    let mut shards: Vec<Vec<T>> = (0..parts).map(|_| Vec::new()).collect();
    for (i, item) in items.into_iter().enumerate() {
        shards[i % parts].push(item);
    }
    shards
}
