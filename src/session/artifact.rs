//! Artifact persistence: one file per satisfiable probe.

use crate::models::{KpairError, OutputConfig, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes `<prefix>_<sequence>.<ext>` files into one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    prefix: String,
    extension: String,
}

impl ArtifactStore {
    /// Create a store, creating the directory if needed.
    pub fn new(dir: &Path, prefix: impl Into<String>, extension: impl Into<String>) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| KpairError::io("creating output dir", e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: prefix.into(),
            extension: extension.into(),
        })
    }

    /// Create from the `[output]` configuration section.
    pub fn from_config(config: &OutputConfig) -> Result<Self> {
        Self::new(&config.dir, config.prefix.clone(), config.extension.clone())
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact with sequence number `sequence`.
    pub fn path_for(&self, sequence: u64) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", self.prefix, sequence, self.extension))
    }

    /// Write an artifact (atomic: temp file + rename).
    pub async fn write(&self, sequence: u64, content: &str) -> Result<PathBuf> {
        let path = self.path_for(sequence);
        let temp_path = self.dir.join(format!(
            ".{}_{}.{}.tmp",
            self.prefix, sequence, self.extension
        ));

        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| KpairError::io("writing artifact", e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| KpairError::io("renaming artifact", e))?;

        debug!(path = %path.display(), "Artifact written");
        Ok(path)
    }

    /// Artifacts already present with this store's prefix and extension.
    ///
    /// A new session numbers from zero and overwrites them.
    pub fn existing(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.dir.join(format!(
            "{}_*.{}",
            glob::Pattern::escape(&self.prefix),
            glob::Pattern::escape(&self.extension)
        ));
        let pattern_str = pattern.to_string_lossy();

        let mut found: Vec<PathBuf> = glob::glob(&pattern_str)
            .map_err(|e| KpairError::Internal(format!("Invalid glob pattern: {e}")))?
            .filter_map(|r| r.ok())
            .collect();
        found.sort();
        Ok(found)
    }
}
