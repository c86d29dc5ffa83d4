//! Tracked-file listing and classification.
//!
//! The listing itself is delegated to `git ls-files`; this module only runs
//! it and filters the result.

use crate::models::{KpairError, Result};
use regex::Regex;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// Path fragments that never hold symbol data.
const EXCLUDED_FRAGMENTS: [&str; 3] = [".git", "ChangeLog", ".log"];

/// `Kconfig`, `Kconfig.debug`, `Kconfig-foo`, ... at the end of a path.
const KCONFIG_FILE: &str = r"Kconfig[.A-Za-z0-9_+\-]*$";

/// List the files tracked by git under `root`, filtered.
pub async fn list_tracked_files(root: &Path, tool_prefix: &str) -> Result<Vec<String>> {
    let output = Command::new("git")
        .arg("ls-files")
        .current_dir(root)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| KpairError::FileListing(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(KpairError::FileListing(format!(
            "git ls-files {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let files = filter_listing(root, &stdout, tool_prefix);
    info!(files = files.len(), "Listed tracked files");
    Ok(files)
}

/// Drop excluded entries from a newline-separated listing.
pub fn filter_listing(root: &Path, listing: &str, tool_prefix: &str) -> Vec<String> {
    listing
        .lines()
        .filter(|path| !path.is_empty())
        .filter(|path| {
            let excluded = is_excluded(path, tool_prefix) || root.join(path).is_dir();
            if excluded {
                debug!(path = %path, "Excluded from scan");
            }
            !excluded
        })
        .map(str::to_string)
        .collect()
}

/// Whether a path is excluded by name.
pub fn is_excluded(path: &str, tool_prefix: &str) -> bool {
    EXCLUDED_FRAGMENTS.iter().any(|f| path.contains(f))
        || (!tool_prefix.is_empty() && path.starts_with(tool_prefix))
}

/// Recognizes Kconfig description files by name.
#[derive(Debug, Clone)]
pub struct KconfigMatcher {
    pattern: Regex,
}

impl KconfigMatcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(KCONFIG_FILE)?,
        })
    }

    /// Whether `path` is parsed with the Kconfig grammar.
    pub fn is_kconfig(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// Split into (Kconfig files, other files), order preserved.
    pub fn split(&self, files: Vec<String>) -> (Vec<String>, Vec<String>) {
        files.into_iter().partition(|f| self.is_kconfig(f))
    }
}
