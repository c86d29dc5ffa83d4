//! Macro reference scanner for arbitrary source files.

use crate::models::{KpairError, Result};
use crate::parser::Grammar;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Read a file as text, replacing invalid UTF-8 instead of failing.
pub fn read_lossy(path: &Path) -> Result<String> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(KpairError::MissingFile(path.to_owned())),
        Err(e) => Err(KpairError::io(format!("reading {}", path.display()), e)),
    }
}

/// Referenced symbols in source text, in order, duplicates kept.
pub fn scan_source(grammar: &Grammar, text: &str) -> Vec<String> {
    text.lines()
        .flat_map(|line| grammar.source_references(line))
        .collect()
}

/// Referenced symbols in a source file.
///
/// Unreadable files yield an empty list; the run goes on.
pub fn scan_source_file(grammar: &Grammar, path: &Path) -> Vec<String> {
    match read_lossy(path) {
        Ok(text) => scan_source(grammar, &text),
        Err(e) if e.is_file_local() => {
            debug!(error = %e, "Skipping source file");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "Skipping unreadable source file");
            Vec::new()
        }
    }
}
