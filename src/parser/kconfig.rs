//! Kconfig parser: defined and referenced symbols of one description file.
//!
//! Rule order per line (comments stripped first):
//! 1. `config`/`menuconfig` defines a symbol and closes any help block
//! 2. `help` opens a help block, which swallows every following line
//! 3. inside a help block nothing is extracted
//! 4. `if`/`select`/`depends on`/`default` statements contribute references,
//!    string literals removed, `\` continuations joined

use crate::models::{KpairError, Result};
use crate::parser::{Grammar, continues, read_lossy, strip_comment};
use std::path::Path;
use tracing::{debug, warn};

/// Symbols found in one Kconfig file.
#[derive(Debug, Default)]
pub struct KconfigFile {
    /// Defined symbols, in order of definition
    pub defined: Vec<String>,
    /// Referenced symbols, deduplicated per statement
    pub referenced: Vec<String>,
    /// Statements that were skipped
    pub diagnostics: Vec<KpairError>,
}

/// A statement with its continuation lines joined.
struct Statement {
    text: String,
    /// Index of the first line after the statement
    next: usize,
}

/// Parse Kconfig text. `path` is only used for diagnostics.
pub fn parse_kconfig(grammar: &Grammar, path: &Path, text: &str) -> KconfigFile {
    let lines: Vec<&str> = text.lines().collect();
    let mut file = KconfigFile::default();
    let mut in_help = false;
    let mut idx = 0;

    while idx < lines.len() {
        let line = strip_comment(lines[idx]);

        if let Some(name) = grammar.definition(line) {
            file.defined.push(name.to_string());
            in_help = false;
            idx += 1;
            continue;
        }

        if grammar.is_help(line) {
            in_help = true;
            idx += 1;
            continue;
        }

        if in_help || !grammar.is_statement(line) {
            idx += 1;
            continue;
        }

        match collect_statement(grammar, path, &lines, idx) {
            Ok(statement) => {
                let mut symbols = grammar.expression_symbols(&statement.text);
                dedup_in_order(&mut symbols);
                file.referenced.extend(symbols);
                idx = statement.next;
            }
            Err(e) => {
                file.diagnostics.push(e);
                idx += 1;
            }
        }
    }

    file
}

/// Parse a Kconfig file. A missing file yields an empty result.
pub fn parse_kconfig_file(grammar: &Grammar, path: &Path) -> KconfigFile {
    let text = match read_lossy(path) {
        Ok(text) => text,
        Err(e) if e.is_file_local() => {
            debug!(error = %e, "Skipping Kconfig file");
            return KconfigFile::default();
        }
        Err(e) => {
            warn!(error = %e, "Skipping unreadable Kconfig file");
            return KconfigFile::default();
        }
    };
    parse_kconfig(grammar, path, &text)
}

/// Join a statement starting at `first` with its continuation lines.
fn collect_statement(
    grammar: &Grammar,
    path: &Path,
    lines: &[&str],
    first: usize,
) -> Result<Statement> {
    let mut text = String::new();
    let mut idx = first;

    loop {
        let stripped = grammar
            .strip_quotes(strip_comment(lines[idx]))
            .map_err(|reason| KpairError::MalformedStatement {
                path: path.to_owned(),
                line: idx + 1,
                reason: reason.to_string(),
            })?;
        idx += 1;

        let more = continues(&stripped);
        text.push_str(stripped.trim_end().trim_end_matches('\\'));
        text.push(' ');

        if !more {
            break;
        }
        if idx >= lines.len() {
            debug!(path = %path.display(), line = idx, "Continuation at end of file");
            break;
        }
    }

    Ok(Statement { text, next: idx })
}

fn dedup_in_order(symbols: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    symbols.retain(|s| seen.insert(s.clone()));
}
