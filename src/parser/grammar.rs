//! Line rules for the two symbol grammars.
//!
//! Each rule is a standalone predicate or extractor so the Kconfig parser
//! and the source scanner only decide the order in which they apply.

use crate::models::Result;
use regex::Regex;

/// Keyword forms that introduce a definition.
const DEFINITION: &str = r"^\s*(?:menu)?config\s+([A-Za-z0-9_]+)";

/// `help` (or the legacy `---help---`) alone on its line.
const HELP: &str = r"^\s*(?:help|---help---)\s*$";

/// Statements whose tail is a boolean expression over symbols.
const STATEMENT: &str =
    r"^\s*(?:if|select|depends\s+on|default\s+.*?(?:if\s.+)?)\s+(?:[&()|!\s]|[A-Za-z0-9_])+";

/// Double-quoted string literal, backslash escapes allowed.
const QUOTED: &str = r#""(?:[^"\\]|\\.)*""#;

/// Identifier-shaped run.
const TOKEN: &str = r"[A-Za-z0-9_]+";

/// Decimal or hexadecimal literal.
const NUMERIC: &str = r"^(?:0[xX][0-9a-fA-F]+|[0-9]+)$";

/// Compiled rules, built once per worker.
#[derive(Debug, Clone)]
pub struct Grammar {
    prefix: String,
    definition: Regex,
    help: Regex,
    statement: Regex,
    quoted: Regex,
    token: Regex,
    numeric: Regex,
    reference: Regex,
}

impl Grammar {
    /// Build the rules for a configuration macro prefix such as `CONFIG_`.
    pub fn new(prefix: &str) -> Result<Self> {
        let reference = format!(r"\bD?{}([A-Za-z0-9_]+)", regex::escape(prefix));
        Ok(Self {
            prefix: prefix.to_string(),
            definition: Regex::new(DEFINITION)?,
            help: Regex::new(HELP)?,
            statement: Regex::new(STATEMENT)?,
            quoted: Regex::new(QUOTED)?,
            token: Regex::new(TOKEN)?,
            numeric: Regex::new(NUMERIC)?,
            reference: Regex::new(&reference)?,
        })
    }

    /// Configuration macro prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Symbol introduced by a `config NAME` / `menuconfig NAME` line.
    pub fn definition<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.definition
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|name| is_symbol(name))
    }

    /// Whether the line opens a help block.
    pub fn is_help(&self, line: &str) -> bool {
        self.help.is_match(line)
    }

    /// Whether the line is an `if`, `select`, `depends on` or `default` statement.
    pub fn is_statement(&self, line: &str) -> bool {
        self.statement.is_match(line)
    }

    /// Remove string literals so prompt and help text is never scanned.
    ///
    /// Fails on an unterminated literal.
    pub fn strip_quotes(&self, line: &str) -> std::result::Result<String, &'static str> {
        let stripped = self.quoted.replace_all(line, "");
        if stripped.contains('"') {
            return Err("unterminated string literal");
        }
        Ok(stripped.into_owned())
    }

    /// Symbol-shaped tokens of an expression, numeric literals dropped.
    pub fn expression_symbols(&self, line: &str) -> Vec<String> {
        self.token
            .find_iter(line)
            .map(|m| m.as_str())
            .filter(|t| is_symbol(t) && !self.is_numeric(t))
            .map(str::to_string)
            .collect()
    }

    /// Whether a token is a decimal or hex literal.
    pub fn is_numeric(&self, token: &str) -> bool {
        self.numeric.is_match(token)
    }

    /// Macro references in a line of source text, prefix removed.
    pub fn source_references(&self, line: &str) -> Vec<String> {
        if !line.contains(self.prefix.as_str()) {
            return Vec::new();
        }
        self.reference
            .captures_iter(line)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|s| is_symbol(s) && ends_on_alphanumeric(s))
            .map(str::to_string)
            .collect()
    }
}

/// Identifier characters only, at least two of them uppercase letters or digits.
pub fn is_symbol(token: &str) -> bool {
    token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        && token
            .bytes()
            .filter(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            .count()
            >= 2
}

/// Rejects `CONFIG_FOO_##suffix` style concatenation fragments.
fn ends_on_alphanumeric(token: &str) -> bool {
    token
        .bytes()
        .last()
        .is_some_and(|b| b.is_ascii_alphanumeric())
}

/// Drop everything after the first unescaped `#` outside a string literal.
pub fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_string = false;
    for (i, &b) in bytes.iter().enumerate() {
        let escaped = i > 0 && bytes[i - 1] == b'\\';
        match b {
            b'"' if !escaped => in_string = !in_string,
            b'#' if !escaped && !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Whether the statement continues on the next line.
pub fn continues(line: &str) -> bool {
    line.trim_end().ends_with('\\')
}
