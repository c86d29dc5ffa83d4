//! Cross-reference resolver: which referenced symbols are never defined.

use crate::models::{FileKind, Result, SourceRecord};
use crate::pool::WorkerPool;
use crate::resolver::{KconfigMatcher, list_tracked_files};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Placeholder names used in examples and comments throughout the tree.
pub const IGNORED_SYMBOLS: [&str; 4] = ["FOO", "BAR", "FOO_BAR", "XXX"];

/// A tristate `FOO` is also visible as `FOO_MODULE` when built as a module.
pub const MODULE_SUFFIX: &str = "_MODULE";

/// Result of a resolver run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrossReference {
    /// Undefined symbol → files referencing it
    pub undefined: BTreeMap<String, BTreeSet<String>>,
    /// Every defined symbol
    pub defined: BTreeSet<String>,
}

impl CrossReference {
    /// Defined and undefined symbols together, sorted, without prefix.
    pub fn symbols(&self) -> BTreeSet<&str> {
        self.defined
            .iter()
            .chain(self.undefined.keys())
            .map(String::as_str)
            .collect()
    }
}

/// Whether a referenced symbol counts as undefined.
pub fn is_undefined(symbol: &str, defined: &BTreeSet<String>) -> bool {
    if defined.contains(symbol) || IGNORED_SYMBOLS.contains(&symbol) {
        return false;
    }
    match symbol.strip_suffix(MODULE_SUFFIX) {
        Some(base) => !defined.contains(base),
        None => true,
    }
}

/// Fans the parsers out over a file set and merges their records.
pub struct CrossReferenceResolver {
    pool: WorkerPool,
    matcher: KconfigMatcher,
    /// Anchored at the path start
    ignore: Option<Regex>,
}

impl CrossReferenceResolver {
    /// Create a resolver. `ignore` is a regex matched at the start of paths
    /// whose references are not collected.
    pub fn new(pool: WorkerPool, ignore: Option<&str>) -> Result<Self> {
        let ignore = ignore
            .map(|pattern| Regex::new(&format!("^(?:{pattern})")))
            .transpose()?;
        Ok(Self {
            pool,
            matcher: KconfigMatcher::new()?,
            ignore,
        })
    }

    /// Resolve every file tracked by git under `root`.
    pub async fn resolve_tree(&self, root: &Path, tool_prefix: &str) -> Result<CrossReference> {
        let files = list_tracked_files(root, tool_prefix).await?;
        self.resolve(root, files).await
    }

    /// Resolve an explicit file list (paths relative to `root`).
    pub async fn resolve(&self, root: &Path, files: Vec<String>) -> Result<CrossReference> {
        let start = Instant::now();
        let (kconfig_files, source_files) = self.matcher.split(files);

        info!(
            sources = source_files.len(),
            kconfigs = kconfig_files.len(),
            workers = self.pool.size(),
            "Parsing files"
        );

        let sources = self
            .pool
            .parse_batch(root, source_files, FileKind::Source)
            .await?;
        let kconfigs = self
            .pool
            .parse_batch(root, kconfig_files, FileKind::Declarative)
            .await?;

        let xref = self.merge(sources.into_iter().chain(kconfigs));

        info!(
            defined = xref.defined.len(),
            undefined = xref.undefined.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Resolved symbols"
        );
        Ok(xref)
    }

    /// Merge per-file records into the cross reference.
    ///
    /// Definitions always count; references of ignored files do not.
    pub fn merge<I>(&self, records: I) -> CrossReference
    where
        I: IntoIterator<Item = SourceRecord>,
    {
        let mut defined = BTreeSet::new();
        let mut referenced: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for record in records {
            defined.extend(record.definitions);
            if self.is_ignored(&record.path) {
                continue;
            }
            for symbol in record.references {
                referenced
                    .entry(symbol)
                    .or_default()
                    .insert(record.path.clone());
            }
        }

        let undefined = referenced
            .into_iter()
            .filter(|(symbol, _)| is_undefined(symbol, &defined))
            .collect();

        CrossReference { undefined, defined }
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignore.as_ref().is_some_and(|re| re.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Grammar;
    use crate::pool::CancelToken;
    use tempfile::TempDir;

    fn resolver(ignore: Option<&str>) -> CrossReferenceResolver {
        let pool = WorkerPool::new(Grammar::new("CONFIG_").unwrap(), 2, CancelToken::new());
        CrossReferenceResolver::new(pool, ignore).unwrap()
    }

    fn defined(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_undefined() {
        let defined = defined(&["SMP", "USB_STORAGE"]);
        assert!(!is_undefined("SMP", &defined));
        assert!(is_undefined("NUMA", &defined));
        assert!(!is_undefined("FOO", &defined));
        assert!(!is_undefined("XXX", &defined));
        assert!(!is_undefined("USB_STORAGE_MODULE", &defined));
        assert!(is_undefined("NUMA_MODULE", &defined));
        assert!(is_undefined("_MODULE", &defined));
    }

    #[test]
    fn test_merge_inverse_mapping() {
        let records = vec![
            SourceRecord::source("a.c", vec!["NUMA".into(), "SMP".into(), "NUMA".into()]),
            SourceRecord::source("b.c", vec!["NUMA".into()]),
            SourceRecord::declarative("Kconfig", vec!["SMP".into()], vec!["MISSING".into()]),
        ];
        let xref = resolver(None).merge(records);

        assert_eq!(xref.defined, defined(&["SMP"]));
        assert_eq!(xref.undefined.len(), 2);
        assert_eq!(
            xref.undefined["NUMA"],
            ["a.c", "b.c"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<String>>()
        );
        assert!(xref.undefined["MISSING"].contains("Kconfig"));
        assert_eq!(
            xref.symbols().into_iter().collect::<Vec<_>>(),
            vec!["MISSING", "NUMA", "SMP"]
        );
    }

    #[test]
    fn test_module_suffix_reconciliation() {
        let records = vec![
            SourceRecord::declarative("Kconfig", vec!["FOO_DRIVER".into()], Vec::new()),
            SourceRecord::source("drv.c", vec!["FOO_DRIVER_MODULE".into()]),
        ];
        let xref = resolver(None).merge(records);
        assert!(xref.undefined.is_empty());
    }

    #[test]
    fn test_ignore_pattern() {
        let records = vec![
            SourceRecord::source("arch/arm/mm.c", vec!["ARM_ONLY".into()]),
            SourceRecord::source("init/main.c", vec!["GENERIC".into()]),
            SourceRecord::declarative("arch/arm/Kconfig", vec!["ARM".into()], vec!["ARM_DEP".into()]),
        ];
        let xref = resolver(Some("arch/")).merge(records);

        // Definitions of ignored Kconfig files still count
        assert!(xref.defined.contains("ARM"));
        assert_eq!(xref.undefined.keys().collect::<Vec<_>>(), vec!["GENERIC"]);
    }

    #[test]
    fn test_ignore_pattern_is_anchored() {
        let records = vec![SourceRecord::source("drivers/arch/x.c", vec!["KEPT".into()])];
        let xref = resolver(Some("arch/")).merge(records);
        assert!(xref.undefined.contains_key("KEPT"));
    }

    #[tokio::test]
    async fn test_resolve_file_list() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Kconfig"),
            "config FOO_CORE\n\ttristate \"core\"\n\tdepends on BAR_BUS\n\thelp\n\t  See CONFIG_HELP_ONLY.\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("core.c"),
            "#if IS_ENABLED(CONFIG_FOO_CORE_MODULE)\n#ifdef CONFIG_UNKNOWN_OPT\n#endif\n#endif\n",
        )
        .unwrap();

        let files = vec!["Kconfig".to_string(), "core.c".to_string(), "gone.c".to_string()];
        let xref = resolver(None).resolve(dir.path(), files).await.unwrap();

        assert_eq!(xref.defined, defined(&["FOO_CORE"]));
        assert_eq!(
            xref.undefined.keys().collect::<Vec<_>>(),
            vec!["BAR_BUS", "UNKNOWN_OPT"]
        );
        assert!(!xref.undefined.contains_key("HELP_ONLY"));
    }
}
