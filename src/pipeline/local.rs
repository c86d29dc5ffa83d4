//! Local sampling: pairs are formed per file of a batch instead of over the
//! whole tree. All files share one session, so artifact numbering runs on
//! across files.

use crate::models::{KpairError, Result, RunStats};
use crate::pairwise::{build_universe, pairs, probe_count};
use crate::parser::scan_source_file;
use crate::pipeline::SamplingPipeline;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Per-file universe of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUniverse {
    pub path: PathBuf,
    /// Sorted, deduplicated, prefixed
    pub symbols: Vec<String>,
}

impl SamplingPipeline {
    /// Load a batch file: one path per line, trimmed, blank lines skipped.
    pub fn load_batch(path: &Path) -> Result<Vec<PathBuf>> {
        let file = File::open(path).map_err(|e| KpairError::io("opening batch file", e))?;
        let reader = BufReader::new(file);
        let mut files = Vec::new();

        for line in reader.lines() {
            let line = line.map_err(|e| KpairError::io("reading batch file", e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            files.push(PathBuf::from(line));
        }

        info!(count = files.len(), "Loaded batch");
        Ok(files)
    }

    /// Scan every batch file and build its universe.
    ///
    /// Prints `<file> <count>` per file, or `...skipping` for files without
    /// references. Skipped files are not returned.
    pub fn local_universes(&self, files: &[PathBuf]) -> Result<Vec<FileUniverse>> {
        let grammar = self.grammar()?;
        let mut universes = Vec::new();

        for path in files {
            let symbols = build_universe(scan_source_file(&grammar, path), grammar.prefix());
            println!("{} {}", path.display(), symbols.len());
            if symbols.is_empty() {
                println!("...skipping");
                continue;
            }
            universes.push(FileUniverse {
                path: path.clone(),
                symbols,
            });
        }

        Ok(universes)
    }

    /// Run local sampling over the files listed in `batch`.
    pub async fn run_local(&self, batch: &Path) -> Result<RunStats> {
        let start = Instant::now();
        let files = Self::load_batch(batch)?;
        let universes = self.local_universes(&files)?;

        let distinct: BTreeSet<&str> = universes
            .iter()
            .flat_map(|u| u.symbols.iter().map(String::as_str))
            .collect();
        let total_probes: u64 = universes.iter().map(|u| probe_count(u.symbols.len())).sum();

        let session = self.start_session()?;
        let evaluator = self.evaluator();
        let pb = Self::progress_bar(total_probes)?;
        let mut stats = RunStats {
            total_symbols: distinct.len(),
            ..Default::default()
        };

        for universe in &universes {
            info!(
                file = %universe.path.display(),
                symbols = universe.symbols.len(),
                "Sampling file"
            );
            match evaluator.evaluate(pairs(&universe.symbols), &session, &pb).await {
                Ok(summary) => {
                    stats.total_units += summary.units;
                    stats.total_probes += summary.probes;
                }
                Err(e) => {
                    pb.abandon();
                    return Err(e);
                }
            }
        }

        let counts = session.counts();
        pb.finish_with_message(format!("valid: {}, invalid: {}", counts.valid, counts.invalid));
        println!("Found {} distinct symbols", distinct.len());

        stats.total_valid = counts.valid;
        stats.total_invalid = counts.invalid;
        stats.runtime_secs = start.elapsed().as_secs_f64();
        stats.finalize();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;
    use crate::oracle::{Oracle, SatResult};
    use crate::pool::CancelToken;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct AlwaysSat;

    #[async_trait]
    impl Oracle for AlwaysSat {
        async fn check(&self, expr: &str, _model: &Path) -> Result<SatResult> {
            Ok(SatResult::Satisfiable(format!("{expr}\n")))
        }
    }

    fn pipeline(out: &Path) -> SamplingPipeline {
        let mut config = Config::default();
        config.output.dir = out.to_path_buf();
        SamplingPipeline::new(config, Arc::new(AlwaysSat), Path::new("m"), CancelToken::new())
    }

    #[test]
    fn test_load_batch_trims_and_skips_blank() {
        let temp_dir = TempDir::new().unwrap();
        let batch = temp_dir.path().join("batch.txt");
        std::fs::write(&batch, "  init/main.c \n\n\tkernel/fork.c\n   \n").unwrap();

        let files = SamplingPipeline::load_batch(&batch).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("init/main.c"), PathBuf::from("kernel/fork.c")]
        );
    }

    #[test]
    fn test_load_batch_missing() {
        let temp_dir = TempDir::new().unwrap();
        let err = SamplingPipeline::load_batch(&temp_dir.path().join("none")).unwrap_err();
        assert!(matches!(err, KpairError::Io { .. }));
    }

    #[test]
    fn test_local_universes_skip_empty_files() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.c");
        let b = temp_dir.path().join("b.c");
        std::fs::write(&a, "#ifdef CONFIG_SMP\n#if CONFIG_NUMA && CONFIG_SMP\n").unwrap();
        std::fs::write(&b, "int main(void) { return 0; }\n").unwrap();
        let pipeline = pipeline(temp_dir.path());

        let universes = pipeline
            .local_universes(&[a.clone(), b, temp_dir.path().join("gone.c")])
            .unwrap();

        assert_eq!(
            universes,
            vec![FileUniverse {
                path: a,
                symbols: vec!["CONFIG_NUMA".to_string(), "CONFIG_SMP".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn test_run_local_shares_session() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        std::fs::create_dir(&src).unwrap();
        let out = temp_dir.path().join("out");
        std::fs::write(src.join("a.c"), "#ifdef CONFIG_SMP\n#endif\n").unwrap();
        std::fs::write(src.join("b.c"), "#if CONFIG_PCI || CONFIG_SMP\n").unwrap();
        let batch = temp_dir.path().join("batch");
        std::fs::write(
            &batch,
            format!("{}\n{}\n", src.join("a.c").display(), src.join("b.c").display()),
        )
        .unwrap();

        let stats = pipeline(&out).run_local(&batch).await.unwrap();

        // a.c: one singleton (2 probes); b.c: one pair (4 probes)
        assert_eq!(stats.total_symbols, 2);
        assert_eq!(stats.total_units, 2);
        assert_eq!(stats.total_probes, 6);
        assert_eq!(stats.total_valid, 6);
        assert!(out.join("config_5.pair").exists());
        assert!(!out.join("config_6.pair").exists());
    }
}
