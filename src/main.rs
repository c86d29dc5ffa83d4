//! kpair CLI - Kconfig symbol cross-referencing and pairwise sampling.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kpair::{CancelToken, CommandOracle, Config, SamplingPipeline, pairs, probes};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "kpair")]
#[command(version)]
#[command(about = "Kconfig symbol cross-referencing and pairwise configuration sampling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate pairwise configurations against a variability model
    Sample {
        /// Variability model passed to the oracle
        #[arg(short, long)]
        model: PathBuf,

        /// Batch file for local sampling (one source path per line)
        #[arg(short = 'l', long)]
        batch: Option<PathBuf>,

        /// Source tree root (global sampling)
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Parse workers
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Concurrent oracle calls
        #[arg(long)]
        eval_jobs: Option<usize>,

        /// Paths matching this pattern do not contribute references
        #[arg(long)]
        ignore: Option<String>,
    },

    /// Report referenced symbols that no Kconfig file defines
    Undefined {
        /// Source tree root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Paths matching this pattern do not contribute references
        #[arg(long)]
        ignore: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the probe expressions `sample` would submit
    Probes {
        /// Batch file for local sampling (one source path per line)
        #[arg(short = 'l', long)]
        batch: Option<PathBuf>,

        /// Source tree root (global sampling)
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {path:?}")),
        None => Ok(Config::default()),
    }
}

fn print_example_config() {
    let example = r#"# kpair configuration file

[scan]
# jobs = 8                 # parse workers (default: number of CPUs)
prefix = "CONFIG_"
tool_prefix = "tools/"
# ignore = "arch/"         # matched at the start of each path

[oracle]
program = "undertaker"
args = ["-m", "{model}", "-j", "checkexpr", "{expr}"]
timeout_secs = 300
on_failure = "abort"       # or "unsat" to count tool failures as unsatisfiable

[evaluation]
jobs = 1                   # concurrent oracle calls

[output]
dir = "."
prefix = "config"
extension = "pair"
"#;
    println!("{example}");
}

fn build_pipeline(config: Config, model: &Path, cancel: CancelToken) -> SamplingPipeline {
    let oracle = Arc::new(CommandOracle::from_config(&config.oracle));
    SamplingPipeline::new(config, oracle, model, cancel)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let cancel = CancelToken::new();

    match cli.command {
        Commands::Example => {
            print_example_config();
            return Ok(());
        }

        Commands::Validate => {
            let config = load_config(cli.config.as_deref())?;

            info!("Configuration is valid");
            info!("  Parse workers: {}", config.scan.worker_count());
            info!("  Macro prefix: {}", config.scan.prefix);
            info!(
                "  Oracle: {} {}",
                config.oracle.program,
                config.oracle.args.join(" ")
            );
            info!("  Oracle jobs: {}", config.evaluation.jobs);
            info!(
                "  Artifacts: {}/{}_<n>.{}",
                config.output.dir.display(),
                config.output.prefix,
                config.output.extension
            );
            return Ok(());
        }

        Commands::Undefined { root, ignore, json } => {
            let mut config = load_config(cli.config.as_deref())?;
            if ignore.is_some() {
                config.scan.ignore = ignore;
            }
            config.validate()?;
            cancel.cancel_on_ctrl_c();

            let xref = build_pipeline(config, Path::new(""), cancel)
                .cross_reference(&root)
                .await
                .context("Cross reference failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&xref.undefined)?);
            } else {
                for (symbol, files) in &xref.undefined {
                    let files: Vec<&str> = files.iter().map(String::as_str).collect();
                    println!("{symbol}\t{}", files.join(", "));
                }
            }
        }

        Commands::Probes { batch, root } => {
            let config = load_config(cli.config.as_deref())?;
            cancel.cancel_on_ctrl_c();
            let pipeline = build_pipeline(config, Path::new(""), cancel);

            let universes: Vec<Vec<String>> = match batch {
                Some(batch) => {
                    let files = SamplingPipeline::load_batch(&batch)?;
                    pipeline
                        .local_universes(&files)?
                        .into_iter()
                        .map(|u| u.symbols)
                        .collect()
                }
                None => {
                    let xref = pipeline.cross_reference(&root).await?;
                    vec![pipeline.universe(&xref)]
                }
            };

            for universe in &universes {
                for unit in pairs(universe) {
                    for probe in probes(&unit) {
                        println!("{probe}");
                    }
                }
            }
        }

        Commands::Sample {
            model,
            batch,
            root,
            jobs,
            eval_jobs,
            ignore,
        } => {
            let mut config = load_config(cli.config.as_deref())?;

            // Override file values from CLI
            if jobs.is_some() {
                config.scan.jobs = jobs;
            }
            if let Some(eval_jobs) = eval_jobs {
                config.evaluation.jobs = eval_jobs;
            }
            if ignore.is_some() {
                config.scan.ignore = ignore;
            }
            config.validate()?;

            cancel.cancel_on_ctrl_c();
            let pipeline = build_pipeline(config, &model, cancel);

            let stats = match batch {
                Some(batch) => pipeline.run_local(&batch).await?,
                None => pipeline.run_global(&root).await?,
            };

            println!("\n=== Sampling Complete ===");
            println!("Symbols:     {}", stats.total_symbols);
            println!("Units:       {}", stats.total_units);
            println!("Probes:      {}", stats.total_probes);
            println!("Valid:       {}", stats.total_valid);
            println!("Invalid:     {}", stats.total_invalid);
            println!("Validity:    {:.1}%", stats.validity_rate * 100.0);
            println!("Throughput:  {:.0}/hr", stats.throughput_per_hour);
            println!("Runtime:     {:.1}s", stats.runtime_secs);
            println!("{}", stats.summary_line());
        }
    }

    Ok(())
}
