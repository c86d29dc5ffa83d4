//! Configuration models for kpair.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration. CLI flags override individual values afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder in oracle arguments replaced by the model path.
pub const MODEL_PLACEHOLDER: &str = "{model}";

/// Placeholder in oracle arguments replaced by the probe expression.
pub const EXPR_PLACEHOLDER: &str = "{expr}";

/// Top-level configuration for kpair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source tree scanning
    #[serde(default)]
    pub scan: ScanConfig,

    /// Satisfiability oracle invocation
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Probe evaluation
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Artifact output
    #[serde(default)]
    pub output: OutputConfig,
}

/// Scanning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Number of parse workers (default: host parallelism)
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Configuration macro prefix in source files
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Tool directory excluded from the file listing
    #[serde(default = "default_tool_prefix")]
    pub tool_prefix: String,

    /// Paths matching this pattern (anchored at the path start) do not
    /// contribute references
    #[serde(default)]
    pub ignore: Option<String>,
}

fn default_prefix() -> String {
    "CONFIG_".to_string()
}

fn default_tool_prefix() -> String {
    "tools/".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            jobs: None,
            prefix: default_prefix(),
            tool_prefix: default_tool_prefix(),
            ignore: None,
        }
    }
}

impl ScanConfig {
    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        self.jobs.unwrap_or_else(host_parallelism).max(1)
    }
}

/// Number of CPUs available to this process.
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// What to do when the oracle exits with a non-zero status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the run (default)
    #[default]
    Abort,
    /// Count the probe as unsatisfiable and keep going
    Unsat,
}

/// Oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Oracle executable
    #[serde(default = "default_program")]
    pub program: String,

    /// Argument template; `{model}` and `{expr}` are substituted per call
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Handling of non-zero exits
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

fn default_program() -> String {
    "undertaker".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "-m".to_string(),
        MODEL_PLACEHOLDER.to_string(),
        "-j".to_string(),
        "checkexpr".to_string(),
        EXPR_PLACEHOLDER.to_string(),
    ]
}

fn default_timeout() -> u64 {
    300
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            timeout_secs: default_timeout(),
            on_failure: FailurePolicy::default(),
        }
    }
}

/// Evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Concurrent oracle calls (1 = sequential)
    #[serde(default = "default_eval_jobs")]
    pub jobs: usize,
}

fn default_eval_jobs() -> usize {
    1
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            jobs: default_eval_jobs(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the artifacts
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Artifact file name prefix
    #[serde(default = "default_artifact_prefix")]
    pub prefix: String,

    /// Artifact file extension
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_artifact_prefix() -> String {
    "config".to_string()
}

fn default_extension() -> String {
    "pair".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            prefix: default_artifact_prefix(),
            extension: default_extension(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Toml(source) => ConfigError::Parse {
                path: path.to_owned(),
                source,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.jobs == Some(0) {
            return Err(ConfigError::Invalid("scan.jobs must be at least 1".to_string()));
        }
        if self.evaluation.jobs == 0 {
            return Err(ConfigError::Invalid(
                "evaluation.jobs must be at least 1".to_string(),
            ));
        }
        if self.scan.prefix.is_empty() {
            return Err(ConfigError::Invalid("scan.prefix must not be empty".to_string()));
        }
        if let Some(pattern) = &self.scan.ignore {
            regex::Regex::new(pattern).map_err(|e| ConfigError::Pattern {
                pattern: pattern.clone(),
                source: e,
            })?;
        }
        if !self.oracle.args.iter().any(|a| a.contains(EXPR_PLACEHOLDER)) {
            return Err(ConfigError::Invalid(format!(
                "oracle.args must contain {EXPR_PLACEHOLDER}"
            )));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "oracle.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse config: {0}")]
    Toml(toml::de::Error),

    #[error("Invalid ignore pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.scan.prefix, "CONFIG_");
        assert_eq!(config.scan.tool_prefix, "tools/");
        assert_eq!(config.oracle.program, "undertaker");
        assert_eq!(config.oracle.on_failure, FailurePolicy::Abort);
        assert_eq!(config.evaluation.jobs, 1);
        assert_eq!(config.output.prefix, "config");
        assert_eq!(config.output.extension, "pair");
        assert!(config.scan.worker_count() >= 1);
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml(
            r#"
[scan]
jobs = 4
ignore = "arch/"

[oracle]
on_failure = "unsat"
timeout_secs = 10
"#,
        )
        .unwrap();
        assert_eq!(config.scan.worker_count(), 4);
        assert_eq!(config.scan.ignore.as_deref(), Some("arch/"));
        assert_eq!(config.oracle.on_failure, FailurePolicy::Unsat);
        assert_eq!(config.oracle.timeout_secs, 10);
        assert_eq!(config.oracle.args, default_args());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_toml("[evaluation]\njobs = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[scan]\nignore = \"(\"\n"),
            Err(ConfigError::Pattern { .. })
        ));
        assert!(matches!(
            Config::from_toml("[oracle]\nargs = [\"-m\", \"{model}\"]\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[scan\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kpair.toml");
        std::fs::write(&path, "[output\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let bad_ignore = dir.path().join("ignore.toml");
        std::fs::write(&bad_ignore, "[scan]\nignore = \"arch/(\"\n").unwrap();
        assert!(matches!(
            Config::from_file(&bad_ignore),
            Err(ConfigError::Pattern { .. })
        ));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::from_file(&missing),
            Err(ConfigError::FileRead { .. })
        ));
    }
}
