//! Oracle backed by an external command (undertaker by default).
//!
//! Contract of the tool:
//! - exit 0, non-empty stdout → satisfiable, stdout is the configuration
//! - exit 0, empty stdout     → unsatisfiable
//! - non-zero exit            → tool failure (or, under the `unsat` policy,
//!                              counted as unsatisfiable)
//! - spawn failure or timeout → always a tool failure

use crate::models::{
    EXPR_PLACEHOLDER, FailurePolicy, KpairError, MODEL_PLACEHOLDER, OracleConfig, Result,
};
use crate::oracle::{Oracle, SatResult};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs one process per probe.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    on_failure: FailurePolicy,
}

impl CommandOracle {
    /// Create a new command oracle.
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        on_failure: FailurePolicy,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            on_failure,
        }
    }

    /// Create from the `[oracle]` configuration section.
    pub fn from_config(config: &OracleConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
            config.on_failure,
        )
    }

    /// Arguments for one call, placeholders substituted.
    pub fn render_args(&self, expr: &str, model: &Path) -> Vec<String> {
        let model = model.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(MODEL_PLACEHOLDER, &model)
                    .replace(EXPR_PLACEHOLDER, expr)
            })
            .collect()
    }
}

#[async_trait]
impl Oracle for CommandOracle {
    async fn check(&self, expr: &str, model: &Path) -> Result<SatResult> {
        let start = Instant::now();
        let mut command = Command::new(&self.program);
        command
            .args(self.render_args(expr, model))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(KpairError::OracleTimeout {
                    expr: expr.to_string(),
                    timeout: self.timeout,
                });
            }
            Ok(Err(e)) => {
                return Err(KpairError::OracleFailure {
                    expr: expr.to_string(),
                    reason: format!("failed to run {}: {e}", self.program),
                });
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = format!("{} ({})", output.status, stderr.trim());
            return match self.on_failure {
                FailurePolicy::Abort => Err(KpairError::OracleFailure {
                    expr: expr.to_string(),
                    reason,
                }),
                FailurePolicy::Unsat => {
                    warn!(expr = %expr, reason = %reason, "Oracle failed, counting as unsatisfiable");
                    Ok(SatResult::Unsatisfiable)
                }
            };
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            expr = %expr,
            elapsed_ms = start.elapsed().as_millis() as u64,
            bytes = stdout.len(),
            "Oracle answered"
        );

        if stdout.is_empty() {
            Ok(SatResult::Unsatisfiable)
        } else {
            Ok(SatResult::Satisfiable(stdout))
        }
    }
}
