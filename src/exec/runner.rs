//! Process execution.
//!
//! # Responsibilities
//! - Spawn external commands with the launcher environment applied
//! - Enforce per-command timeouts
//! - Capture or forward output
//!
//! # Design Decisions
//! - Children are killed when the waiting future is dropped
//! - stdin is always closed; commands must not be interactive

use std::future::Future;
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;
use tokio::time;

use crate::exec::command::CommandSpec;
use crate::exec::environment::Environment;

/// Result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last non-empty line of stderr, falling back to stdout.
    pub fn summary(&self) -> Option<&str> {
        last_line(&self.stderr).or_else(|| last_line(&self.stdout))
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

/// Errors that prevent a command from producing an exit status.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {} ms", .timeout.as_millis())]
    TimedOut { program: String, timeout: Duration },

    #[error("failed waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs external commands.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        spec: &CommandSpec,
        env: &Environment,
    ) -> impl Future<Output = Result<CommandOutput, ExecError>> + Send;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec, env: &Environment) -> Result<CommandOutput, ExecError> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        if spec.inherit_output {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        env.apply(&mut command, &spec.env);

        let started = Instant::now();
        let child = command.spawn().map_err(|source| ExecError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        tracing::debug!(command = %spec, pid = ?child.id(), "Spawned command");

        let output = match spec.timeout {
            Some(timeout) => time::timeout(timeout, child.wait_with_output())
                .await
                .map_err(|_| ExecError::TimedOut {
                    program: spec.program.clone(),
                    timeout,
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|source| ExecError::Wait {
            program: spec.program.clone(),
            source,
        })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prefers_stderr() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "starting\ndone\n".into(),
            stderr: "\nDB connection refused\n\n".into(),
            elapsed: Duration::ZERO,
        };
        assert!(!output.success());
        assert_eq!(output.summary(), Some("DB connection refused"));

        let quiet = CommandOutput {
            stderr: String::new(),
            ..output
        };
        assert_eq!(quiet.summary(), Some("done"));
    }

    #[test]
    fn test_error_display() {
        let err = ExecError::TimedOut {
            program: "tango_admin".into(),
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "'tango_admin' timed out after 1500 ms");
    }
}
