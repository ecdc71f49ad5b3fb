//! Launch error taxonomy and process exit codes.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::exec::{EnvError, ExecError};
use crate::lifecycle::startup::Phase;
use crate::resilience::ReadinessTimeout;
use crate::service::ChainError;

/// Exit code for configuration and argument problems.
pub const EXIT_USAGE: u8 = 2;
/// Exit code when a dependency never became ready.
pub const EXIT_NOT_READY: u8 = 3;
/// Exit code when a command ran past its timeout.
pub const EXIT_TIMED_OUT: u8 = 124;
/// Exit code when a command could not be started.
pub const EXIT_NOT_FOUND: u8 = 127;
/// Exit code after SIGINT/SIGTERM.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Anything that stops the launcher.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Environment(#[from] EnvError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    NotReady(#[from] ReadinessTimeout),

    #[error("service '{service}': {phase} command '{command}' exited with {}{}",
        .code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()),
        .detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default())]
    CommandFailed {
        service: String,
        phase: Phase,
        command: String,
        code: Option<i32>,
        detail: Option<String>,
    },

    #[error("service '{service}': {phase} command failed: {source}")]
    Command {
        service: String,
        phase: Phase,
        #[source]
        source: ExecError,
    },

    #[error("service '{service}': {failed} of {total} device registrations failed")]
    Registration { service: String, failed: usize, total: usize },

    #[error("interrupted by {0}")]
    Interrupted(&'static str),

    #[error("failed to write report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::Config(_) | LaunchError::Environment(_) | LaunchError::Chain(_) => EXIT_USAGE,
            LaunchError::NotReady(_) => EXIT_NOT_READY,
            LaunchError::CommandFailed { code, .. } => match code {
                Some(c) if (1..=255).contains(c) => *c as u8,
                _ => 1,
            },
            LaunchError::Command { source, .. } => match source {
                ExecError::Spawn { .. } => EXIT_NOT_FOUND,
                ExecError::TimedOut { .. } => EXIT_TIMED_OUT,
                ExecError::Wait { .. } => 1,
            },
            LaunchError::Registration { .. } | LaunchError::Report { .. } => 1,
            LaunchError::Interrupted(_) => EXIT_INTERRUPTED,
        }
    }

    /// Short machine-readable category, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            LaunchError::Config(_) | LaunchError::Environment(_) | LaunchError::Chain(_) => "configuration",
            LaunchError::NotReady(_) => "readiness-timeout",
            LaunchError::CommandFailed { .. } => "command-failed",
            LaunchError::Command { source, .. } => match source {
                ExecError::TimedOut { .. } => "command-timeout",
                _ => "command-error",
            },
            LaunchError::Registration { .. } => "registration-failed",
            LaunchError::Interrupted(_) => "interrupted",
            LaunchError::Report { .. } => "report",
        }
    }
}
