//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the launcher.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Variables handed to every child process unless the config says otherwise.
pub const DEFAULT_PASSTHROUGH: &[&str] = &[
    "TANGO_HOST",
    "MYSQL_HOST",
    "DOCKER_REGISTRY_HOST",
    "DOCKER_REGISTRY_USER",
    "NETWORK_MODE",
    "CONTAINER_NAME_PREFIX",
];

/// Root configuration for the launcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LauncherConfig {
    /// Default readiness polling policy.
    pub retry: RetryConfig,

    /// Environment passthrough and requirements.
    pub environment: EnvironmentConfig,

    /// Report artifacts.
    pub report: ReportConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Services in dependency order.
    pub services: Vec<ServiceConfig>,
}

impl LauncherConfig {
    /// Find a service by name.
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }
}

/// One deployable unit.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique service identifier.
    pub name: String,

    /// Network endpoint (e.g., "databaseds:10000"). Supports `${VAR}` expansion.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Name of the earlier-declared service this one depends on.
    #[serde(default)]
    pub depends_on: Option<String>,

    /// Readiness probe. Defaults to TCP when an endpoint is set.
    #[serde(default)]
    pub probe: Option<ProbeConfig>,

    /// Per-service override of the global retry policy.
    #[serde(default)]
    pub retry: Option<RetryConfig>,

    /// Server identifier used by registration (e.g., "SKABaseDevice/test").
    #[serde(default)]
    pub server: Option<String>,

    /// Registration command, run once per device (or once if there are none).
    #[serde(default)]
    pub register: Option<CommandConfig>,

    /// Devices to register for this service.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    /// Start command.
    #[serde(default)]
    pub start: Option<CommandConfig>,

    /// Extra variables for this service's commands.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A device registered against the service's server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Device class (e.g., "SKABaseDevice").
    pub class: String,

    /// Device name (e.g., "test/basedevice/1").
    pub name: String,
}

/// External command definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandConfig {
    /// Executable to run (looked up on PATH).
    pub program: String,

    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory.
    #[serde(default)]
    pub cwd: Option<String>,

    /// Kill the command after this many seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Forward stdout/stderr to the launcher's own streams instead of capturing.
    #[serde(default)]
    pub inherit_output: bool,
}

/// Readiness probe definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    /// Always ready.
    None,

    /// TCP connect to the service endpoint.
    Tcp {
        #[serde(default = "default_probe_timeout_ms")]
        timeout_ms: u64,
    },

    /// Exit status of a command.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default = "default_probe_timeout_ms")]
        timeout_ms: u64,
    },

    /// HTTP GET returning 2xx.
    Http {
        url: String,
        #[serde(default = "default_probe_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

/// Delay strategy between readiness attempts.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// Readiness polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of probe attempts.
    pub max_attempts: u32,

    /// Overall deadline for a service to become ready, in seconds.
    pub timeout_secs: Option<u64>,

    /// Delay between attempts (base delay for exponential backoff) in milliseconds.
    pub delay_ms: u64,

    /// Delay strategy.
    pub backoff: BackoffKind,

    /// Upper bound for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            timeout_secs: None,
            delay_ms: 1000,
            backoff: BackoffKind::Fixed,
            max_delay_ms: 5000,
        }
    }
}

/// Environment handling for child processes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Variables passed through unmodified to every child.
    pub passthrough: Vec<String>,

    /// Variables that must be set before anything runs.
    pub required: Vec<String>,

    /// Start children from an empty environment (plus PATH and passthrough).
    pub isolate: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            passthrough: DEFAULT_PASSTHROUGH.iter().map(|s| s.to_string()).collect(),
            required: Vec::new(),
            isolate: false,
        }
    }
}

/// Report artifact configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Write a JUnit report after each run.
    pub enabled: bool,

    /// Output directory.
    pub directory: String,

    /// JUnit XML file name.
    pub file_name: String,

    /// Prometheus textfile name, written next to the JUnit report.
    pub metrics_file: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "build/reports".to_string(),
            file_name: "launcher-junit.xml".to_string(),
            metrics_file: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
