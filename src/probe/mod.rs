//! Readiness probing subsystem.
//!
//! # Data Flow
//! ```text
//! resilience::retries (one attempt)
//!     → Probe::check
//!         - none: always ready
//!         - tcp.rs: connect to host:port
//!         - command.rs: run a command, exit 0 means ready
//!         - http.rs: GET, 2xx means ready
//!     → Readiness::Ready | Readiness::NotReady(reason)
//! ```
//!
//! # Design Decisions
//! - A probe never errors; anything that goes wrong is "not ready"
//! - Every attempt has its own timeout so a hung dependency cannot stall polling

pub mod command;
pub mod http;
pub mod tcp;

use std::time::Duration;

use crate::exec::{CommandRunner, CommandSpec, Environment};
use crate::service::Endpoint;

pub use command::CommandProbe;
pub use http::HttpProbe;
pub use tcp::TcpProbe;

/// Outcome of a single probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// A readiness check for one service.
#[derive(Debug, Clone)]
pub enum Probe {
    None,
    Tcp(TcpProbe),
    Command(CommandProbe),
    Http(HttpProbe),
}

impl Probe {
    pub fn tcp(endpoint: Endpoint, timeout_ms: u64) -> Self {
        Probe::Tcp(TcpProbe::new(endpoint, Duration::from_millis(timeout_ms)))
    }

    pub fn command(command: CommandSpec, timeout_ms: u64) -> Self {
        Probe::Command(CommandProbe::new(command, Duration::from_millis(timeout_ms)))
    }

    pub fn http(url: String, timeout_ms: u64) -> Result<Self, reqwest::Error> {
        Ok(Probe::Http(HttpProbe::new(url, Duration::from_millis(timeout_ms))?))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Probe::None => "none",
            Probe::Tcp(_) => "tcp",
            Probe::Command(_) => "command",
            Probe::Http(_) => "http",
        }
    }

    /// What the probe checks, for plans and logs.
    pub fn target(&self) -> String {
        match self {
            Probe::None => String::new(),
            Probe::Tcp(p) => p.endpoint().to_string(),
            Probe::Command(p) => p.command().to_string(),
            Probe::Http(p) => p.url().to_string(),
        }
    }

    /// Run a single attempt.
    pub async fn check<R: CommandRunner>(&self, runner: &R, env: &Environment) -> Readiness {
        match self {
            Probe::None => Readiness::Ready,
            Probe::Tcp(p) => p.check().await,
            Probe::Command(p) => p.check(runner, env).await,
            Probe::Http(p) => p.check().await,
        }
    }
}
