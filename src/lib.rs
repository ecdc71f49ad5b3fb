//! Readiness-gated service launcher library.
//!
//! Brings up a fixed list of dependent services in declared order. Each
//! service is polled until its readiness probe passes, then its devices are
//! registered and its start command runs. The first failure aborts the run.

pub mod config;
pub mod error;
pub mod exec;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod report;
pub mod resilience;
pub mod service;

pub use config::LauncherConfig;
pub use error::LaunchError;
pub use lifecycle::{LaunchReport, Launcher};
pub use service::ServiceChain;
