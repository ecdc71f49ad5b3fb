//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     For each service in order:
//!         wait for readiness → register devices → run start command
//!     First failure → skip the rest → LaunchReport with error
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → fail the current step, skip the rest, exit 130
//! ```
//!
//! # Design Decisions
//! - Ordered startup: strictly sequential, no fan-out
//! - No rollback of services that already started

pub mod signals;
pub mod startup;

pub use startup::{CommandRecord, LaunchReport, Launcher, Phase, StepReport, StepStatus};
