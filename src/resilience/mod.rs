//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Service in the chain:
//!     → retries.rs (poll probe, bounded by attempts and deadline)
//!     → backoff.rs (fixed or exponential delay between attempts)
//! ```
//!
//! # Design Decisions
//! - Only readiness polling is retried; commands run exactly once
//! - Every probe attempt has its own timeout

pub mod backoff;
pub mod retries;

pub use backoff::{calculate_backoff, Backoff};
pub use retries::{wait_until_ready, ReadinessTimeout, ReadyOutcome, RetryPolicy};
