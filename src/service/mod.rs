//! Service model.
//!
//! # Data Flow
//! ```text
//! LauncherConfig.services
//!     → chain.rs (expand variables, resolve probes and retry policies)
//!     → descriptor.rs (ServiceDescriptor, Endpoint, Device)
//!     → lifecycle::startup (executes the chain in order)
//!     → plan.rs (check mode: describe without executing)
//! ```

pub mod chain;
pub mod descriptor;
pub mod plan;

pub use chain::{ChainEntry, ChainError, ServiceChain};
pub use descriptor::{DependencyEdge, Device, Endpoint, EndpointParseError, ServiceDescriptor};
pub use plan::{plan, PlanEntry};
