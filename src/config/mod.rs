//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → LauncherConfig (validated, immutable)
//!     → service::ServiceChain::from_config (variable expansion, descriptors)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; descriptors are built once per process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BackoffKind, CommandConfig, DeviceConfig, EnvironmentConfig, LauncherConfig, LogFormat,
    ObservabilityConfig, ProbeConfig, ReportConfig, RetryConfig, ServiceConfig,
};
pub use validation::ValidationError;
