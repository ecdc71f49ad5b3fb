//! External command execution.
//!
//! # Data Flow
//! ```text
//! CommandConfig + service env
//!     → environment.rs (expand ${VAR}, passthrough, isolation)
//!     → command.rs (CommandSpec, registration placeholders)
//!     → runner.rs (spawn, wait with timeout, capture output)
//! ```

pub mod command;
pub mod environment;
pub mod runner;

pub use command::CommandSpec;
pub use environment::{EnvError, Environment};
pub use runner::{CommandOutput, CommandRunner, ExecError, ProcessRunner};
