//! Environment capture, passthrough and `${VAR}` expansion.

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::process::Command;

use crate::config::EnvironmentConfig;

/// Errors raised while resolving the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("required environment variables are not set: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("undefined variable '{name}' in '{input}'")]
    Undefined { name: String, input: String },

    #[error("unterminated variable reference in '{0}'")]
    Unterminated(String),
}

/// Snapshot of the launcher's environment, taken once at startup.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, String>,
    passthrough: BTreeMap<String, String>,
    isolate: bool,
}

impl Environment {
    /// Capture the current process environment.
    pub fn capture(config: &EnvironmentConfig) -> Result<Self, EnvError> {
        Self::from_vars(std::env::vars(), config)
    }

    /// Build an environment from an explicit variable set.
    pub fn from_vars<I, K, V>(vars: I, config: &EnvironmentConfig) -> Result<Self, EnvError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

        let missing: Vec<String> = config
            .required
            .iter()
            .filter(|name| !vars.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(EnvError::MissingRequired(missing));
        }

        let passthrough = config
            .passthrough
            .iter()
            .filter_map(|name| vars.get(name).map(|value| (name.clone(), value.clone())))
            .collect();

        Ok(Self {
            vars,
            passthrough,
            isolate: config.isolate,
        })
    }

    /// Passthrough variables that were present at startup.
    pub fn passthrough(&self) -> &BTreeMap<String, String> {
        &self.passthrough
    }

    /// Look up a captured variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn is_isolated(&self) -> bool {
        self.isolate
    }

    /// Expand `${NAME}` and `${NAME:-default}` references.
    ///
    /// `local` (a service's own `env` table) shadows the captured environment.
    pub fn expand(&self, input: &str, local: &BTreeMap<String, String>) -> Result<String, EnvError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| EnvError::Unterminated(input.to_string()))?;
            let reference = &after[..end];

            let (name, default) = match reference.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (reference, None),
            };

            let value = local
                .get(name)
                .map(String::as_str)
                .or_else(|| self.get(name))
                .filter(|v| !(v.is_empty() && default.is_some()))
                .or(default)
                .ok_or_else(|| EnvError::Undefined {
                    name: name.to_string(),
                    input: input.to_string(),
                })?;

            out.push_str(value);
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Apply this environment plus a service's extra variables to a child command.
    pub fn apply(&self, command: &mut Command, extra: &BTreeMap<String, String>) {
        if self.isolate {
            command.env_clear();
            if let Some(path) = self.vars.get("PATH") {
                command.env("PATH", path);
            }
        }
        command.envs(&self.passthrough);
        command.envs(extra);
    }
}
