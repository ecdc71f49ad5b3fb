//! Ordered dependency chain.
//!
//! # Design Decisions
//! - Execution order is the declared order
//! - A dependency must be declared before its dependent, so declared order
//!   is always a valid bring-up order and cycles cannot exist
//! - Variable expansion happens here, once, before anything runs

use thiserror::Error;

use crate::config::{LauncherConfig, ProbeConfig, ServiceConfig};
use crate::exec::{CommandSpec, EnvError, Environment};
use crate::probe::Probe;
use crate::resilience::RetryPolicy;
use crate::service::descriptor::{DependencyEdge, Device, Endpoint, EndpointParseError, ServiceDescriptor};

/// Errors raised while resolving descriptors from configuration.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("service '{service}': {source}")]
    Environment {
        service: String,
        #[source]
        source: EnvError,
    },

    #[error("service '{service}': {source}")]
    Endpoint {
        service: String,
        #[source]
        source: EndpointParseError,
    },

    #[error("service '{service}' uses a tcp probe but has no endpoint")]
    MissingEndpoint { service: String },

    #[error("service '{0}' is not defined")]
    UnknownService(String),

    #[error("failed to build http probe for service '{service}': {source}")]
    HttpClient {
        service: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A service together with its resolved readiness policy.
#[derive(Debug, Clone)]
pub struct ChainEntry {
    pub service: ServiceDescriptor,
    pub retry: RetryPolicy,
}

/// Services in bring-up order.
#[derive(Debug, Clone, Default)]
pub struct ServiceChain {
    entries: Vec<ChainEntry>,
}

impl ServiceChain {
    pub fn new(entries: Vec<ChainEntry>) -> Self {
        Self { entries }
    }

    /// Resolve every configured service against the captured environment.
    pub fn from_config(config: &LauncherConfig, environment: &Environment) -> Result<Self, ChainError> {
        let entries = config
            .services
            .iter()
            .map(|service| {
                let retry = RetryPolicy::from(service.retry.as_ref().unwrap_or(&config.retry));
                let service = resolve_service(service, environment)?;
                Ok(ChainEntry { service, retry })
            })
            .collect::<Result<Vec<_>, ChainError>>()?;

        Ok(Self { entries })
    }

    /// Truncate the chain after the named service.
    pub fn until(mut self, name: &str) -> Result<Self, ChainError> {
        let position = self
            .entries
            .iter()
            .position(|e| e.service.name == name)
            .ok_or_else(|| ChainError::UnknownService(name.to_string()))?;
        self.entries.truncate(position + 1);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ChainEntry> {
        self.entries.iter().find(|e| e.service.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.service.name.as_str()).collect()
    }

    /// Declared `(dependent, dependency)` pairs.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.entries
            .iter()
            .filter_map(|e| {
                e.service.depends_on.as_ref().map(|dependency| DependencyEdge {
                    dependent: e.service.name.clone(),
                    dependency: dependency.clone(),
                })
            })
            .collect()
    }
}

fn resolve_service(config: &ServiceConfig, environment: &Environment) -> Result<ServiceDescriptor, ChainError> {
    let name = config.name.clone();
    let env_err = |source: EnvError| ChainError::Environment {
        service: name.clone(),
        source,
    };

    let endpoint = config
        .endpoint
        .as_ref()
        .map(|raw| {
            let expanded = environment.expand(raw, &config.env).map_err(env_err)?;
            expanded.parse::<Endpoint>().map_err(|source| ChainError::Endpoint {
                service: name.clone(),
                source,
            })
        })
        .transpose()?;

    let probe = match (&config.probe, &endpoint) {
        (Some(ProbeConfig::None), _) | (None, None) => Probe::None,
        (Some(ProbeConfig::Tcp { timeout_ms }), Some(endpoint)) => Probe::tcp(endpoint.clone(), *timeout_ms),
        (None, Some(endpoint)) => Probe::tcp(endpoint.clone(), 1000),
        (Some(ProbeConfig::Tcp { .. }), None) => {
            return Err(ChainError::MissingEndpoint { service: name.clone() });
        }
        (Some(ProbeConfig::Command { program, args, timeout_ms }), _) => {
            let command = CommandSpec::from_config(
                &crate::config::CommandConfig {
                    program: program.clone(),
                    args: args.clone(),
                    cwd: None,
                    timeout_secs: None,
                    inherit_output: false,
                },
                &config.env,
                environment,
            )
            .map_err(env_err)?;
            Probe::command(command, *timeout_ms)
        }
        (Some(ProbeConfig::Http { url, timeout_ms }), _) => {
            let url = environment.expand(url, &config.env).map_err(env_err)?;
            Probe::http(url, *timeout_ms).map_err(|source| ChainError::HttpClient {
                service: name.clone(),
                source,
            })?
        }
    };

    let register = config
        .register
        .as_ref()
        .map(|c| CommandSpec::from_config(c, &config.env, environment))
        .transpose()
        .map_err(env_err)?;
    let start = config
        .start
        .as_ref()
        .map(|c| CommandSpec::from_config(c, &config.env, environment))
        .transpose()
        .map_err(env_err)?;
    let server = match &config.server {
        Some(server) => environment.expand(server, &config.env).map_err(env_err)?,
        None => name.clone(),
    };

    Ok(ServiceDescriptor {
        name: name.clone(),
        endpoint,
        depends_on: config.depends_on.clone(),
        probe,
        server,
        register,
        devices: config
            .devices
            .iter()
            .map(|d| Device {
                class: d.class.clone(),
                name: d.name.clone(),
            })
            .collect(),
        start,
    })
}
