//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. Every problem is
//! collected so a single run reports the whole list.

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::{BackoffKind, CommandConfig, LauncherConfig, ProbeConfig, RetryConfig, ServiceConfig};
use crate::service::Endpoint;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NoServices,
    EmptyName { index: usize },
    DuplicateService(String),
    UnknownDependency { service: String, dependency: String },
    SelfDependency(String),
    /// Dependency is declared after the dependent.
    ForwardDependency { service: String, dependency: String },
    EmptyProgram { service: String, phase: &'static str },
    InvalidEndpoint { service: String, endpoint: String },
    TcpProbeWithoutEndpoint(String),
    DevicesWithoutRegister(String),
    EmptyDevice { service: String, index: usize },
    ZeroAttempts { scope: String },
    ZeroTimeout { scope: String },
    BackoffBounds { scope: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NoServices => write!(f, "no services defined"),
            ValidationError::EmptyName { index } => write!(f, "service #{} has an empty name", index),
            ValidationError::DuplicateService(name) => write!(f, "service '{}' is defined more than once", name),
            ValidationError::UnknownDependency { service, dependency } => {
                write!(f, "service '{}' depends on unknown service '{}'", service, dependency)
            }
            ValidationError::SelfDependency(name) => write!(f, "service '{}' depends on itself", name),
            ValidationError::ForwardDependency { service, dependency } => write!(
                f,
                "service '{}' depends on '{}', which is declared after it",
                service, dependency
            ),
            ValidationError::EmptyProgram { service, phase } => {
                write!(f, "service '{}' has an empty {} program", service, phase)
            }
            ValidationError::InvalidEndpoint { service, endpoint } => {
                write!(f, "service '{}' has invalid endpoint '{}' (expected host:port)", service, endpoint)
            }
            ValidationError::TcpProbeWithoutEndpoint(name) => {
                write!(f, "service '{}' uses a tcp probe but has no endpoint", name)
            }
            ValidationError::DevicesWithoutRegister(name) => {
                write!(f, "service '{}' lists devices but has no register command", name)
            }
            ValidationError::EmptyDevice { service, index } => {
                write!(f, "service '{}' device #{} has an empty class or name", service, index)
            }
            ValidationError::ZeroAttempts { scope } => write!(f, "{}: max_attempts must be at least 1", scope),
            ValidationError::ZeroTimeout { scope } => write!(f, "{}: timeout_secs must be greater than 0", scope),
            ValidationError::BackoffBounds { scope } => {
                write!(f, "{}: max_delay_ms must not be smaller than delay_ms", scope)
            }
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &LauncherConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.services.is_empty() {
        errors.push(ValidationError::NoServices);
    }

    validate_retry(&config.retry, "retry", &mut errors);

    let mut seen: HashSet<&str> = HashSet::new();
    for (index, service) in config.services.iter().enumerate() {
        if service.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName { index });
        } else if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        if let Some(dependency) = &service.depends_on {
            if dependency == &service.name {
                errors.push(ValidationError::SelfDependency(service.name.clone()));
            } else if !seen.contains(dependency.as_str()) {
                // Not declared yet: either later in the list or nowhere.
                if config.services.iter().any(|s| &s.name == dependency) {
                    errors.push(ValidationError::ForwardDependency {
                        service: service.name.clone(),
                        dependency: dependency.clone(),
                    });
                } else {
                    errors.push(ValidationError::UnknownDependency {
                        service: service.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        validate_service(service, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_service(service: &ServiceConfig, errors: &mut Vec<ValidationError>) {
    if let Some(endpoint) = &service.endpoint {
        // Endpoints with variables are checked after expansion.
        if !endpoint.contains("${") && endpoint.parse::<Endpoint>().is_err() {
            errors.push(ValidationError::InvalidEndpoint {
                service: service.name.clone(),
                endpoint: endpoint.clone(),
            });
        }
    }

    match &service.probe {
        Some(ProbeConfig::Tcp { .. }) if service.endpoint.is_none() => {
            errors.push(ValidationError::TcpProbeWithoutEndpoint(service.name.clone()));
        }
        Some(ProbeConfig::Command { program, .. }) if program.trim().is_empty() => {
            errors.push(ValidationError::EmptyProgram {
                service: service.name.clone(),
                phase: "probe",
            });
        }
        _ => {}
    }

    check_program(service, service.register.as_ref(), "register", errors);
    check_program(service, service.start.as_ref(), "start", errors);

    if !service.devices.is_empty() && service.register.is_none() {
        errors.push(ValidationError::DevicesWithoutRegister(service.name.clone()));
    }
    for (index, device) in service.devices.iter().enumerate() {
        if device.class.trim().is_empty() || device.name.trim().is_empty() {
            errors.push(ValidationError::EmptyDevice {
                service: service.name.clone(),
                index,
            });
        }
    }

    if let Some(retry) = &service.retry {
        validate_retry(retry, &format!("services.{}.retry", service.name), errors);
    }
}

fn check_program(
    service: &ServiceConfig,
    command: Option<&CommandConfig>,
    phase: &'static str,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(command) = command {
        if command.program.trim().is_empty() {
            errors.push(ValidationError::EmptyProgram {
                service: service.name.clone(),
                phase,
            });
        }
    }
}

fn validate_retry(retry: &RetryConfig, scope: &str, errors: &mut Vec<ValidationError>) {
    if retry.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts { scope: scope.to_string() });
    }
    if retry.timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout { scope: scope.to_string() });
    }
    if retry.backoff == BackoffKind::Exponential && retry.max_delay_ms < retry.delay_ms {
        errors.push(ValidationError::BackoffBounds { scope: scope.to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> LauncherConfig {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn test_valid_chain() {
        let config = parse(
            r#"
            [[services]]
            name = "tangodb"
            endpoint = "tangodb:3306"

            [[services]]
            name = "databaseds"
            endpoint = "${TANGO_HOST}"
            depends_on = "tangodb"

            [[services]]
            name = "worker"
            depends_on = "databaseds"
            probe = { kind = "none" }
            start = { program = "SKABaseDevice", args = ["test"] }
            "#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_config() {
        let errors = validate_config(&LauncherConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoServices]);
    }

    #[test]
    fn test_dependency_errors() {
        let config = parse(
            r#"
            [[services]]
            name = "a"
            depends_on = "b"

            [[services]]
            name = "b"
            depends_on = "b"

            [[services]]
            name = "c"
            depends_on = "nowhere"

            [[services]]
            name = "a"
            "#,
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ForwardDependency {
            service: "a".into(),
            dependency: "b".into()
        }));
        assert!(errors.contains(&ValidationError::SelfDependency("b".into())));
        assert!(errors.contains(&ValidationError::UnknownDependency {
            service: "c".into(),
            dependency: "nowhere".into()
        }));
        assert!(errors.contains(&ValidationError::DuplicateService("a".into())));
    }

    #[test]
    fn test_collects_all_service_errors() {
        let config = parse(
            r#"
            [retry]
            max_attempts = 0

            [[services]]
            name = "db"
            endpoint = "no-port"
            probe = { kind = "tcp" }

            [[services]]
            name = "worker"
            probe = { kind = "tcp" }
            devices = [{ class = "", name = "x/y/z" }]
            start = { program = " " }
            retry = { delay_ms = 500, backoff = "exponential", max_delay_ms = 100, timeout_secs = 0 }
            "#,
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroAttempts { scope: "retry".into() }));
        assert!(errors.contains(&ValidationError::InvalidEndpoint {
            service: "db".into(),
            endpoint: "no-port".into()
        }));
        assert!(errors.contains(&ValidationError::TcpProbeWithoutEndpoint("worker".into())));
        assert!(errors.contains(&ValidationError::DevicesWithoutRegister("worker".into())));
        assert!(errors.contains(&ValidationError::EmptyDevice {
            service: "worker".into(),
            index: 0
        }));
        assert!(errors.contains(&ValidationError::EmptyProgram {
            service: "worker".into(),
            phase: "start"
        }));
        assert!(errors.contains(&ValidationError::BackoffBounds {
            scope: "services.worker.retry".into()
        }));
        assert!(errors.contains(&ValidationError::ZeroTimeout {
            scope: "services.worker.retry".into()
        }));
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::ForwardDependency {
            service: "worker".into(),
            dependency: "db".into(),
        };
        assert_eq!(err.to_string(), "service 'worker' depends on 'db', which is declared after it");
    }

    #[test]
    fn test_fixed_delay_ignores_exponential_cap() {
        let config = parse(
            r#"
            [retry]
            max_attempts = 3
            delay_ms = 10000

            [[services]]
            name = "db"
            endpoint = "127.0.0.1:3306"
            retry = { delay_ms = 8000, backoff = "exponential" }
            "#,
        );
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::BackoffBounds {
                scope: "services.db.retry".into()
            }]
        );
    }
}
