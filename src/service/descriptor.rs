//! Service descriptors.

use std::fmt;
use std::str::FromStr;

use crate::exec::CommandSpec;
use crate::probe::Probe;

/// A `host:port` network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

/// Error for malformed endpoints.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid endpoint '{0}', expected host:port")]
pub struct EndpointParseError(pub String);

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || EndpointParseError(s.to_string());
        let s = s.trim();

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            // [v6]:port
            let (host, port) = rest.split_once("]:").ok_or_else(err)?;
            (host, port)
        } else {
            s.rsplit_once(':').ok_or_else(err)?
        };

        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(err());
        }
        let port: u16 = port.parse().map_err(|_| err())?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A device registered against a service's server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub class: String,
    pub name: String,
}

/// `dependent` runs only after `dependency` is ready and started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub dependent: String,
    pub dependency: String,
}

/// Static description of one deployable unit.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: String,
    pub endpoint: Option<Endpoint>,
    pub depends_on: Option<String>,
    pub probe: Probe,
    pub server: String,
    pub register: Option<CommandSpec>,
    pub devices: Vec<Device>,
    pub start: Option<CommandSpec>,
}

impl ServiceDescriptor {
    /// Registration commands with placeholders filled in.
    ///
    /// One per device, or a single one when no devices are declared.
    pub fn registration_commands(&self) -> Vec<(Option<&Device>, CommandSpec)> {
        let Some(register) = &self.register else {
            return Vec::new();
        };

        if self.devices.is_empty() {
            let spec = register.with_placeholders(&[("service", self.name.as_str()), ("server", self.server.as_str())]);
            return vec![(None, spec)];
        }

        self.devices
            .iter()
            .map(|device| {
                let spec = register.with_placeholders(&[
                    ("service", self.name.as_str()),
                    ("server", self.server.as_str()),
                    ("class", device.class.as_str()),
                    ("device", device.name.as_str()),
                ]);
                (Some(device), spec)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        let ep: Endpoint = "databaseds:10000".parse().unwrap();
        assert_eq!(ep.host, "databaseds");
        assert_eq!(ep.port, 10000);
        assert_eq!(ep.to_string(), "databaseds:10000");

        let v6: Endpoint = "[::1]:3306".parse().unwrap();
        assert_eq!(v6.host, "::1");
        assert_eq!(v6.to_string(), "[::1]:3306");
    }

    #[test]
    fn test_parse_endpoint_errors() {
        for bad in ["databaseds", ":10000", "host:", "host:99999", "host:abc", "[::1]3306", "a b:1"] {
            assert!(bad.parse::<Endpoint>().is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_registration_commands_per_device() {
        let service = ServiceDescriptor {
            name: "basedevice".into(),
            endpoint: None,
            depends_on: None,
            probe: Probe::None,
            server: "SKABaseDevice/test".into(),
            register: Some(CommandSpec::new("tango_admin").args(["--add-server", "{server}", "{class}", "{device}"])),
            devices: vec![
                Device {
                    class: "SKABaseDevice".into(),
                    name: "test/basedevice/1".into(),
                },
                Device {
                    class: "SKABaseDevice".into(),
                    name: "test/basedevice/2".into(),
                },
            ],
            start: None,
        };

        let commands = service.registration_commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[1].1.args,
            vec!["--add-server", "SKABaseDevice/test", "SKABaseDevice", "test/basedevice/2"]
        );
        assert_eq!(commands[0].0.map(|d| d.name.as_str()), Some("test/basedevice/1"));
    }

    #[test]
    fn test_registration_without_devices_runs_once() {
        let service = ServiceDescriptor {
            name: "alarms".into(),
            endpoint: None,
            depends_on: None,
            probe: Probe::None,
            server: "alarms".into(),
            register: Some(CommandSpec::new("register-{service}")),
            devices: Vec::new(),
            start: None,
        };

        let commands = service.registration_commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].0.is_none());
        assert_eq!(commands[0].1.program, "register-alarms");
    }
}
