//! Command specifications.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::CommandConfig;
use crate::exec::environment::{EnvError, Environment};

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra variables on top of the launcher's environment.
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub inherit_output: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            timeout: None,
            inherit_output: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve a configured command, expanding `${VAR}` references.
    pub fn from_config(
        config: &CommandConfig,
        service_env: &BTreeMap<String, String>,
        environment: &Environment,
    ) -> Result<Self, EnvError> {
        let program = environment.expand(&config.program, service_env)?;
        let args = config
            .args
            .iter()
            .map(|arg| environment.expand(arg, service_env))
            .collect::<Result<Vec<_>, _>>()?;
        let cwd = config
            .cwd
            .as_ref()
            .map(|cwd| environment.expand(cwd, service_env).map(PathBuf::from))
            .transpose()?;

        Ok(Self {
            program,
            args,
            env: service_env.clone(),
            cwd,
            timeout: config.timeout_secs.map(Duration::from_secs),
            inherit_output: config.inherit_output,
        })
    }

    /// Replace `{key}` placeholders in the program and arguments.
    ///
    /// Substituted values are inserted verbatim; braces inside them are not
    /// expanded again. Unknown keys are left as they are.
    pub fn with_placeholders(&self, values: &[(&str, &str)]) -> Self {
        Self {
            program: fill_placeholders(&self.program, values),
            args: self.args.iter().map(|a| fill_placeholders(a, values)).collect(),
            ..self.clone()
        }
    }
}

fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let known = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, close))
        });

        match known {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvironmentConfig;

    #[test]
    fn test_from_config_expands_variables() {
        let environment =
            Environment::from_vars([("TANGO_HOST", "databaseds:10000")], &EnvironmentConfig::default()).unwrap();
        let config = CommandConfig {
            program: "tango_admin".into(),
            args: vec!["--ping-database".into(), "${TANGO_HOST}".into()],
            cwd: Some("/srv/${INSTANCE}".into()),
            timeout_secs: Some(5),
            inherit_output: false,
        };
        let service_env = BTreeMap::from([("INSTANCE".to_string(), "test".to_string())]);

        let spec = CommandSpec::from_config(&config, &service_env, &environment).unwrap();
        assert_eq!(spec.args, vec!["--ping-database", "databaseds:10000"]);
        assert_eq!(spec.cwd, Some(PathBuf::from("/srv/test")));
        assert_eq!(spec.timeout, Some(Duration::from_secs(5)));
        assert_eq!(spec.env.get("INSTANCE").map(String::as_str), Some("test"));
    }

    #[test]
    fn test_placeholders() {
        let spec = CommandSpec::new("tango_admin").args(["--add-server", "{server}", "{class}", "{device}"]);
        let resolved = spec.with_placeholders(&[
            ("server", "SKABaseDevice/test"),
            ("class", "SKABaseDevice"),
            ("device", "test/basedevice/1"),
        ]);
        assert_eq!(
            resolved.to_string(),
            "tango_admin --add-server SKABaseDevice/test SKABaseDevice test/basedevice/1"
        );
    }

    #[test]
    fn test_placeholders_do_not_reexpand_values() {
        let spec = CommandSpec::new("register").args(["{server}", "{device}", "json={\"k\": 1}", "{unknown}"]);
        let resolved = spec.with_placeholders(&[("server", "srv/{device}"), ("device", "test/dev/1")]);
        assert_eq!(
            resolved.args,
            vec!["srv/{device}", "test/dev/1", "json={\"k\": 1}", "{unknown}"]
        );
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let spec = CommandSpec::new("sh").arg("-c").arg("exit 3");
        assert_eq!(spec.to_string(), "sh -c 'exit 3'");
    }
}
