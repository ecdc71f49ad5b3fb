//! Command exit-status probe.

use std::time::Duration;

use crate::exec::{CommandRunner, CommandSpec, Environment};
use crate::probe::Readiness;

#[derive(Debug, Clone)]
pub struct CommandProbe {
    command: CommandSpec,
}

impl CommandProbe {
    pub fn new(command: CommandSpec, timeout: Duration) -> Self {
        Self {
            command: command.timeout(timeout),
        }
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Spawn failures and timeouts count as "not ready", same as a non-zero exit.
    pub async fn check<R: CommandRunner>(&self, runner: &R, env: &Environment) -> Readiness {
        match runner.run(&self.command, env).await {
            Ok(output) if output.success() => Readiness::Ready,
            Ok(output) => {
                let code = output
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                let reason = match output.summary() {
                    Some(line) => format!("'{}' exited with {}: {}", self.command, code, line),
                    None => format!("'{}' exited with {}", self.command, code),
                };
                Readiness::NotReady(reason)
            }
            Err(e) => Readiness::NotReady(e.to_string()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::exec::ProcessRunner;

    #[tokio::test]
    async fn test_exit_status_decides() {
        let env = Environment::default();
        let ok = CommandProbe::new(CommandSpec::new("true"), Duration::from_secs(5));
        assert_eq!(ok.check(&ProcessRunner, &env).await, Readiness::Ready);

        let failing = CommandProbe::new(
            CommandSpec::new("sh").args(["-c", "echo 'not yet' >&2; exit 4"]),
            Duration::from_secs(5),
        );
        match failing.check(&ProcessRunner, &env).await {
            Readiness::NotReady(reason) => {
                assert!(reason.contains("exited with 4"), "{}", reason);
                assert!(reason.contains("not yet"), "{}", reason);
            }
            Readiness::Ready => panic!("probe should fail"),
        }
    }

    #[tokio::test]
    async fn test_spawn_failure_is_not_ready() {
        let probe = CommandProbe::new(
            CommandSpec::new("/nonexistent/readiness-probe"),
            Duration::from_secs(5),
        );
        assert!(!probe.check(&ProcessRunner, &Environment::default()).await.is_ready());
    }

    #[tokio::test]
    async fn test_timeout_is_not_ready() {
        let probe = CommandProbe::new(CommandSpec::new("sleep").arg("5"), Duration::from_millis(100));
        match probe.check(&ProcessRunner, &Environment::default()).await {
            Readiness::NotReady(reason) => assert!(reason.contains("timed out"), "{}", reason),
            Readiness::Ready => panic!("probe should time out"),
        }
    }
}
