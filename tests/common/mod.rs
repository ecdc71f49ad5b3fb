//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use readiness_launcher::config::{parse_config, EnvironmentConfig};
use readiness_launcher::exec::{CommandOutput, CommandRunner, CommandSpec, Environment, ExecError};
use readiness_launcher::ServiceChain;

/// A fake runner that records every command and replays scripted exit codes.
///
/// Scripts are keyed by the full command line first, then by program name.
/// The last scripted code repeats once the queue is down to one entry;
/// unscripted commands exit 0.
#[derive(Default)]
pub struct RecordingRunner {
    scripts: Mutex<HashMap<String, VecDeque<i32>>>,
    unspawnable: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_codes(self, key: &str, codes: &[i32]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(key.to_string(), codes.iter().copied().collect());
        self
    }

    pub fn with_spawn_failure(mut self, program: &str) -> Self {
        self.unspawnable.insert(program.to_string());
        self
    }

    /// Make `program` take `delay` before it exits.
    pub fn with_delay(mut self, program: &str, delay: Duration) -> Self {
        self.delays.insert(program.to_string(), delay);
        self
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == command).count()
    }

    fn next_code(&self, spec: &CommandSpec) -> i32 {
        let mut scripts = self.scripts.lock().unwrap();
        let line = spec.to_string();
        let key = if scripts.contains_key(&line) { line } else { spec.program.clone() };
        let queue = scripts.get_mut(&key);
        match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(0),
            Some(queue) => queue.front().copied().unwrap_or(0),
            None => 0,
        }
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec, _env: &Environment) -> Result<CommandOutput, ExecError> {
        self.calls.lock().unwrap().push(spec.to_string());

        if self.unspawnable.contains(&spec.program) {
            return Err(ExecError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        if let Some(delay) = self.delays.get(&spec.program) {
            tokio::time::sleep(*delay).await;
        }

        let code = self.next_code(spec);
        Ok(CommandOutput {
            code: Some(code),
            stdout: String::new(),
            stderr: if code == 0 { String::new() } else { format!("{} failed", spec.program) },
            elapsed: Duration::from_millis(1),
        })
    }
}

/// An environment with no variables.
pub fn empty_env() -> Environment {
    Environment::from_vars(Vec::<(String, String)>::new(), &EnvironmentConfig::default()).unwrap()
}

/// Parse, validate and resolve a chain from TOML.
pub fn chain(toml_src: &str) -> ServiceChain {
    let config = parse_config(toml_src).unwrap();
    ServiceChain::from_config(&config, &empty_env()).unwrap()
}

/// A port on localhost that nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
