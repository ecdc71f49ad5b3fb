//! Startup orchestration.
//!
//! # Responsibilities
//! - Walk the service chain in declared order
//! - Gate each service on its readiness probe
//! - Register devices, then run the start command
//! - Record what happened for reports
//!
//! # Design Decisions
//! - Fail fast: the first failure aborts the run, later services are skipped
//! - Forward-only: nothing already started is rolled back
//! - Registration tries every device before failing the step
//! - A termination signal ends the current step; the report is still built

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tracing::Instrument;
use uuid::Uuid;

use crate::error::LaunchError;
use crate::exec::{CommandRunner, CommandSpec, Environment};
use crate::observability::metrics;
use crate::resilience::wait_until_ready;
use crate::service::{ChainEntry, ServiceChain, ServiceDescriptor};

/// Stage of a service step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Register,
    Start,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Register => "register",
            Phase::Start => "start",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One command the launcher ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub phase: Phase,
    pub command: String,
    pub device: Option<String>,
    pub code: Option<i32>,
    pub elapsed: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Failed { kind: &'static str, message: String },
    /// Not attempted because an earlier service failed.
    Skipped,
}

/// What happened to one service.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub service: String,
    pub status: StepStatus,
    pub attempts: u32,
    pub elapsed: Duration,
    pub commands: Vec<CommandRecord>,
}

impl StepReport {
    fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            status: StepStatus::Skipped,
            attempts: 0,
            elapsed: Duration::ZERO,
            commands: Vec::new(),
        }
    }
}

/// Result of a whole launch.
#[derive(Debug)]
pub struct LaunchReport {
    pub run_id: Uuid,
    pub steps: Vec<StepReport>,
    pub elapsed: Duration,
    pub error: Option<LaunchError>,
}

impl LaunchReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&LaunchError> {
        self.error.as_ref()
    }

    pub fn exit_code(&self) -> u8 {
        self.error.as_ref().map(LaunchError::exit_code).unwrap_or(0)
    }

    pub fn step(&self, service: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.service == service)
    }

    /// Commands in execution order, across all services.
    pub fn commands(&self) -> impl Iterator<Item = (&str, &CommandRecord)> {
        self.steps
            .iter()
            .flat_map(|s| s.commands.iter().map(move |c| (s.service.as_str(), c)))
    }
}

/// Readiness-gated service launcher.
pub struct Launcher<R> {
    runner: R,
    env: Environment,
    run_id: Uuid,
}

impl<R: CommandRunner> Launcher<R> {
    pub fn new(runner: R, env: Environment) -> Self {
        Self {
            runner,
            env,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Bring up every service in the chain, stopping at the first failure.
    pub async fn launch(&self, chain: &ServiceChain) -> LaunchReport {
        self.launch_until(chain, std::future::pending::<&'static str>()).await
    }

    /// Like [`launch`](Self::launch), but abort when `shutdown` resolves.
    ///
    /// The in-flight step is marked failed with [`LaunchError::Interrupted`]
    /// and the rest are skipped, so the report still covers every service.
    pub async fn launch_until<F>(&self, chain: &ServiceChain, shutdown: F) -> LaunchReport
    where
        F: Future<Output = &'static str>,
    {
        let span = tracing::info_span!("launch", run_id = %self.run_id);
        self.launch_inner(chain, shutdown).instrument(span).await
    }

    async fn launch_inner<F>(&self, chain: &ServiceChain, shutdown: F) -> LaunchReport
    where
        F: Future<Output = &'static str>,
    {
        tokio::pin!(shutdown);
        let started = Instant::now();
        tracing::info!(services = chain.len(), order = ?chain.names(), "Launch starting");
        if !self.env.passthrough().is_empty() {
            tracing::info!(passthrough = ?self.env.passthrough(), "Passing environment to children");
        }

        let mut steps = Vec::with_capacity(chain.len());
        let mut error: Option<LaunchError> = None;

        for entry in chain.iter() {
            if error.is_some() {
                tracing::info!(service = %entry.service.name, "Skipping service after earlier failure");
                steps.push(StepReport::new(&entry.service.name));
                continue;
            }

            let mut step = StepReport::new(&entry.service.name);
            let step_started = Instant::now();
            let result = tokio::select! {
                result = self.run_step(entry, &mut step) => result,
                signal = &mut shutdown => {
                    tracing::warn!(service = %entry.service.name, signal, "Termination requested, aborting launch");
                    Err(LaunchError::Interrupted(signal))
                }
            };
            step.elapsed = step_started.elapsed();

            match result {
                Ok(()) => step.status = StepStatus::Completed,
                Err(e) => {
                    step.status = StepStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    };
                    error = Some(e);
                }
            }
            steps.push(step);
        }

        let elapsed = started.elapsed();
        metrics::record_launch(error.is_none());
        match &error {
            None => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "Launch complete"),
            Some(e) => tracing::error!(error = %e, exit_code = e.exit_code(), "Launch aborted"),
        }

        LaunchReport {
            run_id: self.run_id,
            steps,
            elapsed,
            error,
        }
    }

    async fn run_step(&self, entry: &ChainEntry, step: &mut StepReport) -> Result<(), LaunchError> {
        let service = &entry.service;
        tracing::info!(
            service = %service.name,
            depends_on = ?service.depends_on,
            probe = service.probe.kind(),
            target = %service.probe.target(),
            "Waiting for service"
        );

        match wait_until_ready(&service.name, &service.probe, &entry.retry, &self.runner, &self.env).await {
            Ok(outcome) => step.attempts = outcome.attempts,
            Err(timeout) => {
                step.attempts = timeout.attempts;
                return Err(timeout.into());
            }
        }

        self.register(service, step).await?;

        if let Some(start) = &service.start {
            self.execute(service, Phase::Start, None, start, step).await?;
        }

        Ok(())
    }

    async fn register(&self, service: &ServiceDescriptor, step: &mut StepReport) -> Result<(), LaunchError> {
        let commands = service.registration_commands();
        let total = commands.len();
        let mut failed = 0;
        let mut first_error = None;

        for (device, spec) in commands {
            let device_name = device.map(|d| d.name.clone());
            match self.execute(service, Phase::Register, device_name.clone(), &spec, step).await {
                Ok(()) => {
                    if let Some(device) = &device_name {
                        tracing::info!(service = %service.name, device = %device, "Registered device");
                    }
                }
                Err(e) => {
                    failed += 1;
                    if let Some(device) = &device_name {
                        tracing::error!(service = %service.name, device = %device, error = %e, "Device registration failed");
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(e) if service.devices.is_empty() => Err(e),
            Some(_) => Err(LaunchError::Registration {
                service: service.name.clone(),
                failed,
                total,
            }),
        }
    }

    async fn execute(
        &self,
        service: &ServiceDescriptor,
        phase: Phase,
        device: Option<String>,
        spec: &CommandSpec,
        step: &mut StepReport,
    ) -> Result<(), LaunchError> {
        tracing::info!(service = %service.name, phase = %phase, command = %spec, "Running command");

        let result = self.runner.run(spec, &self.env).await;
        let mut record = CommandRecord {
            phase,
            command: spec.to_string(),
            device,
            code: None,
            elapsed: Duration::ZERO,
            error: None,
        };

        let outcome = match result {
            Ok(output) => {
                record.code = output.code;
                record.elapsed = output.elapsed;
                if !output.stdout.is_empty() {
                    tracing::debug!(service = %service.name, phase = %phase, stdout = %output.stdout.trim_end(), "Command output");
                }

                if output.success() {
                    tracing::info!(
                        service = %service.name,
                        phase = %phase,
                        elapsed_ms = output.elapsed.as_millis() as u64,
                        "Command succeeded"
                    );
                    Ok(())
                } else {
                    let detail = output.summary().map(str::to_string);
                    tracing::error!(
                        service = %service.name,
                        phase = %phase,
                        code = ?output.code,
                        stderr = %output.stderr.trim_end(),
                        "Command failed"
                    );
                    record.error = detail.clone();
                    Err(LaunchError::CommandFailed {
                        service: service.name.clone(),
                        phase,
                        command: spec.to_string(),
                        code: output.code,
                        detail,
                    })
                }
            }
            Err(source) => {
                tracing::error!(service = %service.name, phase = %phase, error = %source, "Command could not run");
                record.error = Some(source.to_string());
                Err(LaunchError::Command {
                    service: service.name.clone(),
                    phase,
                    source,
                })
            }
        };

        metrics::record_command(&service.name, phase.as_str(), outcome.is_ok());
        step.commands.push(record);
        outcome
    }
}
