//! readiness-launcher
//!
//! Brings up dependent services in order, gated on readiness.
//!
//! # Architecture Overview
//!
//! ```text
//!   launcher.toml
//!        │
//!        ▼
//!   ┌─────────┐    ┌─────────────┐    ┌──────────────────────────────────────┐
//!   │ config  │───▶│ service     │───▶│ lifecycle::startup (per service)     │
//!   │ load +  │    │ chain (env  │    │                                      │
//!   │ validate│    │ expansion)  │    │  probe ──▶ register ──▶ start        │
//!   └─────────┘    └─────────────┘    │    ▲          │            │         │
//!                                     │    │ retry    ▼            ▼         │
//!                                     │ resilience   exec::ProcessRunner     │
//!                                     └──────────────────┬───────────────────┘
//!                                                        ▼
//!                                          report (JUnit XML, metrics textfile)
//! ```
//!
//! # Exit codes
//! - 0: every service started
//! - 2: invalid configuration, arguments or environment
//! - 3: a dependency never became ready
//! - 124 / 127: a command timed out / could not be started
//! - 130: interrupted (reports are still written)
//! - otherwise: the failing command's own exit code

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use readiness_launcher::config::{load_config, LauncherConfig, LogFormat};
use readiness_launcher::error::{LaunchError, EXIT_USAGE};
use readiness_launcher::exec::{Environment, ProcessRunner};
use readiness_launcher::lifecycle::{signals, Launcher};
use readiness_launcher::observability::{logging, metrics};
use readiness_launcher::report;
use readiness_launcher::resilience::{wait_until_ready, RetryPolicy};
use readiness_launcher::service::{plan, ChainError, ServiceChain};

#[derive(Parser)]
#[command(name = "readiness-launcher", version)]
#[command(about = "Bring up dependent services in order, gated on readiness", long_about = None)]
struct Cli {
    /// Launcher configuration file (TOML).
    #[arg(short, long, env = "LAUNCHER_CONFIG")]
    config: PathBuf,

    /// Log level or filter directive; RUST_LOG takes precedence.
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Bring up every service in order
    Run {
        /// Stop after this service
        #[arg(long, value_name = "SERVICE")]
        until: Option<String>,

        /// Override the report directory
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Do not write report files
        #[arg(long)]
        no_report: bool,
    },
    /// Validate configuration and required environment
    Check,
    /// Print what would run, without probing or running anything
    Plan {
        #[arg(long)]
        json: bool,
    },
    /// Wait for a single service to become ready
    Probe {
        service: String,

        /// Try once instead of using the service's retry policy
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("readiness-launcher: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    let format = cli
        .log_format
        .map(LogFormat::from)
        .unwrap_or(config.observability.log_format);
    if let Err(e) = logging::init(&level, format) {
        eprintln!("readiness-launcher: failed to initialize logging: {}", e);
    }

    tracing::debug!(config = %cli.config.display(), "Configuration loaded");

    match execute(cli.command, &config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind(), "readiness-launcher failed");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn execute(command: Commands, config: &LauncherConfig) -> Result<u8, LaunchError> {
    let environment = Environment::capture(&config.environment)?;
    let chain = ServiceChain::from_config(config, &environment)?;

    match command {
        Commands::Check => {
            tracing::info!(services = chain.len(), order = ?chain.names(), "Configuration is valid");
            Ok(0)
        }
        Commands::Plan { json } => {
            let entries = plan(&chain);
            if json {
                match serde_json::to_string_pretty(&entries) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize plan");
                        return Ok(1);
                    }
                }
            } else {
                print!("{}", readiness_launcher::service::plan::render_text(&entries));
            }
            Ok(0)
        }
        Commands::Probe { service, once } => {
            let entry = chain
                .get(&service)
                .ok_or_else(|| ChainError::UnknownService(service.clone()))?;
            let policy = if once { RetryPolicy::once() } else { entry.retry };
            let outcome = wait_until_ready(
                &entry.service.name,
                &entry.service.probe,
                &policy,
                &ProcessRunner,
                &environment,
            )
            .await?;
            println!("{} ready after {} attempt(s)", entry.service.name, outcome.attempts);
            Ok(0)
        }
        Commands::Run {
            until,
            report_dir,
            no_report,
        } => {
            let chain = match until {
                Some(name) => chain.until(&name)?,
                None => chain,
            };
            run(config, chain, environment, report_dir, no_report).await
        }
    }
}

async fn run(
    config: &LauncherConfig,
    chain: ServiceChain,
    environment: Environment,
    report_dir: Option<PathBuf>,
    no_report: bool,
) -> Result<u8, LaunchError> {
    let write_reports = config.report.enabled && !no_report;
    let metrics_handle = if write_reports && config.report.metrics_file.is_some() {
        metrics::install_recorder()
    } else {
        None
    };

    let launcher = Launcher::new(ProcessRunner, environment);
    let report = launcher.launch_until(&chain, signals::terminated()).await;

    if write_reports {
        let directory = report_dir.unwrap_or_else(|| PathBuf::from(&config.report.directory));
        if let Err(e) = report::write_reports(&report, &config.report, &directory, metrics_handle.as_ref()) {
            // A report failure only decides the exit code when the launch itself succeeded.
            if report.is_success() {
                return Err(e);
            }
            tracing::error!(error = %e, "Failed to write reports");
        }
    }

    Ok(report.exit_code())
}
