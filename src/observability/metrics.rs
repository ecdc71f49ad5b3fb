//! Metrics collection and exposition.
//!
//! # Metrics
//! - `launcher_probe_attempts_total` (counter): probe attempts by service, result
//! - `launcher_readiness_wait_seconds` (histogram): time until a service was ready
//! - `launcher_commands_total` (counter): register/start commands by service, phase, outcome
//! - `launcher_launches_total` (counter): pipeline runs by outcome
//!
//! # Design Decisions
//! - The launcher is short-lived, so nothing is scraped; the Prometheus
//!   rendering is written as a textfile next to the JUnit report
//! - Recording without an installed recorder is a no-op

use std::io;
use std::path::Path;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder without an HTTP listener.
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install metrics recorder");
            None
        }
    }
}

/// Render current metrics into a Prometheus textfile.
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, handle.render())
}

pub fn record_probe_attempt(service: &str, ready: bool) {
    let result = if ready { "ready" } else { "not_ready" };
    counter!("launcher_probe_attempts_total", "service" => service.to_string(), "result" => result).increment(1);
}

pub fn record_readiness_wait(service: &str, elapsed: Duration) {
    histogram!("launcher_readiness_wait_seconds", "service" => service.to_string()).record(elapsed.as_secs_f64());
}

pub fn record_command(service: &str, phase: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "launcher_commands_total",
        "service" => service.to_string(),
        "phase" => phase,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_launch(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("launcher_launches_total", "outcome" => outcome).increment(1);
}
