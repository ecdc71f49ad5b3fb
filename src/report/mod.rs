//! Report artifacts.
//!
//! # Data Flow
//! ```text
//! LaunchReport
//!     → junit.rs (XML, one testcase per service)
//!     → <report dir>/<file_name>
//!     → <report dir>/<metrics_file> (Prometheus textfile, optional)
//! ```

pub mod junit;

use std::path::{Path, PathBuf};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::ReportConfig;
use crate::error::LaunchError;
use crate::lifecycle::LaunchReport;
use crate::observability::metrics;

const SUITE_NAME: &str = "readiness-launcher";

/// Write the JUnit report (and metrics textfile if configured) into `directory`.
///
/// Returns the paths written.
pub fn write_reports(
    report: &LaunchReport,
    config: &ReportConfig,
    directory: &Path,
    metrics_handle: Option<&PrometheusHandle>,
) -> Result<Vec<PathBuf>, LaunchError> {
    std::fs::create_dir_all(directory).map_err(report_error(directory))?;

    let junit_path = directory.join(&config.file_name);
    std::fs::write(&junit_path, junit::render(report, SUITE_NAME)).map_err(report_error(&junit_path))?;
    tracing::info!(path = %junit_path.display(), "Wrote JUnit report");

    let mut written = vec![junit_path];

    if let (Some(file_name), Some(handle)) = (&config.metrics_file, metrics_handle) {
        let metrics_path = directory.join(file_name);
        metrics::write_textfile(handle, &metrics_path).map_err(report_error(&metrics_path))?;
        tracing::info!(path = %metrics_path.display(), "Wrote metrics textfile");
        written.push(metrics_path);
    }

    Ok(written)
}

fn report_error(path: &Path) -> impl FnOnce(std::io::Error) -> LaunchError {
    let path = path.to_path_buf();
    move |source| LaunchError::Report { path, source }
}
