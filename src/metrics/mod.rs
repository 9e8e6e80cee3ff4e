//! Stage metrics for the ETL pipeline
//!
//! Each stage owns a metrics struct in `stages`, and run-level outcomes live in
//! `run`. Counters are named `movie_etl_<phase>_<name>_total`. A process-wide
//! Prometheus recorder renders the current values as text, which the CLI
//! writes next to the output tables after a run.

/// Build a metric name for a pipeline phase
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("movie_etl_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("movie_etl_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

pub mod run;
pub mod stages;

pub use run::RunMetrics;
pub use stages::{CleanMetrics, NormalizeMetrics, RatingsMetrics, ReconcileMetrics};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

use crate::error::Result;

pub const SNAPSHOT_FILE: &str = "metrics.prom";

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Pre-registration so every metric shows up in a snapshot before first use
pub trait PhaseMetrics {
    fn register_metrics();
}

/// Install the global recorder and register every phase's metrics. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = HANDLE.set(handle);
            NormalizeMetrics::register_metrics();
            CleanMetrics::register_metrics();
            ReconcileMetrics::register_metrics();
            RatingsMetrics::register_metrics();
            RunMetrics::register_metrics();
            info!("Metrics recorder installed");
        }
        Err(e) => warn!("Failed to install metrics recorder: {}", e),
    });
}

/// Prometheus text for the current values, if the recorder is installed
pub fn render() -> Option<String> {
    HANDLE.get().map(PrometheusHandle::render)
}

/// Write the current snapshot to `dir/metrics.prom`
pub fn write_snapshot(dir: &Path) -> Result<Option<PathBuf>> {
    let Some(text) = render() else {
        return Ok(None);
    };
    let path = dir.join(SNAPSHOT_FILE);
    fs::write(&path, text)?;
    info!(path = %path.display(), "wrote metrics snapshot");
    Ok(Some(path))
}

/// Run `f` against a private recorder and return what it rendered
#[cfg(test)]
pub(crate) fn capture<F: FnOnce()>(f: F) -> String {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    ::metrics::with_local_recorder(&recorder, f);
    handle.render()
}
