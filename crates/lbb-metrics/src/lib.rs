use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder. The exposition text is served by
/// the API itself through [`render_metrics`]; later calls return the handle
/// already installed.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    if let Some(existing) = PROMETHEUS_HANDLE.get() {
        return Some(existing);
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);
            info!("prometheus recorder installed");
        }
        Err(err) => {
            warn!(error = %err, "prometheus recorder not installed");
        }
    }
    PROMETHEUS_HANDLE.get()
}

/// Current exposition text, `None` until [`init_metrics`] succeeded.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(PrometheusHandle::render)
}
