use metrics_exporter_prometheus::PrometheusHandle;
use prometheus::Registry;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Holds the SFTP collector; gathered on every scrape
    pub registry: Arc<Registry>,
    /// Renders the exporter's own metrics
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(registry: Registry, metrics_handle: PrometheusHandle) -> Self {
        Self {
            registry: Arc::new(registry),
            metrics_handle,
        }
    }
}
