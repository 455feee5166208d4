use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use prometheus::{Encoder, TextEncoder};

use crate::state::AppState;

/// Prometheus metrics endpoint
///
/// Gathering opens an SFTP session and walks every configured path, so it
/// runs on the blocking pool. Exporter self-metrics are appended after the
/// SFTP gauges.
#[tracing::instrument(skip(state))]
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    let registry = state.registry.clone();
    let families = match tokio::task::spawn_blocking(move || registry.gather()).await {
        Ok(families) => families,
        Err(e) => {
            tracing::error!(error = %e, "Metrics collection task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "metrics collection failed")
                .into_response();
        }
    };

    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut body) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response();
    }
    body.extend_from_slice(state.metrics_handle.render().as_bytes());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        body,
    )
        .into_response()
}
