use axum::{http::StatusCode, response::IntoResponse};

/// Liveness endpoint. Never touches the SFTP server.
#[tracing::instrument]
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}
