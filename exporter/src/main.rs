use anyhow::Result;
use prometheus::Registry;
use std::net::SocketAddr;

mod handlers;
mod routes;
mod state;

use common::collector::SftpCollector;
use common::config::Settings;
use common::sftp::{CredentialSource, KeyMaterial, SshSessionFactory};
use common::telemetry;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Settings::load()?;
    config.validate()?;

    telemetry::init_logging(
        &config.observability.log_level,
        config.observability.tracing_endpoint.as_deref(),
    )?;
    tracing::info!(
        host = %config.sftp.host,
        port = %config.sftp.port,
        paths = ?config.sftp.paths,
        "Configuration loaded"
    );

    // Fail at start-up rather than on every scrape when credentials are unusable
    KeyMaterial::resolve(&CredentialSource::from(&config.sftp))?;

    let metrics_handle = telemetry::init_metrics()?;

    let collector = SftpCollector::new(
        Box::new(SshSessionFactory::new(config.sftp.clone())),
        config.sftp.paths.clone(),
    )?;
    let registry = Registry::new();
    registry.register(Box::new(collector))?;

    let app = routes::create_router(AppState::new(registry, metrics_handle));

    let addr = SocketAddr::from((
        config.server.bind_address.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    tracing::info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("SFTP exporter stopped");
    telemetry::shutdown_tracer();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Initiating graceful shutdown");
}
