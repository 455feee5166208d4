// Telemetry module for structured logging, exporter self-metrics, and tracing

use anyhow::Result;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const SERVICE_NAME: &str = "sftp-exporter";

pub const SCRAPES_TOTAL: &str = "sftp_exporter_scrapes_total";
pub const SCRAPE_DURATION_SECONDS: &str = "sftp_exporter_scrape_duration_seconds";
pub const WALK_ERRORS_TOTAL: &str = "sftp_exporter_walk_errors_total";
pub const CAPACITY_ERRORS_TOTAL: &str = "sftp_exporter_capacity_errors_total";

/// Initialize structured logging with JSON formatting and trace context
///
/// `RUST_LOG` takes precedence over `log_level`. When `tracing_endpoint` is
/// set, spans are also exported over OTLP.
#[tracing::instrument(skip_all)]
pub fn init_logging(log_level: &str, tracing_endpoint: Option<&str>) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(log_level)?,
    };

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    let registry = tracing_subscriber::registry().with(json_layer);

    if let Some(endpoint) = tracing_endpoint {
        let tracer = init_tracer(endpoint)?;
        let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        registry
            .with(telemetry_layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;
    } else {
        registry
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;
    }

    tracing::info!(
        log_level = log_level,
        tracing_endpoint = tracing_endpoint,
        "Structured logging initialized"
    );

    Ok(())
}

/// Filter built from `observability.log_level` directives
fn level_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(log_level)
        .map_err(|e| anyhow::anyhow!("Failed to create env filter from {:?}: {}", log_level, e))
}

/// Initialize OpenTelemetry tracer with OTLP exporter
#[tracing::instrument(skip_all)]
fn init_tracer(endpoint: &str) -> Result<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry_sdk::runtime::Tokio;

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .build_span_exporter()
        .map_err(|e| anyhow::anyhow!("Failed to build span exporter: {}", e))?;

    let tracer_provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(Resource::new(vec![
                    KeyValue::new("service.name", SERVICE_NAME),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])),
        )
        .build();

    global::set_tracer_provider(tracer_provider.clone());
    let tracer = tracer_provider.tracer(SERVICE_NAME);

    tracing::info!(endpoint = endpoint, "OpenTelemetry tracer initialized");

    Ok(tracer)
}

/// Flush remaining spans on shutdown
pub fn shutdown_tracer() {
    global::shutdown_tracer_provider();
}

/// Install the global recorder for exporter self-metrics.
///
/// The returned handle renders them; the `/metrics` handler appends that
/// output to the SFTP gauges.
#[tracing::instrument(skip_all)]
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    describe_counter!(SCRAPES_TOTAL, "Total number of scrapes by result");
    describe_histogram!(
        SCRAPE_DURATION_SECONDS,
        "Duration of a full SFTP collection pass in seconds"
    );
    describe_counter!(
        WALK_ERRORS_TOTAL,
        "Total number of entries skipped because they could not be read"
    );
    describe_counter!(
        CAPACITY_ERRORS_TOTAL,
        "Total number of failed filesystem capacity queries"
    );

    tracing::info!("Exporter self-metrics recorder installed");

    Ok(handle)
}

/// Record one scrape and its duration
#[inline]
pub fn record_scrape(result: &'static str, duration_seconds: f64) {
    counter!(SCRAPES_TOTAL, "result" => result).increment(1);
    histogram!(SCRAPE_DURATION_SECONDS).record(duration_seconds);
}

#[inline]
pub fn record_walk_error() {
    counter!(WALK_ERRORS_TOTAL).increment(1);
}

#[inline]
pub fn record_capacity_error() {
    counter!(CAPACITY_ERRORS_TOTAL).increment(1);
}
