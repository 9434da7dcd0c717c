//! Tracing setup: console logging plus optional OpenTelemetry export.
//!
//! Console output goes through a `tracing-subscriber` fmt layer filtered by `RUST_LOG`
//! (default `info`). OTLP export is off unless `enable_otel_export` is set, in which case
//! the exporter is configured from the standard variables:
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` - The OTLP endpoint URL
//! - `OTEL_EXPORTER_OTLP_PROTOCOL` - `http/protobuf` (default) or `http/json`
//! - `OTEL_EXPORTER_OTLP_HEADERS` - Comma-separated key=value pairs; `%20` decodes to a space
//! - `OTEL_SERVICE_NAME` - Service name, default `labteams`
//!
//! ```bash
//! export LABTEAMS_ENABLE_OTEL_EXPORT=true
//! export OTEL_EXPORTER_OTLP_ENDPOINT="https://otlp-gateway.example.com/otlp"
//! export OTEL_EXPORTER_OTLP_HEADERS="Authorization=Basic%20<token>"
//! ```

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Provider kept for shutdown; `tracing-opentelemetry` only holds the tracer.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global subscriber.
///
/// Falls back to console-only logging if the OTLP exporter cannot be built.
pub fn init_telemetry(enable_otel_export: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if !enable_otel_export {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;

        info!("Telemetry initialized (OTLP export disabled)");
        return Ok(());
    }

    match create_otlp_tracer() {
        Ok(tracer) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init()?;

            info!("Telemetry initialized with OTLP export enabled");
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;

            info!("Telemetry initialized without OTLP export: {}", e);
        }
    }

    Ok(())
}

/// Parse `OTEL_EXPORTER_OTLP_HEADERS` style `key=value,key=value` pairs.
fn parse_otlp_headers(raw: &str) -> HashMap<String, String> {
    raw.replace("%20", " ")
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn otlp_protocol(raw: Option<&str>) -> Protocol {
    match raw.unwrap_or("http/protobuf") {
        "http/json" => Protocol::HttpJson,
        _ => Protocol::HttpBinary,
    }
}

fn create_otlp_tracer() -> anyhow::Result<opentelemetry_sdk::trace::Tracer> {
    let service_name = std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "labteams".to_string());
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or_else(|_| "http://localhost:4318".to_string());
    let headers = std::env::var("OTEL_EXPORTER_OTLP_HEADERS")
        .map(|raw| parse_otlp_headers(&raw))
        .unwrap_or_default();
    let protocol = otlp_protocol(std::env::var("OTEL_EXPORTER_OTLP_PROTOCOL").ok().as_deref());

    eprintln!("[OTLP] Service Name: {service_name}, Endpoint: {endpoint}, Custom headers: {}", headers.len());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(&endpoint)
        .with_protocol(protocol)
        .with_headers(headers)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_attribute(KeyValue::new("service.name", service_name.clone()))
                .build(),
        )
        .build();

    let tracer = tracer_provider.tracer(service_name);
    let _ = TRACER_PROVIDER.set(tracer_provider);

    Ok(tracer)
}

/// Flush pending spans. Call before exit.
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        tracing::error!("Failed to shutdown tracer provider: {}", e);
    }
}
