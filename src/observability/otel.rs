//! OTLP/gRPC span exporter.
//!
//! # Configuration
//!
//! - `OTEL_ENABLED`: send spans to the collector instead of the log
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` / `OTLP_ENDPOINT`: collector endpoint
//!   (default: `http://localhost:4317`)
//! - `OTEL_EXPORT_TIMEOUT`: per-export timeout (default: `10s`)

use opentelemetry_otlp::WithExportConfig;

use crate::config::TracingConfig;

/// Build the tonic OTLP exporter for `config.endpoint`.
pub fn otlp_exporter(
    config: &TracingConfig,
) -> Result<opentelemetry_otlp::SpanExporter, Box<dyn std::error::Error + Send + Sync>> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.endpoint)
        .with_timeout(config.export_timeout)
        .build()?;
    Ok(exporter)
}
