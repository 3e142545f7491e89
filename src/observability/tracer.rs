//! Explicitly constructed tracer provider.
//!
//! The provider is built once at startup and its tracer handed to the
//! request handler. Nothing is registered with `opentelemetry::global`.
//!
//! Every request span is recorded and exported (`Sampler::AlwaysOn`). The
//! caller's sampled flag is still carried in the outbound `traceparent`.

use std::sync::Arc;

use opentelemetry::trace::{
    SpanContext as OtelSpanContext, SpanId as OtelSpanId, TraceContextExt,
    TraceFlags as OtelTraceFlags, TraceId as OtelTraceId, TraceState,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::export::trace::SpanExporter;
use opentelemetry_sdk::trace::{BatchSpanProcessor, Config, Sampler, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing::{info, warn};

use super::export::{LogExporter, MeteredExporter};
use super::metrics::Metrics;
use crate::config::TracingConfig;
use crate::trace_context::{ParsedParentContext, SpanContext, SpanId, TraceFlags, TraceId};

/// Instrumentation scope name of the request tracer.
pub const INSTRUMENTATION_NAME: &str = "traced_hello";

/// Build the provider selected by `config`.
///
/// With `OTEL_ENABLED=true` and the `otel` feature, spans go to the OTLP
/// collector. Otherwise they are batched into the structured log.
/// Must be called within a tokio runtime.
pub fn tracer_provider(
    config: &TracingConfig,
    metrics: Arc<Metrics>,
) -> Result<TracerProvider, Box<dyn std::error::Error + Send + Sync>> {
    #[cfg(feature = "otel")]
    if config.enabled {
        let exporter = super::otel::otlp_exporter(config)?;
        info!(
            endpoint = %config.endpoint,
            service = %config.service_name,
            version = %config.service_version,
            "OTLP span export initialized"
        );
        return Ok(batch_provider(config, MeteredExporter::new(exporter, metrics)));
    }

    #[cfg(not(feature = "otel"))]
    if config.enabled {
        warn!("OTEL_ENABLED is set but built without the `otel` feature, logging spans");
    }

    Ok(batch_provider(
        config,
        MeteredExporter::new(LogExporter::new(), metrics),
    ))
}

/// Provider exporting through the SDK batch processor on the tokio runtime.
pub fn batch_provider<E>(config: &TracingConfig, exporter: E) -> TracerProvider
where
    E: SpanExporter + 'static,
{
    let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
        .with_batch_config(config.batch_config())
        .build();

    TracerProvider::builder()
        .with_span_processor(processor)
        .with_config(trace_config(config))
        .build()
}

/// Sampler and resource shared by every provider.
pub fn trace_config(config: &TracingConfig) -> Config {
    Config::default()
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(Resource::new([
            KeyValue::new(SERVICE_NAME, config.service_name.clone()),
            KeyValue::new(SERVICE_VERSION, config.service_version.clone()),
        ]))
}

/// Flush queued spans and stop the exporter.
pub async fn shutdown(provider: TracerProvider) {
    // The SDK blocks the calling thread until its batch task answers
    match tokio::task::spawn_blocking(move || provider.shutdown()).await {
        Ok(Ok(())) => info!("Span export shutdown complete"),
        Ok(Err(e)) => warn!(error = %e, "Span export shutdown failed"),
        Err(e) => warn!(error = %e, "Span export shutdown task failed"),
    }
}

/// Context whose active span is the caller's span from `traceparent`.
pub fn remote_parent_context(parent: &ParsedParentContext) -> Context {
    Context::new().with_remote_span_context(OtelSpanContext::new(
        OtelTraceId::from_bytes(parent.trace_id().to_bytes()),
        OtelSpanId::from_bytes(parent.span_id().to_bytes()),
        OtelTraceFlags::new(parent.flags().to_u8()),
        parent.is_remote(),
        TraceState::default(),
    ))
}

/// Identity of a span started here, carrying `flags` for propagation.
pub fn local_context(span: &OtelSpanContext, flags: TraceFlags) -> SpanContext {
    SpanContext::new_local(
        TraceId::from_bytes(span.trace_id().to_bytes()),
        SpanId::from_bytes(span.span_id().to_bytes()),
        flags,
    )
}
