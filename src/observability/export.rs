//! Span exporters plugged into the SDK batch processor.
//!
//! [`LogExporter`] writes each finished span as one structured log event.
//! [`MeteredExporter`] wraps any exporter and counts exported and failed
//! spans. Export runs on the batch processor's background task, never on the
//! request path.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use opentelemetry::trace::{SpanId, Status};
use opentelemetry::Value;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::Resource;
use serde_json::json;
use tracing::{info, warn};

use super::metrics::Metrics;
use crate::logging::{self, SPAN_TARGET};

/// Writes each span as one structured log event.
#[derive(Debug, Default, Clone)]
pub struct LogExporter;

impl LogExporter {
    pub fn new() -> Self {
        Self
    }
}

impl SpanExporter for LogExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        for span in &batch {
            info!(
                target: SPAN_TARGET,
                trace_id = %span.span_context.trace_id(),
                span_id = %span.span_context.span_id(),
                name = %span.name,
                record = %span_record(span),
                "span finished"
            );
        }
        Box::pin(std::future::ready(Ok(())))
    }
}

/// Counts spans handed to the inner exporter in Prometheus.
#[derive(Debug)]
pub struct MeteredExporter<E> {
    inner: E,
    metrics: Arc<Metrics>,
}

impl<E> MeteredExporter<E> {
    pub fn new(inner: E, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }
}

impl<E: SpanExporter> SpanExporter for MeteredExporter<E> {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let count = batch.len() as u64;
        let metrics = Arc::clone(&self.metrics);
        let export = self.inner.export(batch);

        Box::pin(async move {
            let result = export.await;
            match &result {
                Ok(()) => metrics.spans_exported_total.inc_by(count),
                Err(e) => {
                    warn!(error = %e, spans = count, "Span export failed");
                    metrics.spans_failed_total.inc_by(count);
                }
            }
            result
        })
    }

    fn shutdown(&mut self) {
        self.inner.shutdown();
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.inner.set_resource(resource);
    }
}

/// JSON rendering of a finished span.
pub fn span_record(span: &SpanData) -> serde_json::Value {
    let attributes: serde_json::Map<String, serde_json::Value> = span
        .attributes
        .iter()
        .map(|kv| (kv.key.as_str().to_string(), attribute_json(&kv.value)))
        .collect();

    let parent = if span.parent_span_id == SpanId::INVALID {
        serde_json::Value::Null
    } else {
        json!(span.parent_span_id.to_string())
    };

    let (status, description) = match &span.status {
        Status::Ok => ("ok", None),
        Status::Error { description } => ("error", Some(description.to_string())),
        _ => ("unset", None),
    };

    let duration = span
        .end_time
        .duration_since(span.start_time)
        .unwrap_or(Duration::ZERO);

    json!({
        "name": span.name,
        "kind": format!("{:?}", span.span_kind).to_lowercase(),
        "trace_id": span.span_context.trace_id().to_string(),
        "span_id": span.span_context.span_id().to_string(),
        "parent_span_id": parent,
        "start": logging::iso8601(span.start_time),
        "end": logging::iso8601(span.end_time),
        "duration_us": duration.as_micros() as u64,
        "status": status,
        "status_description": description,
        "attributes": attributes,
    })
}

fn attribute_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => json!(b),
        Value::I64(i) => json!(i),
        Value::F64(f) => json!(f),
        Value::String(s) => json!(s.as_str()),
        other => json!(other.to_string()),
    }
}
