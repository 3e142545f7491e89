//! Prometheus metrics for traced_hello.
//!
//! Request rate and latency, plus the health of trace propagation and span
//! export.

use std::fmt;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::warn;

/// Outcome of looking for an inbound `traceparent` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceparentOutcome {
    Absent,
    Valid,
    Invalid,
}

impl TraceparentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceparentOutcome::Absent => "absent",
            TraceparentOutcome::Valid => "valid",
            TraceparentOutcome::Invalid => "invalid",
        }
    }
}

/// Prometheus registry with all application metrics.
pub struct Metrics {
    registry: Registry,

    /// Total HTTP requests by method, status
    pub http_requests_total: IntCounterVec,

    /// Time spent preparing a response, in seconds
    pub http_request_duration_seconds: Histogram,

    /// Inbound traceparent headers by outcome
    pub traceparent_total: IntCounterVec,

    /// Spans accepted by the exporter
    pub spans_exported_total: IntCounter,

    /// Spans whose export failed or timed out
    pub spans_failed_total: IntCounter,
}

impl Metrics {
    /// Create a new registry with all metrics registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Response preparation is in-memory, so buckets start in microseconds
        let latency_buckets = vec![
            0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
        ];

        let http_requests_total = IntCounterVec::new(
            Opts::new("traced_hello_http_requests_total", "Total HTTP requests"),
            &["method", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "traced_hello_http_request_duration_seconds",
                "Response preparation time in seconds",
            )
            .buckets(latency_buckets),
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        let traceparent_total = IntCounterVec::new(
            Opts::new(
                "traced_hello_traceparent_total",
                "Inbound traceparent headers by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(traceparent_total.clone()))?;

        let spans_exported_total = IntCounter::new(
            "traced_hello_spans_exported_total",
            "Spans successfully exported",
        )?;
        registry.register(Box::new(spans_exported_total.clone()))?;

        let spans_failed_total = IntCounter::new(
            "traced_hello_spans_failed_total",
            "Spans whose export failed or timed out",
        )?;
        registry.register(Box::new(spans_failed_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            traceparent_total,
            spans_exported_total,
            spans_failed_total,
        })
    }

    /// Record one handled request.
    pub fn record_request(&self, method: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, &status])
            .inc();
        self.http_request_duration_seconds.observe(duration_secs);
    }

    pub fn record_traceparent(&self, outcome: TraceparentOutcome) {
        self.traceparent_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Export all metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
