//! Tracing and metrics for traced_hello.
//!
//! Request spans come from an `opentelemetry_sdk` tracer provider built
//! explicitly at startup and passed to the handler. Finished spans are
//! batched by the SDK and exported to the structured log or, with the `otel`
//! feature, to an OTLP collector. Prometheus metrics cover requests, trace
//! propagation and span export.
//!
//! # Usage
//!
//! ```rust,ignore
//! use opentelemetry::trace::TracerProvider as _;
//! use traced_hello::observability::{self, Metrics};
//!
//! let metrics = Arc::new(Metrics::new()?);
//! let provider = observability::tracer_provider(&config.tracing, Arc::clone(&metrics))?;
//! let handler = Handler::new(provider.tracer(observability::INSTRUMENTATION_NAME));
//!
//! // ... serve requests ...
//!
//! observability::shutdown(provider).await;
//! ```

pub mod export;
pub mod metrics;
pub mod tracer;

#[cfg(feature = "otel")]
pub mod otel;

// Re-exports
pub use export::{LogExporter, MeteredExporter};
pub use metrics::Metrics;
pub use tracer::{
    batch_provider, shutdown, trace_config, tracer_provider, INSTRUMENTATION_NAME,
};
