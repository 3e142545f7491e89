//! traced_hello - a minimal HTTP endpoint instrumented with distributed tracing.
//!
//! Every request continues the caller's trace when it carries a valid W3C
//! `traceparent` header, or starts a new trace otherwise. The request span is
//! annotated with request and response metadata and exported asynchronously,
//! off the request path.
//!
//! # Architecture
//!
//! - [`trace_context`] - pure `traceparent` parser
//! - [`handler`] - span correlation and the fixed `/hello` route
//! - [`observability`] - tracer provider, span export, Prometheus metrics
//! - [`server`] - tokio/hyper accept loop and internal endpoints
//!
//! # Example
//!
//! ```rust,ignore
//! use opentelemetry::trace::TracerProvider as _;
//! use opentelemetry_sdk::trace::TracerProvider;
//! use traced_hello::handler::Handler;
//!
//! let provider = TracerProvider::builder()
//!     .with_simple_exporter(exporter)
//!     .build();
//! let handler = Handler::new(provider.tracer("demo"));
//!
//! let (response, span_context) = handler.handle(&request);
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (8 chars) with optional "-dirty" suffix, empty when unknown
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.1.0 (abc12345)" or "0.1.0 ()" without git
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod config;
pub mod handler;
pub mod logging;
pub mod observability;
pub mod server;
pub mod trace_context;

// Re-exports for convenience
pub use config::Config;
pub use handler::Handler;
pub use server::Server;
