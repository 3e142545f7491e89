//! Span correlation and the fixed two-route request handler.
//!
//! Every request gets exactly one server span. An inbound `traceparent`
//! makes it a child of the caller's span; a missing or unusable header makes
//! it a trace root. Routing never depends on trace context.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use opentelemetry::trace::{Span as _, SpanKind, Status, Tracer as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::Tracer;
use tracing::debug;

use crate::observability::metrics::TraceparentOutcome;
use crate::observability::tracer::{local_context, remote_parent_context};
use crate::observability::Metrics;
use crate::trace_context::{self, SpanContext, TraceFlags, TRACEPARENT};

/// Name of the span recorded for each request.
pub const SPAN_NAME: &str = "http-request";

/// The only target served with 200.
pub const HELLO_PATH: &str = "/hello";

pub static HELLO_BODY: Bytes = Bytes::from_static(b"Hello, World!");
pub static NOT_FOUND_BODY: Bytes = Bytes::from_static(b"Resource not found");

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Span attribute keys.
pub mod attr {
    pub const HTTP_METHOD: &str = "http.method";
    pub const HTTP_TARGET: &str = "http.target";
    /// Same value as `http.target`, for older collectors.
    pub const HTTP_URL: &str = "http.url";
    pub const HTTP_STATUS_CODE: &str = "http.status_code";
    /// Inbound parent trace id, hex.
    pub const HTTP_TRACE_ID: &str = "http.trace_id";
    /// Inbound parent span id, hex.
    pub const HTTP_SPAN_ID: &str = "http.span_id";
    /// Sampled bit of the inbound parent.
    pub const PARENT_SAMPLED: &str = "http.parent_sampled";
    pub const TRACEPARENT_INVALID: &str = "http.traceparent_invalid";
    pub const TRACEPARENT_ERROR: &str = "http.traceparent_error";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Hello,
    NotFound,
}

impl Route {
    fn resolve(target: &str) -> Self {
        if target == HELLO_PATH {
            Route::Hello
        } else {
            Route::NotFound
        }
    }

    fn status(self) -> StatusCode {
        match self {
            Route::Hello => StatusCode::OK,
            Route::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn body(self) -> Bytes {
        match self {
            Route::Hello => HELLO_BODY.clone(),
            Route::NotFound => NOT_FOUND_BODY.clone(),
        }
    }
}

/// Request handler. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct Handler {
    tracer: Tracer,
    metrics: Option<Arc<Metrics>>,
}

impl Handler {
    /// `tracer` comes from a provider built and owned by the caller.
    pub fn new(tracer: Tracer) -> Self {
        Self {
            tracer,
            metrics: None,
        }
    }

    /// Record request and propagation counters into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Serve one request and return the response with the identity of its
    /// span. The finished span itself goes to the provider's exporter.
    ///
    /// Never fails. Only the method, target and headers of `req` are read.
    pub fn handle<B>(&self, req: &Request<B>) -> (Response<Full<Bytes>>, SpanContext) {
        let started = Instant::now();

        let (parent, outcome, failure) = match trace_context::extract(req.headers()) {
            None => (None, TraceparentOutcome::Absent, None),
            Some(Ok(ctx)) => (Some(ctx), TraceparentOutcome::Valid, None),
            Some(Err(e)) => {
                debug!(error = %e, reason = e.as_str(), "Ignoring unusable traceparent header");
                (None, TraceparentOutcome::Invalid, Some(e))
            }
        };

        let parent_cx = match &parent {
            Some(p) => remote_parent_context(p),
            None => Context::new(),
        };
        // Ended below; an early exit or unwind ends it on drop
        let mut span = self
            .tracer
            .span_builder(SPAN_NAME)
            .with_kind(SpanKind::Server)
            .start_with_context(&self.tracer, &parent_cx);

        let flags = parent.map(|p| p.flags()).unwrap_or(TraceFlags::SAMPLED);
        let context = local_context(span.span_context(), flags);

        if let Some(p) = &parent {
            span.set_attribute(KeyValue::new(attr::HTTP_TRACE_ID, p.trace_id().to_string()));
            span.set_attribute(KeyValue::new(attr::HTTP_SPAN_ID, p.span_id().to_string()));
            span.set_attribute(KeyValue::new(attr::PARENT_SAMPLED, p.is_sampled()));
        }
        if let Some(e) = failure {
            span.set_attribute(KeyValue::new(attr::TRACEPARENT_INVALID, true));
            span.set_attribute(KeyValue::new(attr::TRACEPARENT_ERROR, e.as_str()));
        }

        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| req.uri().path());
        let route = Route::resolve(target);
        let response = build_response(route, &context);

        let status = response.status();
        span.set_attribute(KeyValue::new(attr::HTTP_METHOD, req.method().as_str().to_string()));
        span.set_attribute(KeyValue::new(attr::HTTP_TARGET, target.to_string()));
        span.set_attribute(KeyValue::new(attr::HTTP_URL, target.to_string()));
        span.set_attribute(KeyValue::new(attr::HTTP_STATUS_CODE, i64::from(status.as_u16())));
        span.set_status(if status.is_server_error() {
            Status::error(format!("HTTP {}", status.as_u16()))
        } else {
            Status::Ok
        });
        span.end();

        if let Some(metrics) = &self.metrics {
            metrics.record_traceparent(outcome);
            metrics.record_request(
                req.method().as_str(),
                status.as_u16(),
                started.elapsed().as_secs_f64(),
            );
        }

        (response, context)
    }
}

fn build_response(route: Route, context: &SpanContext) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(route.body()));
    *response.status_mut() = route.status();

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    // Hex and dashes only, always a valid header value
    if let Ok(value) = HeaderValue::from_str(&context.to_traceparent()) {
        headers.insert(TRACEPARENT, value);
    }

    response
}
