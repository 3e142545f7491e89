//! W3C trace context propagation over real HTTP.

use crate::helpers::*;
use opentelemetry::trace::SpanId;
use opentelemetry::Value;
use reqwest::StatusCode;

const PARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

/// Test that a valid traceparent makes the request span a child of the caller
#[tokio::test]
async fn test_valid_parent_is_continued() {
    let server = TestServer::start().await;
    let resp = server
        .get_with_headers("/hello", &[("traceparent", PARENT)])
        .await;

    assert_status(&resp, StatusCode::OK);
    let outbound = header(&resp, "traceparent").to_string();
    assert_body_eq(resp, "Hello, World!").await;

    let span = server.single_span();
    assert_eq!(span.name, "http-request");
    assert_eq!(
        span.span_context.trace_id().to_string(),
        "4bf92f3577b34da6a3ce929d0e0e4736"
    );
    assert_eq!(span.parent_span_id.to_string(), "00f067aa0ba902b7");
    assert_eq!(
        attr(&span, "http.trace_id").as_deref(),
        Some("4bf92f3577b34da6a3ce929d0e0e4736")
    );
    assert_eq!(attr(&span, "http.span_id").as_deref(), Some("00f067aa0ba902b7"));
    assert_eq!(attr_value(&span, "http.parent_sampled"), Some(Value::Bool(true)));

    // The response names the new span within the same trace
    assert_eq!(
        outbound,
        format!(
            "00-4bf92f3577b34da6a3ce929d0e0e4736-{}-01",
            span.span_context.span_id()
        )
    );

    server.shutdown().await;
}

/// Test that a missing header starts a new root span
#[tokio::test]
async fn test_missing_header_starts_root() {
    let server = TestServer::start().await;
    let resp = server.get("/missing").await;

    assert_status(&resp, StatusCode::NOT_FOUND);
    assert_body_eq(resp, "Resource not found").await;

    let span = server.single_span();
    assert_eq!(span.parent_span_id, SpanId::INVALID);
    assert_eq!(attr_value(&span, "http.status_code"), Some(Value::I64(404)));
    assert_eq!(attr(&span, "http.target").as_deref(), Some("/missing"));
    assert_eq!(attr(&span, "http.url").as_deref(), Some("/missing"));
    assert!(attr(&span, "http.trace_id").is_none());
    assert!(attr(&span, "http.span_id").is_none());

    server.shutdown().await;
}

/// Test that an unusable header degrades to a root span without failing the request
#[tokio::test]
async fn test_garbage_header_is_flagged() {
    let server = TestServer::start().await;
    let resp = server
        .get_with_headers("/hello", &[("traceparent", "garbage")])
        .await;

    assert_status(&resp, StatusCode::OK);
    assert_body_eq(resp, "Hello, World!").await;

    let span = server.single_span();
    assert_eq!(span.parent_span_id, SpanId::INVALID);
    assert_eq!(
        attr_value(&span, "http.traceparent_invalid"),
        Some(Value::Bool(true))
    );
    assert_eq!(
        attr(&span, "http.traceparent_error").as_deref(),
        Some("malformed_header")
    );

    server.shutdown().await;
}

/// Test each failure class is reported by reason
#[tokio::test]
async fn test_failure_reasons() {
    let server = TestServer::start().await;
    let cases = [
        ("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7", "malformed_header"),
        ("00-4bf92f3577b34da6a3ce929d0e0e473z-00f067aa0ba902b7-01", "invalid_hex"),
        ("ff-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01", "unsupported_version"),
        ("00-00000000000000000000000000000000-00f067aa0ba902b7-01", "zero_id"),
    ];

    for (value, reason) in cases {
        server.exporter.reset();
        let resp = server
            .get_with_headers("/hello", &[("traceparent", value)])
            .await;
        assert_status(&resp, StatusCode::OK);

        let span = server.single_span();
        assert_eq!(
            span.parent_span_id,
            SpanId::INVALID,
            "{} should yield a root span",
            value
        );
        assert_eq!(
            attr(&span, "http.traceparent_error").as_deref(),
            Some(reason),
            "header {}",
            value
        );
    }

    server.shutdown().await;
}

/// Test that an unsampled parent is still exported, with its flag propagated
#[tokio::test]
async fn test_unsampled_parent_exported() {
    let server = TestServer::start().await;
    let resp = server
        .get_with_headers(
            "/hello",
            &[("traceparent", "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00")],
        )
        .await;

    assert_status(&resp, StatusCode::OK);
    let outbound = header(&resp, "traceparent");
    assert!(outbound.ends_with("-00"));

    let span = server.single_span();
    assert_eq!(span.parent_span_id.to_string(), "00f067aa0ba902b7");
    assert_eq!(
        attr_value(&span, "http.parent_sampled"),
        Some(Value::Bool(false))
    );

    server.shutdown().await;
}
