//! Internal server tests (/health, /metrics)

use crate::helpers::*;
use reqwest::StatusCode;

/// Test /health endpoint returns JSON
#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start().await;
    let resp = server.internal_get("/health").await;

    assert_status(&resp, StatusCode::OK);
    assert_header_starts_with(&resp, "content-type", "application/json");
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["uptime_secs"].is_u64());

    server.shutdown().await;
}

/// Test /metrics reflects served requests and propagation outcomes
#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::start().await;
    server.get("/hello").await;
    server
        .get_with_headers("/nope", &[("traceparent", "garbage")])
        .await;

    let resp = server.internal_get("/metrics").await;
    assert_status(&resp, StatusCode::OK);
    assert_header_starts_with(&resp, "content-type", "text/plain");

    let body = resp.text().await.unwrap();
    assert!(body.contains("traced_hello_http_requests_total{method=\"GET\",status=\"200\"} 1"));
    assert!(body.contains("traced_hello_http_requests_total{method=\"GET\",status=\"404\"} 1"));
    assert!(body.contains("traced_hello_traceparent_total{outcome=\"absent\"} 1"));
    assert!(body.contains("traced_hello_traceparent_total{outcome=\"invalid\"} 1"));

    server.shutdown().await;
}

/// Test unknown internal paths
#[tokio::test]
async fn test_unknown_internal_path() {
    let server = TestServer::start().await;
    let resp = server.internal_get("/config").await;

    assert_status(&resp, StatusCode::NOT_FOUND);
    assert_body_contains(resp, "Not Found").await;

    server.shutdown().await;
}
