//! Basic HTTP tests: routing, bodies, headers.

use crate::helpers::*;
use reqwest::StatusCode;

/// Test GET /hello
#[tokio::test]
async fn test_get_hello() {
    let server = TestServer::start().await;
    let resp = server.get("/hello").await;

    assert_status(&resp, StatusCode::OK);
    assert_header_starts_with(&resp, "content-type", "text/plain");
    assert_body_eq(resp, "Hello, World!").await;

    server.shutdown().await;
}

/// Test 404 for any other target
#[tokio::test]
async fn test_404_not_found() {
    let server = TestServer::start().await;

    for path in ["/", "/missing", "/hello/", "/hello?name=x", "/HELLO"] {
        let resp = server.get(path).await;
        assert_status(&resp, StatusCode::NOT_FOUND);
        assert_body_eq(resp, "Resource not found").await;
    }

    server.shutdown().await;
}

/// Test that non-GET methods route the same way
#[tokio::test]
async fn test_post_hello() {
    let server = TestServer::start().await;
    let resp = server
        .client
        .post(format!("{}/hello", server.base_url))
        .body("ignored")
        .send()
        .await
        .unwrap();

    assert_status(&resp, StatusCode::OK);
    assert_body_eq(resp, "Hello, World!").await;

    let span = server.single_span();
    assert_eq!(attr(&span, "http.method").as_deref(), Some("POST"));

    server.shutdown().await;
}

/// Test that repeated requests on one keep-alive connection are each traced
#[tokio::test]
async fn test_keep_alive_requests() {
    let server = TestServer::start().await;

    for _ in 0..3 {
        let resp = server.get("/hello").await;
        assert_status(&resp, StatusCode::OK);
        assert_body_eq(resp, "Hello, World!").await;
    }

    let spans = server.spans();
    assert_eq!(spans.len(), 3);
    // Each request is its own trace root
    assert_ne!(
        spans[0].span_context.trace_id(),
        spans[1].span_context.trace_id()
    );

    server.shutdown().await;
}

/// Test concurrent requests across connections
#[tokio::test]
async fn test_concurrent_requests() {
    let server = TestServer::start().await;

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let client = server.client.clone();
            let path = if i % 2 == 0 { "/hello" } else { "/other" };
            let url = format!("{}{}", server.base_url, path);
            tokio::spawn(async move { client.get(url).send().await.unwrap().status() })
        })
        .collect();

    let mut ok = 0;
    for task in tasks {
        if task.await.unwrap() == StatusCode::OK {
            ok += 1;
        }
    }

    assert_eq!(ok, 10);
    assert_eq!(server.spans().len(), 20);

    server.shutdown().await;
}
