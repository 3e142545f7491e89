//! Test helpers and utilities

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::Value;
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::testing::trace::InMemorySpanExporter;
use opentelemetry_sdk::trace::TracerProvider;
use reqwest::{Client, Response, StatusCode};
use tokio::task::JoinHandle;

use traced_hello::config::{ServerConfig, TracingConfig};
use traced_hello::handler::Handler;
use traced_hello::observability::{trace_config, Metrics, INSTRUMENTATION_NAME};
use traced_hello::server::Server;

/// In-process server bound to ephemeral ports.
pub struct TestServer {
    pub base_url: String,
    pub internal_url: String,
    pub client: Client,
    pub exporter: InMemorySpanExporter,
    pub server: Arc<Server>,
    _provider: TracerProvider,
    tasks: Vec<JoinHandle<()>>,
}

#[allow(dead_code)]
impl TestServer {
    /// Start a server whose spans land in an in-memory exporter.
    pub async fn start() -> Self {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .with_config(trace_config(&TracingConfig::default()))
            .build();
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let handler = Handler::new(provider.tracer(INSTRUMENTATION_NAME))
            .with_metrics(Arc::clone(&metrics));

        let config = ServerConfig {
            listen_addr: loopback(),
            internal_addr: Some(loopback()),
            ..ServerConfig::default()
        };
        let server = Arc::new(Server::new(config, handler, metrics));

        let listener = Server::bind(loopback()).expect("Failed to bind listener");
        let internal = Server::bind(loopback()).expect("Failed to bind internal listener");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let internal_url = format!("http://{}", internal.local_addr().unwrap());

        let accept = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve(listener).await })
        };
        let internal = tokio::spawn(server.serve_internal(internal));

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .no_proxy()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            internal_url,
            client,
            exporter,
            server,
            _provider: provider,
            tasks: vec![accept, internal],
        }
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// Make a GET request with custom headers
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> Response {
        let mut req = self.client.get(format!("{}{}", self.base_url, path));
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        req.send().await.expect("GET request failed")
    }

    /// Make a request to the internal server
    pub async fn internal_get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.internal_url, path))
            .send()
            .await
            .expect("Internal GET request failed")
    }

    /// Spans exported so far.
    pub fn spans(&self) -> Vec<SpanData> {
        self.exporter
            .get_finished_spans()
            .expect("Failed to read exported spans")
    }

    /// The only exported span; fails if there is not exactly one.
    pub fn single_span(&self) -> SpanData {
        let mut spans = self.spans();
        assert_eq!(spans.len(), 1, "expected exactly one span, got {}", spans.len());
        spans.remove(0)
    }

    /// Stop accepting and wait for the accept loops to exit.
    pub async fn shutdown(mut self) {
        self.server.trigger_shutdown();
        for task in self.tasks.drain(..) {
            let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
        }
    }
}

/// String form of a span attribute, if set.
pub fn attr(span: &SpanData, key: &str) -> Option<String> {
    attr_value(span, key).map(|v| v.as_str().into_owned())
}

/// Raw span attribute value, if set.
pub fn attr_value(span: &SpanData, key: &str) -> Option<Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.clone())
}

fn loopback() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

/// Assert that response has expected status
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert that response contains header with prefix
pub fn assert_header_starts_with(response: &Response, name: &str, prefix: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert!(
        value.starts_with(prefix),
        "Header '{}' expected to start with '{}', got '{}'",
        name,
        prefix,
        value
    );
}

/// Header value as string; fails if absent.
pub fn header<'a>(response: &'a Response, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap()
}

/// Assert that the response body is exactly `expected`
pub async fn assert_body_eq(response: Response, expected: &str) {
    let body = response.text().await.expect("Failed to read body");
    assert_eq!(body, expected);
}

/// Assert that response body contains substring
pub async fn assert_body_contains(response: Response, substring: &str) {
    let body = response.text().await.expect("Failed to read body");
    assert!(
        body.contains(substring),
        "Body does not contain '{}'. Body: {}",
        substring,
        &body[..body.len().min(500)]
    );
}
