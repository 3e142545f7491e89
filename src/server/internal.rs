//! Internal HTTP server for health and metrics endpoints.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http_body_util::Full;
use hyper::body::Incoming as IncomingBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::debug;

use crate::observability::Metrics;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared state read by the internal endpoints.
pub struct InternalState {
    pub metrics: Arc<Metrics>,
    pub active_connections: Arc<AtomicUsize>,
    pub started: Instant,
}

/// `/health` response body.
#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    active_connections: usize,
}

/// Accept internal connections until the listener fails.
pub async fn run_internal_server(
    listener: TcpListener,
    state: Arc<InternalState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let (stream, _) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<IncomingBody>| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(handle_internal_request(req.uri().path(), &state)) }
            });

            let io = TokioIo::new(stream);
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Internal connection error: {:?}", e);
            }
        });
    }
}

/// Handle internal server requests (/health, /metrics).
fn handle_internal_request(path: &str, state: &InternalState) -> Response<Full<Bytes>> {
    match path {
        "/health" => {
            let body = HealthBody {
                status: "ok",
                version: crate::VERSION,
                uptime_secs: state.started.elapsed().as_secs(),
                active_connections: state.active_connections.load(Ordering::Relaxed),
            };
            let body = serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string());
            respond(StatusCode::OK, "application/json", Bytes::from(body))
        }
        "/metrics" => respond(
            StatusCode::OK,
            PROMETHEUS_CONTENT_TYPE,
            Bytes::from(state.metrics.export()),
        ),
        _ => respond(
            StatusCode::NOT_FOUND,
            "text/plain; charset=utf-8",
            Bytes::from_static(b"Not Found"),
        ),
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
