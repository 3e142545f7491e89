//! Per-connection HTTP service.
//!
//! Each accepted socket is served by hyper-util's auto builder (HTTP/1.1 and
//! HTTP/2). Connection-level failures are logged here and never reach the
//! handler.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming as IncomingBody;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::handler::Handler;
use crate::logging::ACCESS_TARGET;

/// Connection handler context, shared by all connections of one listener.
pub struct ConnectionContext {
    pub handler: Handler,
    pub active_connections: Arc<AtomicUsize>,
    /// Header read timeout (HEADER_TIMEOUT_SECS, default: 5s).
    pub header_timeout: Duration,
}

impl ConnectionContext {
    /// Serve one TCP connection until the peer closes it.
    pub async fn handle_connection(self: Arc<Self>, stream: TcpStream, remote_addr: SocketAddr) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        let ctx = Arc::clone(&self);
        let service = service_fn(move |req| {
            let ctx = Arc::clone(&ctx);
            async move { ctx.handle_request(req, remote_addr) }
        });

        let io = TokioIo::new(stream);
        if let Err(err) = auto::Builder::new(TokioExecutor::new())
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(Some(self.header_timeout))
            .keep_alive(true)
            .http2()
            .max_concurrent_streams(250)
            .serve_connection(io, service)
            .await
        {
            let err_str = format!("{:?}", err);
            if is_connection_error(&err_str) {
                debug!(peer = %remote_addr, "Connection closed: {}", err_str);
            } else {
                debug!(peer = %remote_addr, "Connection error: {:?}", err);
            }
        }

        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn handle_request(
        &self,
        req: Request<IncomingBody>,
        remote_addr: SocketAddr,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let start = Instant::now();
        let (response, context) = self.handler.handle(&req);
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        info!(
            target: ACCESS_TARGET,
            method = %req.method(),
            path = req.uri().path(),
            query = req.uri().query().unwrap_or(""),
            http = ?req.version(),
            status = response.status().as_u16() as u64,
            duration_ms,
            ip = %remote_addr.ip(),
            trace_id = %context.trace_id(),
            span_id = %context.span_id(),
            sampled = context.is_sampled(),
            ""
        );

        Ok(response)
    }
}

/// Peer resets, timeouts and broken pipes are routine and logged quietly.
pub fn is_connection_error(err_str: &str) -> bool {
    err_str.contains("connection reset")
        || err_str.contains("broken pipe")
        || err_str.contains("Connection reset")
        || err_str.contains("os error 104")
        || err_str.contains("os error 32")
        || err_str.contains("timed out")
        || err_str.contains("deadline has elapsed")
        || err_str.contains("HeaderTimeout") // Slowloris protection timeout
}
