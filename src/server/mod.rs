//! HTTP server fronting the traced request handler.
//!
//! This module provides the main [`Server`] type: it accepts TCP connections,
//! serves each one on its own task and hands every request to the
//! [`Handler`](crate::handler::Handler).
//!
//! # Example
//!
//! ```rust,ignore
//! use traced_hello::server::Server;
//!
//! let server = Arc::new(Server::new(config.server, handler, metrics));
//! server.run().await?;
//! ```
//!
//! # Graceful Shutdown
//!
//! ```rust,ignore
//! // Stop accepting new connections
//! server.trigger_shutdown();
//!
//! // Wait for connections to drain (with timeout)
//! server.wait_for_drain(Duration::from_secs(30)).await;
//! ```

pub mod connection;
pub mod internal;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub use crate::config::ServerConfig;
use crate::handler::Handler;
use crate::observability::Metrics;
use connection::ConnectionContext;
use internal::{run_internal_server, InternalState};

/// HTTP server for the traced handler.
pub struct Server {
    config: ServerConfig,
    handler: Handler,
    metrics: Arc<Metrics>,
    /// Active connections counter
    active_connections: Arc<AtomicUsize>,
    started: Instant,
    /// Shutdown signal sender
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver (cloneable)
    shutdown_rx: watch::Receiver<bool>,
    /// Shutdown initiated flag
    shutdown_initiated: AtomicBool,
}

impl Server {
    pub fn new(config: ServerConfig, handler: Handler, metrics: Arc<Metrics>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            handler,
            metrics,
            active_connections: Arc::new(AtomicUsize::new(0)),
            started: Instant::now(),
            shutdown_tx,
            shutdown_rx,
            shutdown_initiated: AtomicBool::new(false),
        }
    }

    /// Get current active connections count.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bind a listening socket with SO_REUSEADDR and a 1024 backlog.
    ///
    /// Must be called within a tokio runtime.
    pub fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
        let domain = if addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(1024)?;

        TcpListener::from_std(socket.into())
    }

    /// Run the server on the configured addresses until shutdown.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = Self::bind(self.config.listen_addr)?;
        info!("Server listening on http://{}", listener.local_addr()?);

        let internal = match self.config.internal_addr {
            Some(addr) => {
                let listener = Self::bind(addr)?;
                info!("Internal server listening on http://{}", listener.local_addr()?);
                Some(tokio::spawn(self.serve_internal(listener)))
            }
            None => None,
        };

        self.serve(listener).await;

        if let Some(handle) = internal {
            let _ = handle.await;
        }

        Ok(())
    }

    /// Accept connections on `listener` until shutdown is triggered.
    pub async fn serve(&self, listener: TcpListener) {
        let ctx = Arc::new(ConnectionContext {
            handler: self.handler.clone(),
            active_connections: Arc::clone(&self.active_connections),
            header_timeout: self.config.header_timeout,
        });
        let mut shutdown_rx = self.shutdown_rx.clone();

        if *shutdown_rx.borrow() {
            return;
        }

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Accept error: {}", e);
                            continue;
                        }
                    };

                    let _ = stream.set_nodelay(true);

                    // Set TCP keepalive
                    let keepalive = TcpKeepalive::new()
                        .with_time(Duration::from_secs(5))
                        .with_interval(Duration::from_secs(1))
                        .with_retries(3);
                    let sock_ref = SockRef::from(&stream);
                    let _ = sock_ref.set_tcp_keepalive(&keepalive);

                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        ctx.handle_connection(stream, remote_addr).await;
                    });
                }
                _ = shutdown_rx.changed() => {
                    debug!("Received shutdown signal, stopping accept loop");
                    break;
                }
            }
        }
    }

    /// Serve `/health` and `/metrics` on `listener` until shutdown is triggered.
    pub fn serve_internal(
        &self,
        listener: TcpListener,
    ) -> impl std::future::Future<Output = ()> + Send + 'static {
        let state = Arc::new(InternalState {
            metrics: Arc::clone(&self.metrics),
            active_connections: Arc::clone(&self.active_connections),
            started: self.started,
        });
        let mut shutdown_rx = self.shutdown_rx.clone();

        async move {
            tokio::select! {
                result = run_internal_server(listener, state) => {
                    if let Err(e) = result {
                        error!("Internal server error: {}", e);
                    }
                }
                _ = shutdown_rx.changed() => {
                    debug!("Internal server received shutdown signal");
                }
            }
        }
    }

    /// Trigger graceful shutdown.
    /// Stops the accept loops; open connections finish their current work.
    pub fn trigger_shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            return; // Already initiated
        }
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured drain timeout.
    pub fn drain_timeout(&self) -> Duration {
        self.config.drain_timeout
    }

    /// Wait for all active connections to drain.
    /// Returns true if drained successfully, false if timeout was reached.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        let check_interval = Duration::from_millis(100);

        loop {
            let active = self.active_connections.load(Ordering::Relaxed);
            if active == 0 {
                return true;
            }

            if start.elapsed() >= timeout {
                warn!("Drain timeout reached with {} active connections", active);
                return false;
            }

            debug!("Waiting for {} connections to drain...", active);
            tokio::time::sleep(check_interval).await;
        }
    }
}
