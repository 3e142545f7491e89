use std::sync::Arc;

use opentelemetry::trace::TracerProvider as _;
use tracing::{error, info, warn};

use traced_hello::config::Config;
use traced_hello::handler::Handler;
use traced_hello::observability::{self, Metrics, INSTRUMENTATION_NAME};
use traced_hello::server::Server;
use traced_hello::{logging, VERSION};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    logging::init(&config.logging)?;

    info!("Starting traced_hello {}", VERSION);
    config.log_summary();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.worker_count())
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let metrics = Arc::new(Metrics::new()?);
    let provider = observability::tracer_provider(&config.tracing, Arc::clone(&metrics))?;
    let handler =
        Handler::new(provider.tracer(INSTRUMENTATION_NAME)).with_metrics(Arc::clone(&metrics));

    let server = Arc::new(Server::new(config.server.clone(), handler, metrics));

    let mut run = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.run().await })
    };

    let mut failure: Option<Box<dyn std::error::Error + Send + Sync>> = None;

    // Handle shutdown gracefully
    tokio::select! {
        result = &mut run => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Server error: {}", e);
                    failure = Some(e);
                }
                Err(e) => {
                    error!("Server task failed: {}", e);
                    failure = Some(e.into());
                }
            }
        }
        _ = shutdown_signal() => {
            info!("Shutting down...");
        }
    }

    server.trigger_shutdown();
    if !server.wait_for_drain(server.drain_timeout()).await {
        warn!("Closing with {} connections still open", server.active_connections());
    }

    // Flush spans still queued for export
    observability::shutdown(provider).await;
    info!("Shutdown complete");

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
