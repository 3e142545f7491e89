//! Configuration module for traced_hello.
//!
//! This module provides centralized configuration loading from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use traced_hello::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Listen address: {}", config.server.listen_addr);
//! println!("Collector: {}", config.tracing.endpoint);
//! ```

mod error;
mod logging;
mod parse;
mod server;
mod trace;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use parse::{parse_duration, Env};
pub use server::ServerConfig;
pub use trace::TracingConfig;

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Span export configuration.
    pub tracing: TracingConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&Env::process())
    }

    /// Load configuration from an explicit variable source.
    pub fn load(env: &Env) -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::load(env)?,
            tracing: TracingConfig::load(env)?,
            logging: LoggingConfig::load(env)?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use ::tracing::info;

        info!("Configuration loaded:");
        info!("  Listen: {}", self.server.listen_addr);
        info!("  Workers: {}", self.server.worker_count());
        info!("  Header timeout: {}s", self.server.header_timeout.as_secs());
        info!("  Drain timeout: {}s", self.server.drain_timeout.as_secs());

        if let Some(ref internal) = self.server.internal_addr {
            info!("  Internal server: {}", internal);
        }

        info!(
            "  Service: {} {}",
            self.tracing.service_name, self.tracing.service_version
        );

        if self.tracing.enabled {
            info!("  Span export: OTLP {}", self.tracing.endpoint);
        } else {
            info!("  Span export: log");
        }
        info!(
            "  Span batching: {} per batch, queue {}, every {}ms",
            self.tracing.batch_size,
            self.tracing.max_queue_size,
            self.tracing.scheduled_delay.as_millis()
        );
    }
}
