//! Span export configuration.

use std::time::Duration;

use opentelemetry_sdk::trace::{BatchConfig, BatchConfigBuilder};

use super::parse::{env_bool, env_duration, env_opt, env_or, env_parse, Env};
use super::ConfigError;

/// Span export configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Send spans to an OTLP collector instead of the log.
    pub enabled: bool,
    /// Reported as `service.name`.
    pub service_name: String,
    /// Reported as `service.version`.
    pub service_version: String,
    /// OTLP/gRPC collector endpoint.
    pub endpoint: String,
    /// Upper bound for one export call.
    pub export_timeout: Duration,
    /// Spans per export batch.
    pub batch_size: usize,
    /// Pending spans kept before new ones are dropped.
    pub max_queue_size: usize,
    /// Interval between scheduled exports.
    pub scheduled_delay: Duration,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "traced_hello".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            endpoint: "http://localhost:4317".to_string(),
            export_timeout: Duration::from_secs(10),
            batch_size: 512,
            max_queue_size: 2048,
            scheduled_delay: Duration::from_secs(5),
        }
    }
}

impl TracingConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&Env::process())
    }

    pub(crate) fn load(env: &Env) -> Result<Self, ConfigError> {
        let endpoint = env_opt(env, "OTEL_EXPORTER_OTLP_ENDPOINT")
            .or_else(|| env_opt(env, "OTLP_ENDPOINT"))
            .unwrap_or_else(|| "http://localhost:4317".to_string());

        let batch_size: usize = env_parse(env, "OTEL_BATCH_SIZE", 512)?;
        if batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "OTEL_BATCH_SIZE".into(),
                message: "must be greater than 0".into(),
            });
        }

        let max_queue_size: usize = env_parse(env, "OTEL_MAX_QUEUE_SIZE", 2048)?;
        if max_queue_size < batch_size {
            return Err(ConfigError::Invalid {
                key: "OTEL_MAX_QUEUE_SIZE".into(),
                message: format!("must be at least OTEL_BATCH_SIZE ({})", batch_size),
            });
        }

        Ok(Self {
            enabled: env_bool(env, "OTEL_ENABLED", false),
            service_name: env_or(env, "SERVICE_NAME", "traced_hello"),
            service_version: env_or(env, "SERVICE_VERSION", env!("CARGO_PKG_VERSION")),
            endpoint,
            export_timeout: env_duration(env, "OTEL_EXPORT_TIMEOUT", "10s")?,
            batch_size,
            max_queue_size,
            scheduled_delay: env_duration(env, "OTEL_SCHEDULED_DELAY", "5s")?,
        })
    }

    /// Parameters for the SDK batch span processor.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfigBuilder::default()
            .with_max_queue_size(self.max_queue_size)
            .with_max_export_batch_size(self.batch_size)
            .with_scheduled_delay(self.scheduled_delay)
            .with_max_export_timeout(self.export_timeout)
            .build()
    }
}
