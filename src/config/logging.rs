//! Logging configuration.

use super::parse::{env_or, Env};
use super::ConfigError;
use crate::logging::{ACCESS_TARGET, SPAN_TARGET};

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable fmt output.
    Text,
}

/// Logging configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log level filter (from LOG_LEVEL or RUST_LOG).
    pub filter: String,
    /// Output format (from LOG_FORMAT).
    pub format: LogFormat,
    /// Service name for structured logging.
    pub service_name: String,
}

impl LoggingConfig {
    /// Load configuration from environment variables.
    ///
    /// Priority: LOG_LEVEL > RUST_LOG > default
    ///
    /// LOG_LEVEL accepts simple values: trace, debug, info, warn, error
    /// RUST_LOG accepts full tracing filter syntax: traced_hello=debug,hyper=warn
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&Env::process())
    }

    pub(crate) fn load(env: &Env) -> Result<Self, ConfigError> {
        let format = match env_or(env, "LOG_FORMAT", "json").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT".into(),
                    message: format!("expected json or text, got '{}'", other),
                })
            }
        };

        Ok(Self {
            filter: Self::resolve_log_filter(env),
            format,
            service_name: env_or(env, "SERVICE_NAME", "traced_hello"),
        })
    }

    /// Resolve log filter from environment.
    ///
    /// Priority: LOG_LEVEL > RUST_LOG > default (info)
    fn resolve_log_filter(env: &Env) -> String {
        // 1. Check LOG_LEVEL first (simple: debug, info, warn, error)
        if let Some(level) = env.var("LOG_LEVEL") {
            let level = level.to_lowercase();
            match level.as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => {
                    // Exported spans and access lines stay on at any level
                    return format!(
                        "traced_hello={},{}=info,{}=info",
                        level, SPAN_TARGET, ACCESS_TARGET
                    );
                }
                _ => {
                    // Logging is not up yet
                    eprintln!(
                        "Warning: Invalid LOG_LEVEL '{}', expected: trace, debug, info, warn, error",
                        level
                    );
                }
            }
        }

        // 2. Check RUST_LOG (full tracing filter syntax)
        if let Some(filter) = env.var("RUST_LOG") {
            return filter;
        }

        // 3. Default
        "traced_hello=info".to_string()
    }
}
