//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use super::parse::{env_opt, env_or, env_parse, Env};
use super::ConfigError;

/// Server configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address (default: 0.0.0.0:8080).
    pub listen_addr: SocketAddr,
    /// Internal server address for /health and /metrics.
    pub internal_addr: Option<SocketAddr>,
    /// Runtime worker threads (0 = number of CPUs).
    pub worker_threads: usize,
    /// Time allowed for a client to send request headers.
    pub header_timeout: Duration,
    /// Graceful shutdown drain timeout.
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            internal_addr: None,
            worker_threads: 0,
            header_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&Env::process())
    }

    pub(crate) fn load(env: &Env) -> Result<Self, ConfigError> {
        let listen_value = env_or(env, "LISTEN_ADDR", "0.0.0.0:8080");
        let listen_addr: SocketAddr = listen_value.parse().map_err(|e| ConfigError::Parse {
            key: "LISTEN_ADDR".into(),
            value: listen_value.clone(),
            error: format!("{}", e),
        })?;

        let internal_addr = env_opt(env, "INTERNAL_ADDR")
            .map(|s| {
                s.parse::<SocketAddr>().map_err(|e| ConfigError::Parse {
                    key: "INTERNAL_ADDR".into(),
                    value: s,
                    error: format!("{}", e),
                })
            })
            .transpose()?;

        let header_timeout_secs: u64 = env_parse(env, "HEADER_TIMEOUT_SECS", 5)?;
        if header_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "HEADER_TIMEOUT_SECS".into(),
                message: "must be greater than 0".into(),
            });
        }

        Ok(Self {
            listen_addr,
            internal_addr,
            worker_threads: env_parse(env, "WORKER_THREADS", 0)?,
            header_timeout: Duration::from_secs(header_timeout_secs),
            drain_timeout: Duration::from_secs(env_parse(env, "DRAIN_TIMEOUT_SECS", 30)?),
        })
    }

    /// Effective number of runtime worker threads.
    pub fn worker_count(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get()
        } else {
            self.worker_threads
        }
    }
}
