//! Configuration for the TubeSense HTTP API server.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tubesense_core::constants::{DEFAULT_HTTP_HOST, DEFAULT_HTTP_PORT};
use tubesense_core::TubesenseConfig;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Socket address to bind to.
    pub bind_addr: SocketAddr,

    /// Enable CORS.
    pub enable_cors: bool,

    /// Allowed CORS origins; empty means any origin.
    pub cors_allowed_origins: Vec<String>,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Enable request logging.
    pub enable_request_logging: bool,

    /// Enable response compression.
    pub enable_compression: bool,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Directory served under `/static`.
    pub static_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT)),
            enable_cors: true,
            cors_allowed_origins: Vec::new(),
            request_timeout_seconds: 60,
            enable_request_logging: true,
            enable_compression: true,
            max_body_size: 1024 * 1024,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl ApiConfig {
    /// Create API configuration from core TubeSense configuration.
    pub fn from_core_config(core_config: &TubesenseConfig) -> Self {
        let mut config = Self::default();

        config.bind_addr = core_config
            .bind_address()
            .parse()
            .unwrap_or_else(|_| {
                tracing::warn!(
                    "Invalid bind address {}, falling back to {}:{}",
                    core_config.bind_address(),
                    DEFAULT_HTTP_HOST,
                    core_config.http.port
                );
                SocketAddr::from(([0, 0, 0, 0], core_config.http.port))
            });
        config.enable_cors = core_config.http.enable_cors;
        config.cors_allowed_origins = core_config.http.cors_allowed_origins.clone();
        config.request_timeout_seconds = core_config.http.request_timeout;
        config.enable_request_logging = core_config.http.enable_request_logging;
        config.static_dir = core_config.http.static_dir.clone();

        config
    }
}
