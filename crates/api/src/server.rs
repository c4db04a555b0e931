//! HTTP server implementation for the TubeSense API.

use crate::{config::ApiConfig, ApiError};
use axum::Router;
use tokio::signal;
use tracing::info;

/// HTTP server wrapping a fully assembled router.
pub struct ApiServer {
    config: ApiConfig,
    router: Router,
}

impl ApiServer {
    /// Create a server for `router` with the given configuration.
    pub fn new(config: ApiConfig, router: Router) -> Self {
        Self { config, router }
    }

    /// Run the server until shutdown signal.
    pub async fn run(self) -> Result<(), ApiError> {
        let addr = self.config.bind_addr;
        info!("Starting TubeSense server");
        info!("CORS enabled: {}", self.config.enable_cors);

        let router = self.build_router_with_middleware();

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            ApiError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;

        info!("Server listening on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Http(format!("Server error: {}", e)))?;

        info!("Server shutdown complete");
        Ok(())
    }

    /// Build router with all middleware layers.
    fn build_router_with_middleware(&self) -> Router {
        let mut router = self.router.clone();

        if self.config.request_timeout_seconds > 0 {
            router = router.layer(tower_http::timeout::TimeoutLayer::new(
                std::time::Duration::from_secs(self.config.request_timeout_seconds),
            ));
        }

        if self.config.enable_request_logging {
            router = router.layer(tower_http::trace::TraceLayer::new_for_http());
        }

        if self.config.enable_compression {
            router = router.layer(tower_http::compression::CompressionLayer::new());
        }

        router.layer(tower_http::limit::RequestBodyLimitLayer::new(
            self.config.max_body_size,
        ))
    }
}

/// Create a shutdown signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C signal, shutting down...");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
        info!("Received SIGTERM signal, shutting down...");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
