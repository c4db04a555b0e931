//! Axum router configuration for the TubeSense HTTP API.

use crate::analyze::{self, AppState};
use crate::config::ApiConfig;
use axum::Router;
use tower_http::cors::CorsLayer;

/// Build the API router with the analysis endpoints and health check.
pub fn build_router(state: AppState, config: &ApiConfig) -> Router {
    let mut router = analyze::router(state).route("/health", axum::routing::get(health_check));

    if config.enable_cors {
        router = router.layer(create_cors_layer(config));
    }

    router
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Create CORS layer based on configuration.
fn create_cors_layer(config: &ApiConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_allowed_origins.is_empty() {
        cors = cors.allow_origin(tower_http::cors::Any);
    } else {
        let origins: Vec<_> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        cors = cors.allow_origin(origins);
    }

    cors.allow_methods([
        axum::http::Method::GET,
        axum::http::Method::POST,
        axum::http::Method::DELETE,
        axum::http::Method::OPTIONS,
    ])
    .allow_headers([
        axum::http::header::CONTENT_TYPE,
        axum::http::header::ACCEPT,
    ])
}
