//! TubeSense web application.
//!
//! Serves the single-page frontend next to the analysis API and provides the
//! startup sequence shared by the `tubesense-web` and `tubesense` binaries.

#![deny(missing_docs, unsafe_code)]

use axum::Router;
use tubesense_api::{build_router, ApiConfig, AppState};

/// Frontend page and static file serving.
pub mod assets;

/// Error types for web operations.
pub mod error;

/// Tracing subscriber setup.
pub mod logging;

/// Startup checks and state assembly.
pub mod startup;

pub use error::{WebError, WebResult};
pub use startup::{build_state, check_requirements, serve, RequirementReport};

/// Merge the API router with the frontend.
pub fn build_app(state: AppState, config: &ApiConfig) -> Router {
    build_router(state, config).merge(assets::frontend_router(&config.static_dir))
}
