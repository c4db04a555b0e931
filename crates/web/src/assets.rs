//! Frontend page and static file serving.

use axum::{
    http::{StatusCode, Uri},
    response::Html,
    routing::get,
    Router,
};
use std::path::Path;
use tower_http::services::ServeDir;
use tracing::debug;

/// The single-page frontend, embedded at compile time.
pub const INDEX_HTML: &str = include_str!("../frontend/index.html");

/// Router serving `GET /` and, when `static_dir` exists, `/static/*`.
pub fn frontend_router(static_dir: &Path) -> Router {
    let mut router = Router::new().route("/", get(index));

    if static_dir.is_dir() {
        router = router.nest_service("/static", ServeDir::new(static_dir));
    } else {
        debug!(
            "Static directory {} not found, /static disabled",
            static_dir.display()
        );
    }

    router.fallback(handle_404)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn handle_404(uri: Uri) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!("No route for {}", uri.path()),
    )
}
