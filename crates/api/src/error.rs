//! Error types for the TubeSense HTTP API.

use crate::youtube::YouTubeError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;
use tubesense_analysis::AnalysisError;

/// Main error type for API operations.
#[derive(Error, Debug)]
pub enum ApiError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response or record serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP server error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid request parameters.
    #[error("{0}")]
    InvalidRequest(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Sentiment model is not available.
    #[error("Model not loaded")]
    ModelNotLoaded,

    /// YouTube Data API failure.
    #[error(transparent)]
    YouTube(#[from] YouTubeError),

    /// Sentiment analysis failure.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Result alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Convert to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Http(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::YouTube(e) => match e {
                YouTubeError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                YouTubeError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
                YouTubeError::CommentsDisabled(_) => StatusCode::FORBIDDEN,
                YouTubeError::VideoNotFound(_) => StatusCode::NOT_FOUND,
                YouTubeError::Api { .. } | YouTubeError::Transport(_) => StatusCode::BAD_GATEWAY,
            },
            ApiError::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::Database(error.to_string())
    }
}

impl From<AnalysisError> for ApiError {
    fn from(error: AnalysisError) -> Self {
        match error {
            AnalysisError::ModelNotLoaded => ApiError::ModelNotLoaded,
            other => ApiError::Analysis(other.to_string()),
        }
    }
}

impl From<ApiError> for axum::response::Response {
    fn from(error: ApiError) -> Self {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!("{}", error);
        }
        let body = serde_json::json!({
            "error": error.to_string(),
            "code": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_errors_map_to_distinct_statuses() {
        let cases = [
            (YouTubeError::NotConfigured, StatusCode::SERVICE_UNAVAILABLE),
            (
                YouTubeError::QuotaExceeded("daily".into()),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                YouTubeError::CommentsDisabled("abc".into()),
                StatusCode::FORBIDDEN,
            ),
            (YouTubeError::VideoNotFound("abc".into()), StatusCode::NOT_FOUND),
            (
                YouTubeError::Api {
                    status: 500,
                    message: "backend".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status_code(), status);
        }
    }

    #[test]
    fn serialization_failure_is_server_error() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = ApiError::from(source);
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn model_not_loaded_is_service_unavailable() {
        let error = ApiError::from(AnalysisError::ModelNotLoaded);
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.to_string(), "Model not loaded");
    }
}
