//! Error types for the TubeSense web application.

use thiserror::Error;

/// Main error type for web operations.
#[derive(Error, Debug)]
pub enum WebError {
    /// Startup requirements not met.
    #[error("Startup check failed: {0}")]
    Startup(String),

    /// Logging could not be installed.
    #[error("Logging error: {0}")]
    Logging(String),

    /// API error.
    #[error("API error: {0}")]
    Api(#[from] tubesense_api::ApiError),

    /// Model loading error.
    #[error("Analysis error: {0}")]
    Analysis(#[from] tubesense_analysis::AnalysisError),
}

/// Result alias for web operations.
pub type WebResult<T> = Result<T, WebError>;
