//! Error types for CLI operations.

use thiserror::Error;

/// Main error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// YouTube or HTTP API error.
    #[error("API error: {0}")]
    Api(String),

    /// Model or analysis error.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Validation did not pass.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Command execution error.
    #[error("Command execution error: {0}")]
    Command(String),

    /// Invalid argument error.
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

impl From<tubesense_core::Error> for CliError {
    fn from(error: tubesense_core::Error) -> Self {
        CliError::Config(error.to_string())
    }
}

impl From<tubesense_analysis::AnalysisError> for CliError {
    fn from(error: tubesense_analysis::AnalysisError) -> Self {
        CliError::Analysis(error.to_string())
    }
}

impl From<tubesense_api::YouTubeError> for CliError {
    fn from(error: tubesense_api::YouTubeError) -> Self {
        CliError::Api(error.to_string())
    }
}

impl From<tubesense_web::WebError> for CliError {
    fn from(error: tubesense_web::WebError) -> Self {
        CliError::Command(error.to_string())
    }
}
