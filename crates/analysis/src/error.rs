use thiserror::Error;

/// Errors that can occur during analysis operations.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// NLP processing error.
    #[error("NLP error: {0}")]
    Nlp(String),
    /// Sentiment inference requested without a loaded model.
    #[error("Model not loaded")]
    ModelNotLoaded,
    /// Model loading error.
    #[error("Model loading error: {0}")]
    ModelLoading(String),
    /// Training error.
    #[error("Training error: {0}")]
    Training(String),
    /// Version registry error.
    #[error("Registry error: {0}")]
    Registry(String),
    /// Database operation error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// I/O operation error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),
    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

/// Result type alias for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
