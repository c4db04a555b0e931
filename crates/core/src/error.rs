//! Error types for TubeSense core functionality.

use thiserror::Error;

/// Errors raised while resolving configuration.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing setting.
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("File system error: {0}")]
    FileSystem(String),
    #[error("Data parsing error: {0}")]
    Parse(String),
}

/// Result type for TubeSense operations.
pub type Result<T> = std::result::Result<T, Error>;
