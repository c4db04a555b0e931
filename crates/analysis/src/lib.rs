//! Comment sentiment analysis for TubeSense.
//!
//! This crate provides the text cleaning pipeline, the logistic-regression
//! sentiment model, the model version registry and the pre-deployment
//! model validators.

#![deny(missing_docs, unsafe_code)]

/// Text cleaning and lemmatization.
pub mod nlp;

/// Sentiment model loading, inference and training.
pub mod ml;

/// Model artifact versioning, rollback and integrity checks.
pub mod versioning;

/// Pre-deployment model validation.
pub mod validation;

/// Error types for analysis operations.
pub mod error;

pub use error::{AnalysisError, AnalysisResult};
pub use ml::{ModelInfo, SentimentAnalyzer};
pub use nlp::TextCleaner;
pub use versioning::ModelVersionManager;
