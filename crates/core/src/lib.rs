//! Core types, errors, and configuration for TubeSense.
//!
//! This crate provides the foundational types shared by the analysis engine,
//! the HTTP API and the command-line tools: YouTube video and comment records,
//! sentiment results, and the layered runtime configuration.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::TubesenseConfig;
pub use error::{Error, Result};
pub use types::*;
