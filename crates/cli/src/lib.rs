//! Command-line interface for TubeSense.
//!
//! This crate provides the `tubesense` binary: serving the web app, running
//! one-off analyses, managing model versions and validating models.

#![deny(missing_docs, unsafe_code)]

/// CLI command definitions and parsing.
pub mod commands;

/// CLI application entry point and configuration.
pub mod app;

/// Error types for CLI operations.
pub mod error;
