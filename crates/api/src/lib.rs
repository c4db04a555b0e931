//! HTTP API for TubeSense.
//!
//! Exposes the comment analysis endpoints, stores finished analyses in SQLite
//! and talks to the YouTube Data API.

#![deny(unsafe_code)]

pub mod analyze;
pub mod config;
pub mod database;
pub mod error;
pub mod router;
pub mod server;
pub mod youtube;

pub use analyze::AppState;
pub use config::*;
pub use database::{init_pool, Repository};
pub use error::*;
pub use router::*;
pub use server::*;
pub use youtube::{CommentSource, YouTubeClient, YouTubeError};
