//! # MLX Common Library
//!
//! Shared code for the music library indexer:
//! - Error type shared by the indexer crates
//! - Configuration loading (TOML file, environment, compiled defaults)
//! - Tracing subscriber bootstrap
//! - Warning vocabulary, job status and the event bus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
