//! HTTP API handlers for mlx-indexer
//!
//! Thin trigger/poll surface over the job controller, plus SSE progress.

pub mod health;
pub mod indexing;
pub mod sse;

pub use health::health_routes;
pub use indexing::indexing_routes;
pub use sse::indexing_event_stream;
