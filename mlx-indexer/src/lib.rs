//! mlx-indexer library interface
//!
//! Library indexing engine, its collaborators and the HTTP trigger layer.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use mlx_common::events::EventBus;
use services::JobController;
use std::path::PathBuf;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<JobController>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Used when a start request names no root
    pub default_library_root: Option<PathBuf>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(controller: JobController) -> Self {
        let event_bus = controller.events().clone();
        Self {
            controller: Arc::new(controller),
            event_bus,
            default_library_root: None,
            startup_time: Utc::now(),
        }
    }

    pub fn with_default_library_root(mut self, root: Option<PathBuf>) -> Self {
        self.default_library_root = root;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::indexing_routes())
        .route("/index/events", get(api::indexing_event_stream))
        .merge(api::health_routes())
        .with_state(state)
}
