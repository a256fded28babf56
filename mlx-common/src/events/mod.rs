//! Event types for the MLX event system
//!
//! Provides the indexing event definitions and the broadcast EventBus.

mod indexing_types;

pub use indexing_types::{JobStatus, Warning};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Indexing events
///
/// Broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IndexingEvent {
    /// Job picked up for execution (queued → active)
    JobStarted {
        job_id: Uuid,
        library_root: String,
        timestamp: DateTime<Utc>,
    },

    /// Folder finished; progress recomputed
    ProgressUpdated {
        job_id: Uuid,
        /// Percentage 0-100
        progress: u8,
        folders_processed: usize,
        total_folders: usize,
        timestamp: DateTime<Utc>,
    },

    /// Warning appended to the job
    WarningRaised {
        job_id: Uuid,
        warning: Warning,
        timestamp: DateTime<Utc>,
    },

    /// Album folder catalogued
    AlbumIndexed {
        job_id: Uuid,
        folder_path: String,
        track_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Job reached `completed`
    JobCompleted {
        job_id: Uuid,
        warning_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Job reached `failed`
    JobFailed {
        job_id: Uuid,
        error: String,
        warning_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl IndexingEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            IndexingEvent::JobStarted { .. } => "JobStarted",
            IndexingEvent::ProgressUpdated { .. } => "ProgressUpdated",
            IndexingEvent::WarningRaised { .. } => "WarningRaised",
            IndexingEvent::AlbumIndexed { .. } => "AlbumIndexed",
            IndexingEvent::JobCompleted { .. } => "JobCompleted",
            IndexingEvent::JobFailed { .. } => "JobFailed",
        }
    }

    pub fn job_id(&self) -> Uuid {
        match self {
            IndexingEvent::JobStarted { job_id, .. }
            | IndexingEvent::ProgressUpdated { job_id, .. }
            | IndexingEvent::WarningRaised { job_id, .. }
            | IndexingEvent::AlbumIndexed { job_id, .. }
            | IndexingEvent::JobCompleted { job_id, .. }
            | IndexingEvent::JobFailed { job_id, .. } => *job_id,
        }
    }
}

/// Broadcast bus for indexing events
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IndexingEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lag and lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<IndexingEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: IndexingEvent,
    ) -> Result<usize, broadcast::error::SendError<IndexingEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IndexingEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
