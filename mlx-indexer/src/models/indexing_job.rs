//! Indexing job state machine
//!
//! queued → active → completed | failed
//!
//! Every mutator checks the current state first; a terminal job rejects all changes.

use chrono::{DateTime, Utc};
use mlx_common::events::{JobStatus, Warning};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rejected state-machine operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobStateError {
    /// Job already completed or failed
    #[error("job {job_id} is already {status}; no further changes are accepted")]
    Terminal { job_id: Uuid, status: JobStatus },

    /// Transition not allowed from the current state
    #[error("job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

/// How an active job ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Completed,
    Failed(String),
}

impl Termination {
    pub fn status(&self) -> JobStatus {
        match self {
            Termination::Completed => JobStatus::Completed,
            Termination::Failed(_) => JobStatus::Failed,
        }
    }
}

/// Indexing job record
///
/// Keyed by `job_id`; a snapshot of this struct is what status polls return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingJob {
    pub job_id: Uuid,

    /// Library root the job was triggered for
    pub library_root: String,

    pub status: JobStatus,

    /// Percentage 0-100, non-decreasing while active
    pub progress: u8,

    /// Append-only, in discovery order
    pub warnings: Vec<Warning>,

    /// Fatal error message, only when failed
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,

    pub started_at: Option<DateTime<Utc>>,

    /// Set exactly once, on the terminal transition
    pub completed_at: Option<DateTime<Utc>>,
}

impl IndexingJob {
    /// Create a queued job
    pub fn new(library_root: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            library_root: library_root.into(),
            status: JobStatus::Queued,
            progress: 0,
            warnings: Vec::new(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// queued → active; progress reset to 0
    pub fn activate(&mut self) -> Result<(), JobStateError> {
        if self.status != JobStatus::Queued {
            return Err(self.rejection(JobStatus::Active));
        }
        self.status = JobStatus::Active;
        self.progress = 0;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Raise progress; lower values are ignored so progress never goes backwards
    ///
    /// Returns whether the stored value changed.
    pub fn update_progress(&mut self, percentage: u8) -> Result<bool, JobStateError> {
        self.ensure_active(JobStatus::Active)?;
        let percentage = percentage.min(100);
        if percentage > self.progress {
            self.progress = percentage;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Append a warning (active jobs only)
    pub fn push_warning(&mut self, warning: Warning) -> Result<(), JobStateError> {
        self.ensure_active(JobStatus::Active)?;
        self.warnings.push(warning);
        Ok(())
    }

    /// active → completed | failed
    ///
    /// Completion forces progress to 100; failure keeps the last reported value.
    pub fn finalize(&mut self, termination: Termination) -> Result<(), JobStateError> {
        self.ensure_active(termination.status())?;
        match termination {
            Termination::Completed => {
                self.status = JobStatus::Completed;
                self.progress = 100;
            }
            Termination::Failed(message) => {
                self.status = JobStatus::Failed;
                self.error = Some(if message.trim().is_empty() {
                    "unknown error".to_string()
                } else {
                    message
                });
            }
        }
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Guard for records attached to a running job (album catalog entries)
    pub fn ensure_running(&self) -> Result<(), JobStateError> {
        self.ensure_active(JobStatus::Active)
    }

    fn ensure_active(&self, target: JobStatus) -> Result<(), JobStateError> {
        match self.status {
            JobStatus::Active => Ok(()),
            _ => Err(self.rejection(target)),
        }
    }

    fn rejection(&self, target: JobStatus) -> JobStateError {
        if self.is_terminal() {
            JobStateError::Terminal {
                job_id: self.job_id,
                status: self.status,
            }
        } else {
            JobStateError::InvalidTransition {
                job_id: self.job_id,
                from: self.status,
                to: target,
            }
        }
    }
}
