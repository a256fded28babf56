//! Job store contract and the in-memory implementation
//!
//! The engine persists every job mutation through [`JobStore`]. Stores enforce
//! the job state machine: mutating a terminal job is rejected with
//! [`StoreError::State`].

use crate::models::{AlbumRecord, IndexingJob, JobStateError, Termination, Warning};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    /// State-machine violation
    #[error(transparent)]
    State(#[from] JobStateError),

    #[error("storage error: {0}")]
    Storage(#[from] mlx_common::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Storage(mlx_common::Error::Database(err))
    }
}

/// Persistent job records
///
/// `update_progress` is treated as best-effort by callers; every other
/// failure is fatal to the job.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new queued job
    async fn create(&self, job: &IndexingJob) -> Result<(), StoreError>;

    /// queued → active
    async fn mark_active(&self, job_id: Uuid) -> Result<IndexingJob, StoreError>;

    async fn update_progress(&self, job_id: Uuid, percentage: u8) -> Result<(), StoreError>;

    async fn append_warning(&self, job_id: Uuid, warning: &Warning) -> Result<(), StoreError>;

    async fn record_album(&self, job_id: Uuid, album: &AlbumRecord) -> Result<(), StoreError>;

    /// active → completed | failed; returns the terminal snapshot
    async fn finalize(
        &self,
        job_id: Uuid,
        termination: Termination,
    ) -> Result<IndexingJob, StoreError>;

    async fn load(&self, job_id: Uuid) -> Result<Option<IndexingJob>, StoreError>;

    /// All jobs, newest first
    async fn list(&self) -> Result<Vec<IndexingJob>, StoreError>;

    /// Album records of a job, in folder order
    async fn albums(&self, job_id: Uuid) -> Result<Vec<AlbumRecord>, StoreError>;
}

#[derive(Debug)]
struct StoredJob {
    job: IndexingJob,
    albums: Vec<AlbumRecord>,
}

/// Process-local store (CLI scans and tests)
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, StoredJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_job<T>(
        &self,
        job_id: Uuid,
        f: impl FnOnce(&mut StoredJob) -> Result<T, JobStateError>,
    ) -> Result<T, StoreError> {
        let mut jobs = self.jobs.write().await;
        let stored = jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
        Ok(f(stored)?)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &IndexingJob) -> Result<(), StoreError> {
        self.jobs.write().await.insert(
            job.job_id,
            StoredJob {
                job: job.clone(),
                albums: Vec::new(),
            },
        );
        Ok(())
    }

    async fn mark_active(&self, job_id: Uuid) -> Result<IndexingJob, StoreError> {
        self.with_job(job_id, |s| {
            s.job.activate()?;
            Ok(s.job.clone())
        })
        .await
    }

    async fn update_progress(&self, job_id: Uuid, percentage: u8) -> Result<(), StoreError> {
        self.with_job(job_id, |s| s.job.update_progress(percentage).map(|_| ()))
            .await
    }

    async fn append_warning(&self, job_id: Uuid, warning: &Warning) -> Result<(), StoreError> {
        self.with_job(job_id, |s| s.job.push_warning(warning.clone()))
            .await
    }

    async fn record_album(&self, job_id: Uuid, album: &AlbumRecord) -> Result<(), StoreError> {
        self.with_job(job_id, |s| {
            s.job.ensure_running()?;
            s.albums.push(album.clone());
            Ok(())
        })
        .await
    }

    async fn finalize(
        &self,
        job_id: Uuid,
        termination: Termination,
    ) -> Result<IndexingJob, StoreError> {
        self.with_job(job_id, |s| {
            s.job.finalize(termination)?;
            Ok(s.job.clone())
        })
        .await
    }

    async fn load(&self, job_id: Uuid) -> Result<Option<IndexingJob>, StoreError> {
        Ok(self.jobs.read().await.get(&job_id).map(|s| s.job.clone()))
    }

    async fn list(&self) -> Result<Vec<IndexingJob>, StoreError> {
        let mut jobs: Vec<IndexingJob> =
            self.jobs.read().await.values().map(|s| s.job.clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn albums(&self, job_id: Uuid) -> Result<Vec<AlbumRecord>, StoreError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .map(|s| s.albums.clone())
            .ok_or(StoreError::NotFound(job_id))
    }
}
