//! Indexing job persistence
//!
//! Transitions are computed on the in-memory model first, then written with a
//! status guard in the `WHERE` clause so a concurrent writer can never move a
//! terminal job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{AlbumRecord, IndexingJob, JobStatus, Termination, Warning};
use crate::services::job_store::{JobStore, StoreError};
use crate::utils::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};

/// SQLite-backed [`JobStore`]
#[derive(Debug, Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }

    pub fn with_max_lock_wait(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_required(&self, job_id: Uuid) -> Result<IndexingJob, StoreError> {
        self.load(job_id).await?.ok_or(StoreError::NotFound(job_id))
    }

    /// Turn a guarded write that matched no row into the state-machine error
    ///
    /// `apply` replays the transition on the current record; it fails for the
    /// same reason the guarded SQL did.
    async fn rejected<F>(&self, job_id: Uuid, apply: F) -> StoreError
    where
        F: FnOnce(&mut IndexingJob) -> Result<(), crate::models::JobStateError>,
    {
        match self.load_required(job_id).await {
            Ok(mut job) => match apply(&mut job) {
                Err(state) => StoreError::State(state),
                Ok(()) => StoreError::Storage(mlx_common::Error::Internal(format!(
                    "job {} changed concurrently",
                    job_id
                ))),
            },
            Err(e) => e,
        }
    }

    async fn warnings_for(&self, job_id: &str) -> Result<Vec<Warning>, StoreError> {
        let rows = sqlx::query(
            "SELECT payload FROM indexing_warnings WHERE job_id = ? ORDER BY seq ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let payload: String = row.try_get("payload")?;
                Ok(serde_json::from_str(&payload)?)
            })
            .collect()
    }

    async fn job_from_row(&self, row: &SqliteRow) -> Result<IndexingJob, StoreError> {
        let job_id: String = row.try_get("job_id")?;
        let status: String = row.try_get("status")?;
        let progress: i64 = row.try_get("progress")?;

        Ok(IndexingJob {
            job_id: Uuid::parse_str(&job_id).map_err(|e| internal(format!("bad job_id: {}", e)))?,
            library_root: row.try_get("library_root")?,
            status: JobStatus::from_str(&status).map_err(internal)?,
            progress: progress.clamp(0, 100) as u8,
            warnings: self.warnings_for(&job_id).await?,
            error: row.try_get("error")?,
            created_at: parse_time(row.try_get("created_at")?)?,
            started_at: row
                .try_get::<Option<String>, _>("started_at")?
                .map(parse_time)
                .transpose()?,
            completed_at: row
                .try_get::<Option<String>, _>("completed_at")?
                .map(parse_time)
                .transpose()?,
        })
    }
}

fn internal(message: String) -> StoreError {
    StoreError::Storage(mlx_common::Error::Internal(message))
}

fn parse_time(value: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| internal(format!("Failed to parse timestamp {}: {}", value, e)))
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, job: &IndexingJob) -> Result<(), StoreError> {
        let job_id = job.job_id.to_string();
        let status = job.status.as_str();
        let created_at = job.created_at.to_rfc3339();

        retry_on_lock("create_job", self.max_lock_wait_ms, || async {
            sqlx::query(
                r#"
                INSERT INTO indexing_jobs (job_id, library_root, status, progress, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&job_id)
            .bind(&job.library_root)
            .bind(status)
            .bind(i64::from(job.progress))
            .bind(&created_at)
            .execute(&self.pool)
            .await
        })
        .await?;
        Ok(())
    }

    async fn mark_active(&self, job_id: Uuid) -> Result<IndexingJob, StoreError> {
        let mut job = self.load_required(job_id).await?;
        job.activate()?;

        let id = job_id.to_string();
        let started_at = job.started_at.map(|t| t.to_rfc3339());
        let result = retry_on_lock("mark_job_active", self.max_lock_wait_ms, || async {
            sqlx::query(
                r#"
                UPDATE indexing_jobs
                SET status = 'active', progress = 0, started_at = ?
                WHERE job_id = ? AND status = 'queued'
                "#,
            )
            .bind(&started_at)
            .bind(&id)
            .execute(&self.pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.rejected(job_id, |j| j.activate()).await);
        }
        Ok(job)
    }

    async fn update_progress(&self, job_id: Uuid, percentage: u8) -> Result<(), StoreError> {
        let id = job_id.to_string();
        let percentage = i64::from(percentage.min(100));
        let result = retry_on_lock("update_job_progress", self.max_lock_wait_ms, || async {
            sqlx::query(
                r#"
                UPDATE indexing_jobs
                SET progress = MAX(progress, ?)
                WHERE job_id = ? AND status = 'active'
                "#,
            )
            .bind(percentage)
            .bind(&id)
            .execute(&self.pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(self
                .rejected(job_id, |j| j.update_progress(0).map(|_| ()))
                .await);
        }
        Ok(())
    }

    async fn append_warning(&self, job_id: Uuid, warning: &Warning) -> Result<(), StoreError> {
        let id = job_id.to_string();
        let payload = serde_json::to_string(warning)?;

        // Single statement: sequence number and status check are atomic
        let result = retry_on_lock("append_job_warning", self.max_lock_wait_ms, || async {
            sqlx::query(
                r#"
                INSERT INTO indexing_warnings (job_id, seq, payload)
                SELECT ?1,
                       COALESCE((SELECT MAX(seq) + 1 FROM indexing_warnings WHERE job_id = ?1), 0),
                       ?2
                WHERE EXISTS (SELECT 1 FROM indexing_jobs WHERE job_id = ?1 AND status = 'active')
                "#,
            )
            .bind(&id)
            .bind(&payload)
            .execute(&self.pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            let warning = warning.clone();
            return Err(self.rejected(job_id, move |j| j.push_warning(warning)).await);
        }
        Ok(())
    }

    async fn record_album(&self, job_id: Uuid, album: &AlbumRecord) -> Result<(), StoreError> {
        let id = job_id.to_string();
        let payload = serde_json::to_string(album)?;

        let result = retry_on_lock("record_album", self.max_lock_wait_ms, || async {
            sqlx::query(
                r#"
                INSERT INTO indexed_albums (job_id, seq, folder_path, payload)
                SELECT ?1,
                       COALESCE((SELECT MAX(seq) + 1 FROM indexed_albums WHERE job_id = ?1), 0),
                       ?2,
                       ?3
                WHERE EXISTS (SELECT 1 FROM indexing_jobs WHERE job_id = ?1 AND status = 'active')
                "#,
            )
            .bind(&id)
            .bind(&album.folder_path)
            .bind(&payload)
            .execute(&self.pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.rejected(job_id, |j| j.ensure_running()).await);
        }
        Ok(())
    }

    async fn finalize(
        &self,
        job_id: Uuid,
        termination: Termination,
    ) -> Result<IndexingJob, StoreError> {
        let mut job = self.load_required(job_id).await?;
        job.finalize(termination.clone())?;

        let id = job_id.to_string();
        let status = job.status.as_str();
        let completed_at = job.completed_at.map(|t| t.to_rfc3339());
        let result = retry_on_lock("finalize_job", self.max_lock_wait_ms, || async {
            sqlx::query(
                r#"
                UPDATE indexing_jobs
                SET status = ?, progress = ?, error = ?, completed_at = ?
                WHERE job_id = ? AND status = 'active'
                "#,
            )
            .bind(status)
            .bind(i64::from(job.progress))
            .bind(&job.error)
            .bind(&completed_at)
            .bind(&id)
            .execute(&self.pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.rejected(job_id, move |j| j.finalize(termination)).await);
        }
        Ok(job)
    }

    async fn load(&self, job_id: Uuid) -> Result<Option<IndexingJob>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT job_id, library_root, status, progress, error,
                   created_at, started_at, completed_at
            FROM indexing_jobs
            WHERE job_id = ?
            "#,
        )
        .bind(job_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.job_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<IndexingJob>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT job_id, library_root, status, progress, error,
                   created_at, started_at, completed_at
            FROM indexing_jobs
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in &rows {
            jobs.push(self.job_from_row(row).await?);
        }
        Ok(jobs)
    }

    async fn albums(&self, job_id: Uuid) -> Result<Vec<AlbumRecord>, StoreError> {
        self.load_required(job_id).await?;

        let rows = sqlx::query(
            "SELECT payload FROM indexed_albums WHERE job_id = ? ORDER BY seq ASC",
        )
        .bind(job_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let payload: String = row.try_get("payload")?;
                Ok(serde_json::from_str(&payload)?)
            })
            .collect()
    }
}

/// Fail jobs a previous process left queued or active
///
/// Returns the number of jobs marked failed.
pub async fn cleanup_stale_jobs(pool: &SqlitePool) -> Result<u64, StoreError> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE indexing_jobs
        SET status = 'failed', error = 'interrupted by restart', completed_at = ?
        WHERE status IN ('queued', 'active')
        "#,
    )
    .bind(&now)
    .execute(pool)
    .await?;

    let count = result.rows_affected();
    if count > 0 {
        tracing::warn!(count, "Marked interrupted indexing jobs as failed");
    }
    Ok(count)
}
