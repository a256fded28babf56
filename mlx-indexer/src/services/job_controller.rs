//! Job controller
//!
//! Creates indexing jobs, drives them through queued → active → terminal and
//! tracks the cancellation token of every running job. Only one job may run
//! per library root at a time.

use crate::models::{AlbumRecord, IndexingJob, IndexingParameters, Termination};
use crate::services::collaborators::{AudioMetadataDecoder, LyricsDecoder, PaletteExtractor};
use crate::services::extraction_adapter::ExtractionAdapter;
use crate::services::job_store::{JobStore, StoreError};
use crate::services::lyrics_decoder::LrcLyricsDecoder;
use crate::services::metadata_extractor::LoftyMetadataDecoder;
use crate::services::palette_extractor::ImagePaletteExtractor;
use crate::services::tree_walker::TreeWalker;
use chrono::Utc;
use mlx_common::events::{EventBus, IndexingEvent};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("library root {library_root} is already being indexed by job {job_id}")]
    AlreadyRunning { library_root: String, job_id: Uuid },

    #[error("job {0} has already finished")]
    AlreadyFinished(Uuid),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
struct ActiveJob {
    library_root: PathBuf,
    token: CancellationToken,
}

/// Cheap to clone; clones share the store, walker and active-job registry
#[derive(Clone)]
pub struct JobController {
    store: Arc<dyn JobStore>,
    walker: Arc<TreeWalker>,
    events: EventBus,
    active: Arc<RwLock<HashMap<Uuid, ActiveJob>>>,
}

impl JobController {
    pub fn new(store: Arc<dyn JobStore>, walker: TreeWalker, events: EventBus) -> Self {
        Self {
            store,
            walker: Arc::new(walker),
            events,
            active: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Controller wired to the lofty, LRC and `image` collaborators
    pub fn with_default_decoders(
        store: Arc<dyn JobStore>,
        params: &IndexingParameters,
        events: EventBus,
    ) -> Self {
        let audio: Arc<dyn AudioMetadataDecoder> = Arc::new(LoftyMetadataDecoder::new());
        let lyrics: Arc<dyn LyricsDecoder> = Arc::new(LrcLyricsDecoder::new());
        let palette: Arc<dyn PaletteExtractor> =
            Arc::new(ImagePaletteExtractor::new(params.palette_size));

        let walker = TreeWalker::new(
            params,
            ExtractionAdapter::new(audio, lyrics, palette),
            events.clone(),
        );
        Self::new(store, walker, events)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Create a queued job and run it in the background
    pub async fn start_indexing_job(&self, library_root: impl AsRef<Path>) -> Result<Uuid, JobError> {
        let (job, token) = self.prepare(library_root.as_ref()).await?;
        let job_id = job.job_id;

        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.execute(job, token).await {
                tracing::error!(job_id = %job_id, error = %e, "Indexing job could not be finalized");
            }
        });

        Ok(job_id)
    }

    /// Create a job and run it to completion on the current task
    ///
    /// Returns the terminal snapshot.
    pub async fn run_indexing_job(
        &self,
        library_root: impl AsRef<Path>,
    ) -> Result<IndexingJob, JobError> {
        let (job, token) = self.prepare(library_root.as_ref()).await?;
        self.execute(job, token).await
    }

    pub async fn get_job_status(&self, job_id: Uuid) -> Result<IndexingJob, JobError> {
        self.store
            .load(job_id)
            .await?
            .ok_or(JobError::NotFound(job_id))
    }

    /// Request cooperative cancellation of a running job
    pub async fn cancel_job(&self, job_id: Uuid) -> Result<(), JobError> {
        if let Some(active) = self.active.read().await.get(&job_id) {
            tracing::info!(job_id = %job_id, "Cancellation requested");
            active.token.cancel();
            return Ok(());
        }

        match self.store.load(job_id).await? {
            Some(_) => Err(JobError::AlreadyFinished(job_id)),
            None => Err(JobError::NotFound(job_id)),
        }
    }

    pub async fn list_jobs(&self) -> Result<Vec<IndexingJob>, JobError> {
        Ok(self.store.list().await?)
    }

    /// Album catalog collected by a job so far
    pub async fn albums(&self, job_id: Uuid) -> Result<Vec<AlbumRecord>, JobError> {
        match self.store.albums(job_id).await {
            Err(StoreError::NotFound(id)) => Err(JobError::NotFound(id)),
            other => Ok(other?),
        }
    }

    /// Jobs queued or walking in this process
    pub async fn active_job_count(&self) -> usize {
        self.active.read().await.len()
    }

    /// Register the root and persist the queued job
    async fn prepare(&self, library_root: &Path) -> Result<(IndexingJob, CancellationToken), JobError> {
        if library_root.as_os_str().is_empty() {
            return Err(JobError::InvalidInput(
                "library root must not be empty".to_string(),
            ));
        }

        let job = IndexingJob::new(library_root.to_string_lossy());
        let token = CancellationToken::new();

        {
            let mut active = self.active.write().await;
            if let Some((running_id, _)) = active
                .iter()
                .find(|(_, a)| a.library_root == library_root)
            {
                return Err(JobError::AlreadyRunning {
                    library_root: library_root.display().to_string(),
                    job_id: *running_id,
                });
            }
            active.insert(
                job.job_id,
                ActiveJob {
                    library_root: library_root.to_path_buf(),
                    token: token.clone(),
                },
            );
        }

        if let Err(e) = self.store.create(&job).await {
            self.active.write().await.remove(&job.job_id);
            return Err(e.into());
        }

        tracing::info!(job_id = %job.job_id, root = %job.library_root, "Indexing job queued");
        Ok((job, token))
    }

    async fn execute(&self, job: IndexingJob, token: CancellationToken) -> Result<IndexingJob, JobError> {
        let job_id = job.job_id;
        let result = self.drive(job, &token).await;
        self.active.write().await.remove(&job_id);
        result
    }

    async fn drive(&self, job: IndexingJob, token: &CancellationToken) -> Result<IndexingJob, JobError> {
        let job_id = job.job_id;
        let root = PathBuf::from(&job.library_root);

        // A queued job cannot be failed directly; `cleanup_stale_jobs` fails it on the next startup
        if let Err(e) = self.store.mark_active(job_id).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to activate indexing job; left queued");
            return Err(e.into());
        }
        self.events.emit_lossy(IndexingEvent::JobStarted {
            job_id,
            library_root: job.library_root.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(job_id = %job_id, root = %root.display(), "Indexing job started");

        let termination = match self.walker.walk(job_id, &root, self.store.as_ref(), token).await {
            Ok(summary) => {
                tracing::info!(
                    job_id = %job_id,
                    folders = summary.folders_processed,
                    warnings = summary.warnings,
                    "Library walk finished"
                );
                Termination::Completed
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Indexing job failed");
                Termination::Failed(e.to_string())
            }
        };

        let finished = match self.store.finalize(job_id, termination.clone()).await {
            Ok(job) => job,
            Err(e) if termination == Termination::Completed => {
                // Completion could not be recorded; try to leave the job failed instead of active
                tracing::error!(job_id = %job_id, error = %e, "Failed to record completion");
                self.store
                    .finalize(
                        job_id,
                        Termination::Failed(format!("failed to record completion: {}", e)),
                    )
                    .await?
            }
            Err(e) => return Err(e.into()),
        };

        let event = match &finished.error {
            None => IndexingEvent::JobCompleted {
                job_id,
                warning_count: finished.warnings.len(),
                timestamp: Utc::now(),
            },
            Some(error) => IndexingEvent::JobFailed {
                job_id,
                error: error.clone(),
                warning_count: finished.warnings.len(),
                timestamp: Utc::now(),
            },
        };
        self.events.emit_lossy(event);

        tracing::info!(
            job_id = %job_id,
            status = %finished.status,
            progress = finished.progress,
            warnings = finished.warnings.len(),
            "Indexing job finalized"
        );
        Ok(finished)
    }
}
