//! Stub collaborators, controller factories and polling helpers

use async_trait::async_trait;
use mlx_common::events::EventBus;
use mlx_indexer::models::{
    AlbumRecord, IndexingJob, IndexingParameters, Palette, PaletteColor, Termination,
    TrackMetadata, Warning,
};
use mlx_indexer::services::{
    AudioMetadataDecoder, DecodeError, ExtractError, ExtractionAdapter, JobController, JobStore,
    LrcLyricsDecoder, MemoryJobStore, PaletteExtractor, StoreError, TreeWalker,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Reads `key=value` track files
///
/// A file whose content starts with `corrupt` fails to decode. `delay_ms=N`
/// sleeps before returning, to stretch out a walk.
#[derive(Debug, Default)]
pub struct StubAudioDecoder;

impl AudioMetadataDecoder for StubAudioDecoder {
    fn decode(&self, path: &Path) -> Result<TrackMetadata, DecodeError> {
        let text = std::fs::read_to_string(path)?;
        if text.starts_with("corrupt") {
            return Err(DecodeError::Read("corrupt header".to_string()));
        }

        let mut metadata = TrackMetadata {
            format: "stub".to_string(),
            ..Default::default()
        };
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let tag = Some(value.to_string());
            match key {
                "album" => metadata.album = tag,
                "title" => metadata.title = tag,
                "artist" => metadata.artist = tag,
                "album_artist" => metadata.album_artist = tag,
                "lyrics" => metadata.embedded_lyrics = tag,
                "delay_ms" => {
                    let ms = value.parse::<u64>().unwrap_or(0);
                    std::thread::sleep(Duration::from_millis(ms));
                }
                _ => {}
            }
        }
        Ok(metadata)
    }
}

/// `unreadable` → `ExtractError::Unreadable`, `garbage` → `ExtractError::Decode`,
/// anything else → a one-color palette
#[derive(Debug, Default)]
pub struct StubPaletteExtractor;

impl PaletteExtractor for StubPaletteExtractor {
    fn extract(&self, image_path: &Path) -> Result<Palette, ExtractError> {
        let text = std::fs::read_to_string(image_path)
            .map_err(|e| ExtractError::Unreadable(e.to_string()))?;
        match text.as_str() {
            "unreadable" => Err(ExtractError::Unreadable("permission denied".to_string())),
            "garbage" => Err(ExtractError::Decode("not an image".to_string())),
            _ => Ok(Palette {
                colors: vec![PaletteColor {
                    hex: "#112233".to_string(),
                    share: 1.0,
                }],
            }),
        }
    }
}

/// Controller over stub decoders (real LRC parser) and the given store
pub fn stub_controller_with(store: Arc<dyn JobStore>, parallelism: usize) -> JobController {
    let params = IndexingParameters {
        parallelism,
        ..Default::default()
    };
    let events = EventBus::new(1000);
    let adapter = ExtractionAdapter::new(
        Arc::new(StubAudioDecoder),
        Arc::new(LrcLyricsDecoder::new()),
        Arc::new(StubPaletteExtractor),
    );
    let walker = TreeWalker::new(&params, adapter, events.clone());
    JobController::new(store, walker, events)
}

pub fn stub_controller(parallelism: usize) -> JobController {
    stub_controller_with(Arc::new(MemoryJobStore::new()), parallelism)
}

/// Poll until the job is terminal (10s limit)
pub async fn wait_for_terminal(controller: &JobController, job_id: Uuid) -> IndexingJob {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let job = controller.get_job_status(job_id).await.unwrap();
            if job.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job did not finish within 10s")
}

/// Poll until no job is registered as running (the registry is cleared just after finalize)
pub async fn wait_until_idle(controller: &JobController) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while controller.active_job_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("controller did not become idle within 10s")
}

/// Store operation a [`FlakyStore`] fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailingOp {
    Activate,
    Progress,
    Warnings,
    Albums,
}

/// Memory store with one operation that always fails
pub struct FlakyStore {
    inner: MemoryJobStore,
    failing: FailingOp,
}

impl FlakyStore {
    pub fn new(failing: FailingOp) -> Self {
        Self {
            inner: MemoryJobStore::new(),
            failing,
        }
    }

    fn check(&self, op: FailingOp) -> Result<(), StoreError> {
        if self.failing == op {
            Err(StoreError::Storage(mlx_common::Error::Internal(
                "disk full".to_string(),
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn create(&self, job: &IndexingJob) -> Result<(), StoreError> {
        self.inner.create(job).await
    }

    async fn mark_active(&self, job_id: Uuid) -> Result<IndexingJob, StoreError> {
        self.check(FailingOp::Activate)?;
        self.inner.mark_active(job_id).await
    }

    async fn update_progress(&self, job_id: Uuid, percentage: u8) -> Result<(), StoreError> {
        self.check(FailingOp::Progress)?;
        self.inner.update_progress(job_id, percentage).await
    }

    async fn append_warning(&self, job_id: Uuid, warning: &Warning) -> Result<(), StoreError> {
        self.check(FailingOp::Warnings)?;
        self.inner.append_warning(job_id, warning).await
    }

    async fn record_album(&self, job_id: Uuid, album: &AlbumRecord) -> Result<(), StoreError> {
        self.check(FailingOp::Albums)?;
        self.inner.record_album(job_id, album).await
    }

    async fn finalize(
        &self,
        job_id: Uuid,
        termination: Termination,
    ) -> Result<IndexingJob, StoreError> {
        self.inner.finalize(job_id, termination).await
    }

    async fn load(&self, job_id: Uuid) -> Result<Option<IndexingJob>, StoreError> {
        self.inner.load(job_id).await
    }

    async fn list(&self) -> Result<Vec<IndexingJob>, StoreError> {
        self.inner.list().await
    }

    async fn albums(&self, job_id: Uuid) -> Result<Vec<AlbumRecord>, StoreError> {
        self.inner.albums(job_id).await
    }
}
