//! Library tree walker
//!
//! Every immediate child directory of the library root is an album folder.
//! Album folders are expected to be flat: nested directories are reported as
//! `SubdirectoriesWarning` and never descended.
//!
//! Folders are processed with bounded parallelism but committed to the job
//! store in lexicographic order, so the warning list is the same at any
//! parallelism.

use crate::models::{
    AlbumRecord, CoverArtRecord, EntryKind, IndexingParameters, LibraryEntry, Lyrics,
    TrackMetadata, TrackRecord, Warning,
};
use crate::services::classifier::FileClassifier;
use crate::services::extraction_adapter::ExtractionAdapter;
use crate::services::folder_validator::{FolderState, FolderValidator};
use crate::services::job_store::{JobStore, StoreError};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use mlx_common::events::{EventBus, IndexingEvent};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use walkdir::WalkDir;

/// Fatal walk errors; each one fails the job
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("library root does not exist: {0}")]
    RootNotFound(String),

    #[error("library root is not a directory: {0}")]
    RootNotADirectory(String),

    #[error("library root is unreadable: {path}: {message}")]
    RootUnreadable { path: String, message: String },

    #[error("job store failure: {0}")]
    Store(#[from] StoreError),

    #[error("cancelled")]
    Cancelled,
}

/// Counters of a finished walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    pub total_folders: usize,
    pub folders_processed: usize,
    pub warnings: usize,
}

/// One directory listing item
#[derive(Debug)]
enum DirItem {
    Entry { name: String, path: PathBuf, is_dir: bool },
    Failed { path: PathBuf, message: String },
}

/// Album folder slot from the root snapshot
#[derive(Debug)]
enum FolderSlot {
    Folder(PathBuf),
    /// Listed in the root but could not be resolved (broken symlink, permissions)
    Unreadable { path: PathBuf, message: String },
}

/// Everything one folder contributes, committed in folder order
#[derive(Debug, Default)]
struct FolderOutcome {
    warnings: Vec<Warning>,
    album: Option<AlbumRecord>,
}

pub struct TreeWalker {
    classifier: FileClassifier,
    extractor: ExtractionAdapter,
    validator: FolderValidator,
    parallelism: usize,
    events: EventBus,
}

impl TreeWalker {
    pub fn new(params: &IndexingParameters, extractor: ExtractionAdapter, events: EventBus) -> Self {
        Self {
            classifier: FileClassifier::new(params),
            extractor,
            validator: FolderValidator::new(),
            parallelism: params.parallelism.max(1),
            events,
        }
    }

    /// Walk `root` for an active job, committing warnings, albums and progress to `store`
    ///
    /// `cancel` is checked between folders; in-flight folders finish but no new
    /// folder is started once it fires.
    pub async fn walk(
        &self,
        job_id: Uuid,
        root: &Path,
        store: &dyn JobStore,
        cancel: &CancellationToken,
    ) -> Result<WalkSummary, WalkError> {
        let slots = self.snapshot_root(root).await?;
        let total = slots.len();
        tracing::info!(job_id = %job_id, root = %root.display(), folders = total, "Walking library");

        let processed = AtomicUsize::new(0);
        let mut last_progress = 0u8;
        let mut warning_count = 0usize;

        // Child token: a commit failure stops new folders without touching the caller's token
        let folder_token = cancel.child_token();

        let mut outcomes = stream::iter(slots)
            .take_while(|_| futures::future::ready(!folder_token.is_cancelled()))
            .map(|slot| {
                let token = folder_token.clone();
                async move {
                    if token.is_cancelled() {
                        None
                    } else {
                        Some(self.process_slot(root, slot).await)
                    }
                }
            })
            .buffered(self.parallelism);

        while let Some(outcome) = outcomes.next().await {
            if cancel.is_cancelled() {
                break;
            }
            let Some(outcome) = outcome else { break };

            if let Err(e) = self
                .commit(job_id, outcome, store, &mut warning_count)
                .await
            {
                folder_token.cancel();
                tracing::error!(job_id = %job_id, error = %e, "Job store rejected folder results");
                return Err(e.into());
            }

            let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
            let progress = ((done * 100) / total) as u8;
            if progress > last_progress {
                last_progress = progress;
                // Best-effort: a dropped progress update never fails the job
                if let Err(e) = store.update_progress(job_id, progress).await {
                    tracing::warn!(job_id = %job_id, progress, error = %e, "Progress update dropped");
                }
                self.events.emit_lossy(IndexingEvent::ProgressUpdated {
                    job_id,
                    progress,
                    folders_processed: done,
                    total_folders: total,
                    timestamp: Utc::now(),
                });
            }
        }

        if cancel.is_cancelled() {
            tracing::info!(
                job_id = %job_id,
                processed = processed.load(Ordering::SeqCst),
                total,
                "Walk cancelled"
            );
            return Err(WalkError::Cancelled);
        }

        Ok(WalkSummary {
            total_folders: total,
            folders_processed: processed.load(Ordering::SeqCst),
            warnings: warning_count,
        })
    }

    async fn commit(
        &self,
        job_id: Uuid,
        outcome: FolderOutcome,
        store: &dyn JobStore,
        warning_count: &mut usize,
    ) -> Result<(), StoreError> {
        for warning in outcome.warnings {
            store.append_warning(job_id, &warning).await?;
            *warning_count += 1;
            self.events.emit_lossy(IndexingEvent::WarningRaised {
                job_id,
                warning,
                timestamp: Utc::now(),
            });
        }

        if let Some(album) = outcome.album {
            store.record_album(job_id, &album).await?;
            self.events.emit_lossy(IndexingEvent::AlbumIndexed {
                job_id,
                folder_path: album.folder_path.clone(),
                track_count: album.tracks.len(),
                timestamp: Utc::now(),
            });
        }
        Ok(())
    }

    /// List the root once; the folder count is fixed from here on
    async fn snapshot_root(&self, root: &Path) -> Result<Vec<FolderSlot>, WalkError> {
        let display = root.display().to_string();
        let metadata = match tokio::fs::metadata(root).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WalkError::RootNotFound(display))
            }
            Err(e) => {
                return Err(WalkError::RootUnreadable {
                    path: display,
                    message: e.to_string(),
                })
            }
        };
        if !metadata.is_dir() {
            return Err(WalkError::RootNotADirectory(display));
        }

        let owned = root.to_path_buf();
        let items = tokio::task::spawn_blocking(move || list_dir(&owned))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
            .and_then(|listing| listing)
            .map_err(|e| WalkError::RootUnreadable {
                path: display,
                message: e.to_string(),
            })?;

        let mut slots = Vec::new();
        for item in items {
            match item {
                DirItem::Entry { name, path, is_dir } => {
                    if self.classifier.is_ignored(&name) {
                        continue;
                    }
                    if is_dir {
                        slots.push(FolderSlot::Folder(path));
                    } else {
                        tracing::debug!(file = %path.display(), "Ignoring file at library root");
                    }
                }
                DirItem::Failed { path, message } => {
                    if !self.is_ignored_path(&path) {
                        slots.push(FolderSlot::Unreadable { path, message });
                    }
                }
            }
        }
        Ok(slots)
    }

    fn is_ignored_path(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.classifier.is_ignored(&name.to_string_lossy()))
            .unwrap_or(false)
    }

    async fn process_slot(&self, root: &Path, slot: FolderSlot) -> FolderOutcome {
        match slot {
            FolderSlot::Folder(folder) => self.process_folder(root, &folder).await,
            FolderSlot::Unreadable { path, message } => unreadable_outcome(&path, &message),
        }
    }

    /// Classify, extract and validate one album folder
    async fn process_folder(&self, root: &Path, folder: &Path) -> FolderOutcome {
        let owned = folder.to_path_buf();
        let listing = tokio::task::spawn_blocking(move || list_dir(&owned))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
            .and_then(|listing| listing);

        let items = match listing {
            Ok(items) => items,
            Err(e) => return unreadable_outcome(folder, &e.to_string()),
        };

        let mut warnings = Vec::new();
        let mut state = FolderState {
            folder_path: folder.to_path_buf(),
            ..Default::default()
        };

        let mut entries: Vec<LibraryEntry> = Vec::new();
        for item in items {
            match item {
                DirItem::Entry { name, is_dir, .. } => {
                    if !self.classifier.is_ignored(&name) {
                        entries.push(self.classifier.classify(&name, is_dir, folder, root));
                    }
                }
                DirItem::Failed { path, message } => {
                    if self.is_ignored_path(&path) {
                        continue;
                    }
                    state
                        .read_failures
                        .push(format!("failed to read entry {}: {}", path.display(), message));
                }
            }
        }

        // Entries in name order; each decode runs to completion before the next
        let mut decoded: Vec<(LibraryEntry, TrackMetadata)> = Vec::new();
        let mut sidecars: Vec<(LibraryEntry, Lyrics)> = Vec::new();
        let mut covers: Vec<LibraryEntry> = Vec::new();

        for entry in entries {
            match entry.kind {
                EntryKind::Track => {
                    state.track_files += 1;
                    match self.extractor.extract_track(&entry.absolute_path).await {
                        Ok(metadata) => decoded.push((entry, metadata)),
                        Err(warning) => warnings.push(warning),
                    }
                }
                EntryKind::LyricsSidecar => {
                    match self.extractor.extract_lyrics(&entry.absolute_path).await {
                        Ok(lyrics) => sidecars.push((entry, lyrics)),
                        Err(warning) => warnings.push(warning),
                    }
                }
                EntryKind::Subdirectory => {
                    warnings.push(Warning::subdirectory(&entry.absolute_path));
                }
                EntryKind::CoverArt => covers.push(entry),
                EntryKind::Unknown => {}
            }
        }

        let mut sidecar_by_stem: HashMap<String, (LibraryEntry, Lyrics)> = sidecars
            .into_iter()
            .filter_map(|(entry, lyrics)| entry.stem().map(|stem| (stem, (entry, lyrics))))
            .collect();

        let mut tracks = Vec::with_capacity(decoded.len());
        for (entry, mut metadata) in decoded {
            let sidecar = entry
                .stem()
                .and_then(|stem| sidecar_by_stem.remove(&stem))
                .map(|(_, lyrics)| lyrics);

            let lyrics = match (sidecar, metadata.embedded_lyrics.take()) {
                (Some(lyrics), _) => Some(lyrics),
                (None, Some(text)) => {
                    match self
                        .extractor
                        .extract_embedded_lyrics(&entry.absolute_path, text)
                        .await
                    {
                        Ok(lyrics) => Some(lyrics),
                        Err(warning) => {
                            warnings.push(warning);
                            None
                        }
                    }
                }
                (None, None) => None,
            };

            tracks.push(TrackRecord {
                file_path: entry.absolute_path.to_string_lossy().to_string(),
                relative_path: entry.relative_path.to_string_lossy().to_string(),
                metadata,
                lyrics,
            });
        }

        let mut orphan_lyrics: Vec<String> = sidecar_by_stem
            .into_values()
            .map(|(entry, _)| entry.absolute_path.to_string_lossy().to_string())
            .collect();
        orphan_lyrics.sort();

        let mut cover_art = Vec::with_capacity(covers.len());
        for entry in covers {
            let palette = match self.extractor.extract_palette(&entry.absolute_path).await {
                Ok(palette) => palette,
                Err(warning) => {
                    warnings.push(warning);
                    None
                }
            };
            cover_art.push(CoverArtRecord {
                file_path: entry.absolute_path.to_string_lossy().to_string(),
                palette,
            });
        }

        state.cover_art_files = cover_art.len();
        state.tracks = tracks;
        if let Some(warning) = self.validator.validate(&state) {
            warnings.push(warning);
        }

        tracing::debug!(
            folder = %folder.display(),
            tracks = state.tracks.len(),
            warnings = warnings.len(),
            "Folder processed"
        );

        let relative_path = folder
            .strip_prefix(root)
            .unwrap_or(folder)
            .to_string_lossy()
            .to_string();

        FolderOutcome {
            warnings,
            album: Some(AlbumRecord {
                folder_path: folder.to_string_lossy().to_string(),
                relative_path,
                tracks: state.tracks,
                cover_art,
                orphan_lyrics,
            }),
        }
    }
}

/// Folder that was expected to be listable but was not
fn unreadable_outcome(path: &Path, message: &str) -> FolderOutcome {
    tracing::warn!(folder = %path.display(), error = %message, "Skipping unreadable folder");
    FolderOutcome {
        warnings: vec![Warning::folder_metadata(
            path,
            vec![format!("failed to read folder: {}", message)],
        )],
        album: None,
    }
}

/// Immediate children of `dir`, sorted by file name, symlinks followed
///
/// Fails only if `dir` itself cannot be opened; unreadable children are
/// returned as `DirItem::Failed`.
fn list_dir(dir: &Path) -> io::Result<Vec<DirItem>> {
    std::fs::read_dir(dir)?;

    let items = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .map(|result| match result {
            Ok(entry) => DirItem::Entry {
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir: entry.file_type().is_dir(),
                path: entry.into_path(),
            },
            Err(err) => DirItem::Failed {
                path: err.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
                message: err
                    .io_error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| err.to_string()),
            },
        })
        .collect();

    Ok(items)
}
