//! Folder-level consistency checks
//!
//! All failed checks for one folder are batched into a single
//! `FolderMetadataWarning`.

use crate::models::{TrackMetadata, TrackRecord, Warning};
use std::path::PathBuf;

/// What the walker learned about one album folder
#[derive(Debug, Clone, Default)]
pub struct FolderState {
    pub folder_path: PathBuf,
    /// Entries classified as tracks, readable or not
    pub track_files: usize,
    /// Tracks whose tags were decoded
    pub tracks: Vec<TrackRecord>,
    pub cover_art_files: usize,
    /// Entries that could not be read while listing the folder
    pub read_failures: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FolderValidator;

impl FolderValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run every check; `None` when the folder is clean
    pub fn validate(&self, state: &FolderState) -> Option<Warning> {
        let mut messages = state.read_failures.clone();

        if state.track_files == 0 {
            messages.push("no audio tracks found".to_string());
        } else if state.tracks.is_empty() {
            messages.push("no track metadata could be read".to_string());
        }

        let total = state.tracks.len();
        for (label, field) in [
            ("album", album as TagFn),
            ("title", title),
        ] {
            let missing = state
                .tracks
                .iter()
                .filter(|t| tag(&t.metadata, field).is_none())
                .count();
            if missing > 0 {
                messages.push(format!("missing {} tag on {} of {} tracks", label, missing, total));
            }
        }

        for (label, field) in [
            ("album names", album as TagFn),
            ("album artists", album_artist),
        ] {
            let distinct = distinct_values(&state.tracks, field);
            if distinct.len() > 1 {
                messages.push(format!("inconsistent {}: {}", label, distinct.join(", ")));
            }
        }

        if state.cover_art_files == 0 {
            messages.push("no cover art found".to_string());
        }

        if messages.is_empty() {
            None
        } else {
            Some(Warning::folder_metadata(&state.folder_path, messages))
        }
    }
}

type TagFn = fn(&TrackMetadata) -> Option<&str>;

fn album(m: &TrackMetadata) -> Option<&str> {
    m.album.as_deref()
}

fn title(m: &TrackMetadata) -> Option<&str> {
    m.title.as_deref()
}

fn album_artist(m: &TrackMetadata) -> Option<&str> {
    m.album_artist.as_deref()
}

/// Trimmed tag value; blank counts as missing
fn tag(metadata: &TrackMetadata, field: TagFn) -> Option<&str> {
    field(metadata).map(str::trim).filter(|v| !v.is_empty())
}

/// Distinct non-blank values in first-seen order
fn distinct_values(tracks: &[TrackRecord], field: TagFn) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in tracks.iter().filter_map(|t| tag(&t.metadata, field)) {
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
