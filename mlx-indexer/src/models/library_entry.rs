//! Classification result for one filesystem entry

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a directory entry is, as far as indexing is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    Track,
    LyricsSidecar,
    CoverArt,
    Subdirectory,
    /// Unrecognized; silently ignored
    Unknown,
}

/// Transient, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub kind: EntryKind,
    pub absolute_path: PathBuf,
    /// Relative to the library root
    pub relative_path: PathBuf,
}

impl LibraryEntry {
    /// File name without extension, used to pair lyrics sidecars with tracks
    pub fn stem(&self) -> Option<String> {
        self.absolute_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
    }
}
