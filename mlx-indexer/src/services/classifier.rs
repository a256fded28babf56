//! File classifier
//!
//! Maps one directory entry to a [`LibraryEntry`] using the configured
//! extension sets. Pure: never touches the filesystem.

use crate::models::{EntryKind, IndexingParameters, LibraryEntry};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FileClassifier {
    audio: HashSet<String>,
    lyrics: HashSet<String>,
    images: HashSet<String>,
    ignored_names: HashSet<String>,
    skip_hidden: bool,
}

impl FileClassifier {
    pub fn new(params: &IndexingParameters) -> Self {
        let params = params.clone().normalized();
        Self {
            audio: params.audio_extensions.into_iter().collect(),
            lyrics: params.lyrics_extensions.into_iter().collect(),
            images: params.image_extensions.into_iter().collect(),
            ignored_names: params.ignore_patterns.into_iter().collect(),
            skip_hidden: params.skip_hidden_files,
        }
    }

    /// Classify one entry named `name` inside `parent`
    ///
    /// Rules in order: directory, audio, lyrics, image, unknown.
    pub fn classify(
        &self,
        name: &str,
        is_dir: bool,
        parent: &Path,
        library_root: &Path,
    ) -> LibraryEntry {
        let absolute_path = parent.join(name);
        let relative_path = absolute_path
            .strip_prefix(library_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute_path.clone());

        LibraryEntry {
            kind: self.kind_of(name, is_dir),
            absolute_path,
            relative_path,
        }
    }

    fn kind_of(&self, name: &str, is_dir: bool) -> EntryKind {
        if is_dir {
            return EntryKind::Subdirectory;
        }

        let Some(ext) = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
        else {
            return EntryKind::Unknown;
        };

        if self.audio.contains(&ext) {
            EntryKind::Track
        } else if self.lyrics.contains(&ext) {
            EntryKind::LyricsSidecar
        } else if self.images.contains(&ext) {
            EntryKind::CoverArt
        } else {
            EntryKind::Unknown
        }
    }

    /// Names skipped before classification (ignore list, hidden entries)
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_names.contains(name) || (self.skip_hidden && name.starts_with('.'))
    }
}
