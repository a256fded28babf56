//! Library fixture builder
//!
//! Builds `<root>/<album>/<files>` trees in a temp directory. Track files are
//! plain `key=value` text read by [`super::StubAudioDecoder`].

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary library root
pub struct TestLibrary {
    dir: TempDir,
}

impl TestLibrary {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create (or reopen) an album folder
    pub fn album(&self, name: &str) -> AlbumBuilder {
        let path = self.dir.path().join(name);
        fs::create_dir_all(&path).unwrap();
        AlbumBuilder { path }
    }

    /// File directly under the root (never indexed)
    pub fn root_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Library of `count` clean albums named `album-00`, `album-01`, ...
    pub fn with_clean_albums(count: usize) -> Self {
        let library = Self::new();
        for i in 0..count {
            let name = format!("album-{:02}", i);
            library
                .album(&name)
                .track("01.flac", &name, "One")
                .track("02.flac", &name, "Two")
                .cover("cover.jpg");
        }
        library
    }
}

impl Default for TestLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// One album folder under construction
pub struct AlbumBuilder {
    path: PathBuf,
}

impl AlbumBuilder {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Track with album and title tags
    pub fn track(&self, file: &str, album: &str, title: &str) -> &Self {
        self.tagged(file, &[("album", album), ("title", title)])
    }

    /// Track with arbitrary tags (`album`, `title`, `album_artist`, `lyrics`, `delay_ms`)
    pub fn tagged(&self, file: &str, tags: &[(&str, &str)]) -> &Self {
        let body: String = tags
            .iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect();
        self.file(file, &body)
    }

    /// Track whose tags cannot be decoded
    pub fn corrupt_track(&self, file: &str) -> &Self {
        self.file(file, "corrupt")
    }

    pub fn cover(&self, file: &str) -> &Self {
        self.file(file, "cover")
    }

    pub fn file(&self, name: &str, contents: &str) -> &Self {
        fs::write(self.path.join(name), contents).unwrap();
        self
    }

    /// Nested directory, optionally with files inside
    pub fn subdir(&self, name: &str, files: &[(&str, &str)]) -> &Self {
        let dir = self.path.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, contents) in files {
            fs::write(dir.join(file), contents).unwrap();
        }
        self
    }
}
