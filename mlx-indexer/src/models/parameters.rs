//! Indexing parameters
//!
//! File classification sets, ignore rules and worker pool sizing.

use serde::{Deserialize, Serialize};

/// Indexing workflow parameters
///
/// Loaded from the `[indexing]` section of the config file; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingParameters {
    /// Extensions classified as tracks (default: common audio formats)
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,

    /// Extensions classified as lyrics sidecars (default: lrc)
    #[serde(default = "default_lyrics_extensions")]
    pub lyrics_extensions: Vec<String>,

    /// Extensions classified as cover art (default: common image formats)
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Entry names skipped before classification (exact match)
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Skip hidden entries (starting with .) (default: true)
    #[serde(default = "default_skip_hidden")]
    pub skip_hidden_files: bool,

    /// Album folders processed concurrently (default: 4)
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Colors kept per cover-art palette (default: 5)
    #[serde(default = "default_palette_size")]
    pub palette_size: usize,
}

fn default_audio_extensions() -> Vec<String> {
    ["flac", "mp3", "ogg", "oga", "opus", "m4a", "aac", "wav", "aiff", "wv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_lyrics_extensions() -> Vec<String> {
    vec!["lrc".to_string()]
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp", "gif", "bmp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignore_patterns() -> Vec<String> {
    vec![
        ".DS_Store".to_string(),
        "Thumbs.db".to_string(),
        "desktop.ini".to_string(),
    ]
}

fn default_skip_hidden() -> bool {
    true
}

fn default_parallelism() -> usize {
    4
}

fn default_palette_size() -> usize {
    5
}

impl Default for IndexingParameters {
    fn default() -> Self {
        Self {
            audio_extensions: default_audio_extensions(),
            lyrics_extensions: default_lyrics_extensions(),
            image_extensions: default_image_extensions(),
            ignore_patterns: default_ignore_patterns(),
            skip_hidden_files: default_skip_hidden(),
            parallelism: default_parallelism(),
            palette_size: default_palette_size(),
        }
    }
}

impl IndexingParameters {
    /// Lowercase extensions and strip leading dots (".FLAC" → "flac")
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.audio_extensions,
            &mut self.lyrics_extensions,
            &mut self.image_extensions,
        ] {
            *list = list
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect();
        }
        self
    }

    /// Reject settings the walker cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.parallelism == 0 {
            return Err("parallelism must be at least 1".to_string());
        }
        if self.audio_extensions.is_empty() {
            return Err("audio_extensions must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_strips_dots_and_case() {
        let params = IndexingParameters {
            audio_extensions: vec![".FLAC".to_string(), " Mp3 ".to_string(), ".".to_string()],
            ..Default::default()
        }
        .normalized();
        assert_eq!(params.audio_extensions, vec!["flac", "mp3"]);
    }

    #[test]
    fn test_validate_rejects_zero_parallelism() {
        let params = IndexingParameters {
            parallelism: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        assert!(IndexingParameters::default().validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let params: IndexingParameters = serde_json::from_str(r#"{"parallelism": 2}"#).unwrap();
        assert_eq!(params.parallelism, 2);
        assert_eq!(params.lyrics_extensions, vec!["lrc"]);
        assert!(params.skip_hidden_files);
    }
}
