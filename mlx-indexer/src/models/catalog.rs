//! Catalog records produced by a successful folder pass

use serde::{Deserialize, Serialize};

/// Decoded audio tags and properties for one track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub year: Option<u32>,
    pub genre: Option<String>,

    /// Duration in seconds
    pub duration_seconds: Option<f64>,

    /// Container format (FLAC, MP3, ...)
    pub format: String,

    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,

    /// Bitrate (kbps)
    pub bitrate: Option<u32>,

    /// Unsynchronized lyrics tag, decoded separately
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded_lyrics: Option<String>,
}

/// One lyric line; `start_ms` is None for unsynchronized lyrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    pub start_ms: Option<u64>,
    pub text: String,
}

/// Structured lyrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lyrics {
    /// True when every line carries a timestamp
    pub synced: bool,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// `[offset:]` header, already applied to `start_ms`
    pub offset_ms: i64,
    pub lines: Vec<LyricLine>,
}

/// Color share in a cover-art image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteColor {
    /// "#rrggbb"
    pub hex: String,
    /// Fraction of sampled pixels, 0.0-1.0
    pub share: f32,
}

/// Dominant colors, most frequent first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub colors: Vec<PaletteColor>,
}

/// Track entry in an album record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub file_path: String,
    pub relative_path: String,
    pub metadata: TrackMetadata,
    pub lyrics: Option<Lyrics>,
}

/// Cover art entry in an album record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverArtRecord {
    pub file_path: String,
    /// None when the image could not be decoded
    pub palette: Option<Palette>,
}

/// Catalog entry for one album folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub folder_path: String,
    pub relative_path: String,
    /// Tracks whose tags could be read, in file-name order
    pub tracks: Vec<TrackRecord>,
    pub cover_art: Vec<CoverArtRecord>,
    /// Lyrics sidecars with no track of the same stem
    pub orphan_lyrics: Vec<String>,
}

impl AlbumRecord {
    /// Album title shared by the tracks, if any track carries one
    pub fn album_title(&self) -> Option<&str> {
        self.tracks
            .iter()
            .find_map(|t| t.metadata.album.as_deref())
    }
}
