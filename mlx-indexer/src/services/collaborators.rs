//! Collaborator contracts consumed by the indexing engine
//!
//! The engine only sees these traits. Implementations run on blocking threads,
//! so they are plain synchronous calls that must be `Send + Sync`.

use crate::models::{Lyrics, Palette, TrackMetadata};
use std::path::Path;
use thiserror::Error;

/// Single-file decode failure (audio tags or lyrics)
#[derive(Debug, Error)]
pub enum DecodeError {
    /// File could not be parsed by the underlying reader
    #[error("Failed to read file: {0}")]
    Read(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Payload read fine but its content is malformed
    #[error("Invalid data: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Palette extraction failure
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The image file itself could not be opened or read
    #[error("Cannot read image: {0}")]
    Unreadable(String),

    /// The bytes were read but are not a decodable image
    #[error("Cannot decode image: {0}")]
    Decode(String),
}

/// Reads one audio file's tags and properties
pub trait AudioMetadataDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<TrackMetadata, DecodeError>;
}

/// Parses one lyrics payload into structured lines
pub trait LyricsDecoder: Send + Sync {
    fn decode_text(&self, text: &str) -> Result<Lyrics, DecodeError>;

    /// Read a sidecar file (UTF-8) and decode it
    fn decode_file(&self, path: &Path) -> Result<Lyrics, DecodeError> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| DecodeError::Invalid(format!("lyrics are not valid UTF-8: {}", e)))?;
        self.decode_text(&text)
    }
}

/// Computes the dominant colors of a cover-art image
pub trait PaletteExtractor: Send + Sync {
    fn extract(&self, image_path: &Path) -> Result<Palette, ExtractError>;
}
