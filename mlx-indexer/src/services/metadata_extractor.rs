//! Audio metadata decoder backed by lofty
//!
//! Extracts:
//! - Title, artist, album, album artist
//! - Track/disc number, year, genre
//! - Duration and stream properties
//! - Embedded unsynchronized lyrics

use crate::models::TrackMetadata;
use crate::services::collaborators::{AudioMetadataDecoder, DecodeError};
use lofty::file::FileType;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;
use std::path::Path;

/// Metadata decoder service
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyMetadataDecoder;

impl LoftyMetadataDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioMetadataDecoder for LoftyMetadataDecoder {
    fn decode(&self, file_path: &Path) -> Result<TrackMetadata, DecodeError> {
        // Probe the file to determine format
        let tagged_file = Probe::open(file_path)
            .map_err(|e| DecodeError::Read(e.to_string()))?
            .guess_file_type()?
            .read()
            .map_err(|e| DecodeError::Read(e.to_string()))?;

        let properties = tagged_file.properties();
        let duration_seconds = properties.duration().as_secs_f64();
        let sample_rate = properties.sample_rate();
        let channels = properties.channels();
        let bitrate = properties.audio_bitrate();

        let format = match tagged_file.file_type() {
            FileType::Mpeg => "MP3",
            FileType::Flac => "FLAC",
            FileType::Opus => "Opus",
            FileType::Vorbis => "OGG Vorbis",
            FileType::Aac => "AAC",
            FileType::Mp4 => "MP4",
            FileType::Aiff => "AIFF",
            FileType::Wav => "WAV",
            FileType::WavPack => "WavPack",
            _ => "Unknown",
        }
        .to_string();

        let mut metadata = TrackMetadata {
            duration_seconds: Some(duration_seconds),
            format,
            sample_rate,
            channels,
            bitrate,
            ..Default::default()
        };

        // Primary tag first, then whichever tag the container carries
        if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            metadata.title = tag.title().map(|s| s.to_string());
            metadata.artist = tag.artist().map(|s| s.to_string());
            metadata.album = tag.album().map(|s| s.to_string());
            metadata.album_artist = tag.get_string(&ItemKey::AlbumArtist).map(str::to_string);
            metadata.track_number = tag.track();
            metadata.disc_number = tag.disk();
            metadata.year = tag.year();
            metadata.genre = tag.genre().map(|s| s.to_string());
            metadata.embedded_lyrics = tag
                .get_string(&ItemKey::Lyrics)
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string);
        }

        tracing::debug!(
            file = %file_path.display(),
            title = ?metadata.title,
            album = ?metadata.album,
            duration_s = duration_seconds,
            format = %metadata.format,
            "Extracted metadata"
        );

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_nonexistent_file() {
        let decoder = LoftyMetadataDecoder::new();
        let result = decoder.decode(Path::new("/nonexistent/file.flac"));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_garbage_flac() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.flac");
        std::fs::write(&path, b"this is not a flac stream at all").unwrap();

        let decoder = LoftyMetadataDecoder::new();
        assert!(decoder.decode(&path).is_err());
    }
}
