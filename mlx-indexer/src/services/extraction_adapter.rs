//! Metadata extraction adapter
//!
//! Runs the decoder collaborators on blocking threads and turns every failure
//! into a typed [`Warning`]. Nothing raised by a decoder, including a panic,
//! escapes this boundary.

use crate::models::{Lyrics, Palette, TrackMetadata, Warning};
use crate::services::collaborators::{
    AudioMetadataDecoder, ExtractError, LyricsDecoder, PaletteExtractor,
};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
pub struct ExtractionAdapter {
    audio: Arc<dyn AudioMetadataDecoder>,
    lyrics: Arc<dyn LyricsDecoder>,
    palette: Arc<dyn PaletteExtractor>,
}

impl ExtractionAdapter {
    pub fn new(
        audio: Arc<dyn AudioMetadataDecoder>,
        lyrics: Arc<dyn LyricsDecoder>,
        palette: Arc<dyn PaletteExtractor>,
    ) -> Self {
        Self {
            audio,
            lyrics,
            palette,
        }
    }

    /// Decode one track's tags, or a `MetaflacParsingError` for that file
    pub async fn extract_track(&self, path: &Path) -> Result<TrackMetadata, Warning> {
        let decoder = Arc::clone(&self.audio);
        let owned = path.to_path_buf();
        run_blocking(move || decoder.decode(&owned))
            .await
            .map_err(|message| {
                tracing::debug!(file = %path.display(), error = %message, "Track decode failed");
                Warning::metaflac(path, message)
            })
    }

    /// Decode a lyrics sidecar, or a `LyricsParsingError` for that file
    pub async fn extract_lyrics(&self, path: &Path) -> Result<Lyrics, Warning> {
        let decoder = Arc::clone(&self.lyrics);
        let owned = path.to_path_buf();
        run_blocking(move || decoder.decode_file(&owned))
            .await
            .map_err(|message| {
                tracing::debug!(file = %path.display(), error = %message, "Lyrics decode failed");
                Warning::lyrics(path, message)
            })
    }

    /// Decode lyrics embedded in a track's tags; failures are reported against the track
    pub async fn extract_embedded_lyrics(
        &self,
        track_path: &Path,
        text: String,
    ) -> Result<Lyrics, Warning> {
        let decoder = Arc::clone(&self.lyrics);
        run_blocking(move || decoder.decode_text(&text))
            .await
            .map_err(|message| Warning::lyrics(track_path, message))
    }

    /// Best-effort palette
    ///
    /// Undecodable images yield `Ok(None)`. Only an image that cannot be read
    /// at all is reported, as a `MetaflacParsingError` on the image path.
    pub async fn extract_palette(&self, path: &Path) -> Result<Option<Palette>, Warning> {
        let extractor = Arc::clone(&self.palette);
        let owned: PathBuf = path.to_path_buf();
        let outcome = tokio::task::spawn_blocking(move || extractor.extract(&owned)).await;

        match outcome {
            Ok(Ok(palette)) => Ok(Some(palette)),
            Ok(Err(ExtractError::Unreadable(message))) => {
                tracing::debug!(file = %path.display(), error = %message, "Cover art unreadable");
                Err(Warning::metaflac(path, format!("cover art unreadable: {}", message)))
            }
            Ok(Err(ExtractError::Decode(message))) => {
                tracing::debug!(file = %path.display(), error = %message, "Palette skipped");
                Ok(None)
            }
            Err(join_err) => {
                tracing::warn!(file = %path.display(), error = %join_err, "Palette extractor panicked");
                Ok(None)
            }
        }
    }
}

/// Run a decoder call on the blocking pool, flattening panics into the error message
async fn run_blocking<T, E, F>(f: F) -> Result<T, String>
where
    T: Send + 'static,
    E: Display + Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(join_err) => Err(format!("decoder panicked: {}", join_err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::collaborators::DecodeError;

    struct FailingAudio;
    impl AudioMetadataDecoder for FailingAudio {
        fn decode(&self, _path: &Path) -> Result<TrackMetadata, DecodeError> {
            Err(DecodeError::Read("bad header".to_string()))
        }
    }

    struct PanickingAudio;
    impl AudioMetadataDecoder for PanickingAudio {
        fn decode(&self, _path: &Path) -> Result<TrackMetadata, DecodeError> {
            panic!("decoder bug")
        }
    }

    struct PlainLyrics;
    impl LyricsDecoder for PlainLyrics {
        fn decode_text(&self, text: &str) -> Result<Lyrics, DecodeError> {
            if text == "bad" {
                return Err(DecodeError::Invalid("nope".to_string()));
            }
            Ok(Lyrics::default())
        }
    }

    struct FixedPalette(Option<ExtractError>);
    impl PaletteExtractor for FixedPalette {
        fn extract(&self, _path: &Path) -> Result<Palette, ExtractError> {
            match &self.0 {
                None => Ok(Palette::default()),
                Some(ExtractError::Unreadable(m)) => Err(ExtractError::Unreadable(m.clone())),
                Some(ExtractError::Decode(m)) => Err(ExtractError::Decode(m.clone())),
            }
        }
    }

    fn adapter(
        audio: impl AudioMetadataDecoder + 'static,
        palette: Option<ExtractError>,
    ) -> ExtractionAdapter {
        ExtractionAdapter::new(
            Arc::new(audio),
            Arc::new(PlainLyrics),
            Arc::new(FixedPalette(palette)),
        )
    }

    #[tokio::test]
    async fn test_track_failure_becomes_warning() {
        let path = Path::new("/music/A/01.flac");
        let warning = adapter(FailingAudio, None)
            .extract_track(path)
            .await
            .unwrap_err();
        assert_eq!(
            warning,
            Warning::metaflac(path, "Failed to read file: bad header")
        );
    }

    #[tokio::test]
    async fn test_panicking_decoder_is_contained() {
        let warning = adapter(PanickingAudio, None)
            .extract_track(Path::new("/music/A/01.flac"))
            .await
            .unwrap_err();
        match warning {
            Warning::MetaflacParsingError { error_message, .. } => {
                assert!(error_message.starts_with("decoder panicked"));
            }
            other => panic!("unexpected warning {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_sidecar_is_lyrics_warning() {
        let warning = adapter(FailingAudio, None)
            .extract_lyrics(Path::new("/nonexistent/01.lrc"))
            .await
            .unwrap_err();
        assert_eq!(warning.kind(), "LyricsParsingError");
        assert_eq!(warning.path(), "/nonexistent/01.lrc");
    }

    #[tokio::test]
    async fn test_embedded_lyrics_reported_on_track() {
        let track = Path::new("/music/A/01.flac");
        let adapter = adapter(FailingAudio, None);
        assert!(adapter
            .extract_embedded_lyrics(track, "fine".to_string())
            .await
            .is_ok());
        let warning = adapter
            .extract_embedded_lyrics(track, "bad".to_string())
            .await
            .unwrap_err();
        assert_eq!(warning, Warning::lyrics(track, "Invalid data: nope"));
    }

    #[tokio::test]
    async fn test_palette_decode_failure_swallowed() {
        let result = adapter(FailingAudio, Some(ExtractError::Decode("eof".to_string())))
            .extract_palette(Path::new("/music/A/cover.jpg"))
            .await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_palette_read_failure_reported() {
        let path = Path::new("/music/A/cover.jpg");
        let warning = adapter(
            FailingAudio,
            Some(ExtractError::Unreadable("permission denied".to_string())),
        )
        .extract_palette(path)
        .await
        .unwrap_err();
        assert_eq!(
            warning,
            Warning::metaflac(path, "cover art unreadable: permission denied")
        );
    }
}
