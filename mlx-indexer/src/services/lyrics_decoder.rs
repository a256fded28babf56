//! LRC lyrics decoder
//!
//! Accepts synchronized LRC (`[mm:ss.xx]line`, several timestamps per line allowed),
//! the `ar`/`ti`/`al`/`offset` headers, and plain unsynchronized text.

use crate::models::{LyricLine, Lyrics};
use crate::services::collaborators::{DecodeError, LyricsDecoder};
use thiserror::Error;

/// LRC parse errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LrcError {
    #[error("lyrics payload is empty")]
    Empty,

    #[error("line {line}: malformed timestamp [{tag}]")]
    MalformedTimestamp { line: usize, tag: String },

    #[error("line {line}: unterminated tag")]
    UnterminatedTag { line: usize },

    #[error("line {line}: invalid offset [{value}]")]
    InvalidOffset { line: usize, value: String },
}

impl From<LrcError> for DecodeError {
    fn from(err: LrcError) -> Self {
        DecodeError::Invalid(err.to_string())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LrcLyricsDecoder;

impl LrcLyricsDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl LyricsDecoder for LrcLyricsDecoder {
    fn decode_text(&self, text: &str) -> Result<Lyrics, DecodeError> {
        Ok(parse_lrc(text)?)
    }
}

/// Parse an LRC (or plain text) lyrics payload
pub fn parse_lrc(text: &str) -> Result<Lyrics, LrcError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lyrics = Lyrics::default();
    // (timestamp before offset, text)
    let mut raw_lines: Vec<(Option<u64>, String)> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let mut rest = raw.trim();
        if rest.is_empty() {
            continue;
        }

        let mut timestamps = Vec::new();

        while let Some(after_open) = rest.strip_prefix('[') {
            let close = after_open
                .find(']')
                .ok_or(LrcError::UnterminatedTag { line: line_no })?;
            let tag = &after_open[..close];

            if tag.starts_with(|c: char| c.is_ascii_digit()) {
                let ms = parse_timestamp(tag).ok_or_else(|| LrcError::MalformedTimestamp {
                    line: line_no,
                    tag: tag.to_string(),
                })?;
                timestamps.push(ms);
            } else if let Some((key, value)) = tag.split_once(':') {
                if !timestamps.is_empty() {
                    // Header tags only appear before any timestamp
                    break;
                }
                apply_header(&mut lyrics, key.trim(), value.trim(), line_no)?;
            } else {
                // Bracketed text such as "[Chorus]"
                break;
            }

            rest = after_open[close + 1..].trim_start();
        }

        let line_text = rest.trim().to_string();
        if !timestamps.is_empty() {
            for ms in timestamps {
                raw_lines.push((Some(ms), line_text.clone()));
            }
        } else if !line_text.is_empty() {
            raw_lines.push((None, line_text));
        }
    }

    if raw_lines.is_empty() {
        return Err(LrcError::Empty);
    }

    lyrics.synced = raw_lines.iter().all(|(ms, _)| ms.is_some());
    if lyrics.synced {
        // Stable: lines sharing a timestamp keep file order
        raw_lines.sort_by_key(|(ms, _)| *ms);
    }

    let offset = lyrics.offset_ms;
    lyrics.lines = raw_lines
        .into_iter()
        .map(|(ms, text)| LyricLine {
            // Positive offset shows lyrics earlier
            start_ms: ms.map(|ms| (ms as i64 - offset).max(0) as u64),
            text,
        })
        .collect();

    Ok(lyrics)
}

fn apply_header(lyrics: &mut Lyrics, key: &str, value: &str, line: usize) -> Result<(), LrcError> {
    let value_opt = || (!value.is_empty()).then(|| value.to_string());
    match key.to_ascii_lowercase().as_str() {
        "ar" => lyrics.artist = value_opt(),
        "ti" => lyrics.title = value_opt(),
        "al" => lyrics.album = value_opt(),
        "offset" => {
            lyrics.offset_ms = value
                .trim_start_matches('+')
                .parse::<i64>()
                .map_err(|_| LrcError::InvalidOffset {
                    line,
                    value: value.to_string(),
                })?;
        }
        // by, re, ve, length, ...
        _ => {}
    }
    Ok(())
}

/// `mm:ss`, `mm:ss.x`, `mm:ss.xx`, `mm:ss.xxx` (`:` accepted as fraction separator)
fn parse_timestamp(tag: &str) -> Option<u64> {
    let (minutes, rest) = tag.split_once(':')?;
    let (seconds, fraction) = match rest.find(['.', ':']) {
        Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
        None => (rest, None),
    };

    if minutes.is_empty() || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if seconds.is_empty() || seconds.len() > 2 || !seconds.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }

    let millis = match fraction {
        None => 0,
        Some(f) if !f.is_empty() && f.len() <= 3 && f.bytes().all(|b| b.is_ascii_digit()) => {
            let value: u64 = f.parse().ok()?;
            value * 10u64.pow(3 - f.len() as u32)
        }
        Some(_) => return None,
    };

    Some(minutes * 60_000 + seconds * 1000 + millis)
}
