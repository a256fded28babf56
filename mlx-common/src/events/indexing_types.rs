//! Indexing vocabulary shared by the engine, the job store and API consumers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Non-fatal condition discovered while indexing
///
/// Closed set: every consumer (store serialization, event projection, reports)
/// matches exhaustively, so a new variant is a compile-time-checked change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Warning {
    /// Audio-tag decoding failed for one file
    #[serde(rename_all = "camelCase")]
    MetaflacParsingError {
        file_path: String,
        error_message: String,
    },

    /// Lyrics decoding failed for one file
    #[serde(rename_all = "camelCase")]
    LyricsParsingError {
        file_path: String,
        error_message: String,
    },

    /// An album folder contains a nested directory
    #[serde(rename_all = "camelCase")]
    SubdirectoriesWarning { dir_path: String },

    /// Folder-level consistency checks failed
    #[serde(rename_all = "camelCase")]
    FolderMetadataWarning {
        folder_path: String,
        messages: Vec<String>,
    },
}

impl Warning {
    pub fn metaflac(file_path: &Path, error_message: impl Into<String>) -> Self {
        Warning::MetaflacParsingError {
            file_path: file_path.to_string_lossy().to_string(),
            error_message: error_message.into(),
        }
    }

    pub fn lyrics(file_path: &Path, error_message: impl Into<String>) -> Self {
        Warning::LyricsParsingError {
            file_path: file_path.to_string_lossy().to_string(),
            error_message: error_message.into(),
        }
    }

    pub fn subdirectory(dir_path: &Path) -> Self {
        Warning::SubdirectoriesWarning {
            dir_path: dir_path.to_string_lossy().to_string(),
        }
    }

    pub fn folder_metadata(folder_path: &Path, messages: Vec<String>) -> Self {
        Warning::FolderMetadataWarning {
            folder_path: folder_path.to_string_lossy().to_string(),
            messages,
        }
    }

    /// Variant name, as serialized in the `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::MetaflacParsingError { .. } => "MetaflacParsingError",
            Warning::LyricsParsingError { .. } => "LyricsParsingError",
            Warning::SubdirectoriesWarning { .. } => "SubdirectoriesWarning",
            Warning::FolderMetadataWarning { .. } => "FolderMetadataWarning",
        }
    }

    /// Filesystem path the warning refers to
    pub fn path(&self) -> &str {
        match self {
            Warning::MetaflacParsingError { file_path, .. } => file_path,
            Warning::LyricsParsingError { file_path, .. } => file_path,
            Warning::SubdirectoriesWarning { dir_path } => dir_path,
            Warning::FolderMetadataWarning { folder_path, .. } => folder_path,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MetaflacParsingError {
                file_path,
                error_message,
            } => write!(f, "could not read tags of {}: {}", file_path, error_message),
            Warning::LyricsParsingError {
                file_path,
                error_message,
            } => write!(f, "could not parse lyrics of {}: {}", file_path, error_message),
            Warning::SubdirectoriesWarning { dir_path } => {
                write!(f, "unexpected subdirectory {}", dir_path)
            }
            Warning::FolderMetadataWarning {
                folder_path,
                messages,
            } => write!(f, "{}: {}", folder_path, messages.join("; ")),
        }
    }
}

/// Indexing job life-cycle state
///
/// queued → active → completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal states accept no further mutation
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "active" => Ok(JobStatus::Active),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_warning_wire_format() {
        let warning = Warning::metaflac(Path::new("/music/a/01.flac"), "bad header");
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "MetaflacParsingError",
                "filePath": "/music/a/01.flac",
                "errorMessage": "bad header",
            })
        );

        let folder = Warning::folder_metadata(
            Path::new("/music/a"),
            vec!["no cover art found".to_string()],
        );
        let value = serde_json::to_value(&folder).unwrap();
        assert_eq!(value["type"], "FolderMetadataWarning");
        assert_eq!(value["folderPath"], "/music/a");
        assert_eq!(value["messages"][0], "no cover art found");
    }

    #[test]
    fn test_warning_deserializes_from_tagged_json() {
        let warning: Warning = serde_json::from_value(json!({
            "type": "SubdirectoriesWarning",
            "dirPath": "/music/a/extras",
        }))
        .unwrap();
        assert_eq!(warning, Warning::subdirectory(Path::new("/music/a/extras")));
        assert_eq!(warning.kind(), "SubdirectoriesWarning");
        assert_eq!(warning.path(), "/music/a/extras");
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Active.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_job_status_parse() {
        assert_eq!("active".parse::<JobStatus>(), Ok(JobStatus::Active));
        assert!("running".parse::<JobStatus>().is_err());
        assert_eq!(serde_json::to_string(&JobStatus::Failed).unwrap(), "\"failed\"");
    }
}
