//! Data models for mlx-indexer
//!
//! - Indexing job state machine
//! - Library entry classification
//! - Catalog records (tracks, lyrics, cover art palettes)
//! - Indexing parameters

pub mod catalog;
pub mod indexing_job;
pub mod library_entry;
pub mod parameters;

pub use catalog::{
    AlbumRecord, CoverArtRecord, LyricLine, Lyrics, Palette, PaletteColor, TrackMetadata,
    TrackRecord,
};
pub use indexing_job::{IndexingJob, JobStateError, Termination};
pub use library_entry::{EntryKind, LibraryEntry};
pub use parameters::IndexingParameters;
pub use mlx_common::events::{JobStatus, Warning};
