//! Library indexing engine and its collaborators
//!
//! Leaves first: classifier, extraction adapter, folder validator, tree walker,
//! job controller. Decoders and stores sit behind the traits in
//! [`collaborators`] and [`job_store`].

pub mod classifier;
pub mod collaborators;
pub mod extraction_adapter;
pub mod folder_validator;
pub mod job_controller;
pub mod job_store;
pub mod lyrics_decoder;
pub mod metadata_extractor;
pub mod palette_extractor;
pub mod tree_walker;

pub use classifier::FileClassifier;
pub use collaborators::{
    AudioMetadataDecoder, DecodeError, ExtractError, LyricsDecoder, PaletteExtractor,
};
pub use extraction_adapter::ExtractionAdapter;
pub use folder_validator::{FolderState, FolderValidator};
pub use job_controller::{JobController, JobError};
pub use job_store::{JobStore, MemoryJobStore, StoreError};
pub use lyrics_decoder::{parse_lrc, LrcError, LrcLyricsDecoder};
pub use metadata_extractor::LoftyMetadataDecoder;
pub use palette_extractor::ImagePaletteExtractor;
pub use tree_walker::{TreeWalker, WalkError, WalkSummary};
