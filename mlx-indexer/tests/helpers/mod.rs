//! Test Helper Utilities
//!
//! Shared utilities for testing mlx-indexer

#![allow(dead_code)]

pub mod audio_generator;
pub mod library;
pub mod log_capture;
pub mod stubs;

// Re-export commonly used items
pub use audio_generator::{generate_test_wav, AudioConfig};
pub use library::{AlbumBuilder, TestLibrary};
pub use log_capture::{capture_logs, LogCapture};
pub use stubs::{
    stub_controller, stub_controller_with, wait_for_terminal, wait_until_idle, FailingOp,
    FlakyStore, StubAudioDecoder, StubPaletteExtractor,
};
