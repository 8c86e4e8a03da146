//! Error types for volsynth.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for volsynth operations.
#[derive(Error, Debug)]
pub enum VolsynthError {
    /// A volume header or raw voxel buffer is malformed.
    #[error("format error: {0}")]
    Format(String),

    /// No rendering context is attached to the generator.
    #[error("no renderer available - attach one before capturing")]
    RendererUnavailable,

    /// Every numeric suffix for an output file name is already taken.
    #[error("could not find a free file name for '{}'", .0.display())]
    DisambiguationExhausted(PathBuf),

    /// A dataset export is already running.
    #[error("a dataset export is already in progress")]
    ExportInProgress,

    /// A dataset export was cancelled between two frames.
    #[error("dataset export cancelled after {completed} of {requested} frames")]
    Cancelled { completed: usize, requested: usize },

    /// An option value is out of its valid range.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Rendering or capture failed.
    #[error("render error: {0}")]
    Render(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for volsynth operations.
pub type Result<T> = std::result::Result<T, VolsynthError>;
