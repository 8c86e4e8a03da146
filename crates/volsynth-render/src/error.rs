//! Rendering error types.

use thiserror::Error;

use crate::screenshot::ScreenshotError;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The rendering backend failed to produce a frame.
    #[error("render backend failed: {0}")]
    Backend(String),

    /// A pixel buffer does not match its declared dimensions.
    #[error("pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Required byte count.
        expected: usize,
        /// Byte count supplied.
        actual: usize,
    },

    /// Saving a captured image failed.
    #[error("capture failed: {0}")]
    Screenshot(#[from] ScreenshotError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
