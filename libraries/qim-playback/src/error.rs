//! Error types for playback management

use thiserror::Error;

/// Playback errors
///
/// Resource-level failures never surface here; the engine absorbs them.
/// These variants cover caller mistakes and a closed runtime.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Index out of bounds
    #[error("Index out of bounds: {index} (queue length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The engine task has shut down
    #[error("Playback engine is closed")]
    EngineClosed,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
