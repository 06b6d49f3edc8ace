//! Core error types for Qim Player
use thiserror::Error;

/// Result type alias using `QimError`
pub type Result<T> = std::result::Result<T, QimError>;

/// Core error type for Qim Player
#[derive(Error, Debug)]
pub enum QimError {
    /// Audio address could not be resolved
    #[error("Audio resolution error: {0}")]
    Resolution(String),

    /// Preference store errors
    #[error("Preferences error: {0}")]
    Preferences(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl QimError {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a preferences error
    pub fn preferences(msg: impl Into<String>) -> Self {
        Self::Preferences(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
