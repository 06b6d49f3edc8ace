//! CLI error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid simulation: {0}")]
    Simulation(String),

    #[error(transparent)]
    Core(#[from] qim_core::QimError),

    #[error(transparent)]
    Playback(#[from] qim_playback::PlaybackError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}
