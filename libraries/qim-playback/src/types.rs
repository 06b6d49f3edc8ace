//! Core types for playback management

use qim_core::{PlaybackPreferences, RepeatMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// No queue, or stopped
    #[default]
    Idle,

    /// Current item has no resolved address yet
    Awaiting,

    /// Address assigned, waiting for the resource to start
    Loading,

    /// Audio is progressing
    Playing,

    /// Paused mid-item
    Paused,

    /// Resource failed; a retry is scheduled
    Error,

    /// End of queue reached
    Finished,
}

impl PlayerState {
    /// States in which the engine intends audio to be progressing
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Awaiting | Self::Loading | Self::Playing | Self::Error
        )
    }
}

/// Configuration for the playback engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial volume (0.0-1.0, default: 1.0)
    pub volume: f32,

    /// Initial playback rate (default: 1.0)
    pub playback_rate: f32,

    /// Initial repeat mode (default: Off)
    pub repeat: RepeatMode,

    /// Initial shuffle flag (default: false)
    pub shuffle: bool,

    /// Retries per address before skipping (default: 2)
    pub max_retries: u32,

    /// First retry delay, doubled on every attempt (default: 1000)
    pub retry_base_delay_ms: u64,

    /// Window in which repeated `play_all` calls are dropped (default: 150)
    pub debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            playback_rate: 1.0,
            repeat: RepeatMode::Off,
            shuffle: false,
            max_retries: 2,
            retry_base_delay_ms: 1000,
            debounce_ms: 150,
        }
    }
}

impl EngineConfig {
    /// Build a config whose initial values come from the preference store
    pub fn from_preferences(preferences: &PlaybackPreferences) -> Self {
        Self::default().with_preferences(preferences)
    }

    /// Replace the initial volume/rate/repeat/shuffle values
    #[must_use]
    pub fn with_preferences(mut self, preferences: &PlaybackPreferences) -> Self {
        let preferences = preferences.sanitized();
        self.volume = preferences.volume;
        self.playback_rate = preferences.playback_rate;
        self.repeat = preferences.repeat;
        self.shuffle = preferences.shuffle;
        self
    }

    /// Base retry delay
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Debounce window for `play_all`
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
