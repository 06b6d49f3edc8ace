//! Recitation domain types shared across crates

use serde::{Deserialize, Serialize};

/// One playable unit of recitation (usually a single ayah)
///
/// `audio_url` is `None` until the audio resolver has produced an address.
/// The engine keeps such an item as "awaiting" instead of skipping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Stable human-readable identifier, e.g. `"2:255"`
    pub reference: String,

    /// Surah number (1-114)
    pub surah_number: u32,

    /// Ayah number within the surah
    pub ayah_number: u32,

    /// Display text (not used by playback logic)
    pub text: String,

    /// Resolved playable address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl QueueItem {
    /// Create an unresolved item
    pub fn new(
        reference: impl Into<String>,
        surah_number: u32,
        ayah_number: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            surah_number,
            ayah_number,
            text: text.into(),
            audio_url: None,
        }
    }

    /// Attach a resolved audio address
    #[must_use]
    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    /// Whether the item has a playable address
    pub fn is_resolved(&self) -> bool {
        self.audio_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// What happens when the current item finishes naturally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop at the end of the queue
    #[default]
    Off,

    /// Repeat the current item indefinitely
    #[serde(alias = "ayah", alias = "one")]
    Item,

    /// Wrap to the start of the queue
    #[serde(alias = "surah")]
    All,
}

impl RepeatMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Item => "item",
            Self::All => "all",
        }
    }

    /// Parse from string, accepting the legacy `ayah`/`surah` spellings
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "item" | "ayah" | "one" => Some(Self::Item),
            "all" | "surah" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Playback defaults owned by the preference store
///
/// The engine reads these once at construction; persisting changes is the
/// store's job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackPreferences {
    /// Output volume (0.0-1.0)
    pub volume: f32,

    /// Playback speed multiplier
    pub playback_rate: f32,

    /// Repeat policy
    pub repeat: RepeatMode,

    /// Randomized advance
    pub shuffle: bool,
}

impl Default for PlaybackPreferences {
    fn default() -> Self {
        Self {
            volume: 1.0,
            playback_rate: 1.0,
            repeat: RepeatMode::Off,
            shuffle: false,
        }
    }
}

impl PlaybackPreferences {
    /// Clamp out-of-range values loaded from storage
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.volume = if self.volume.is_nan() {
            1.0
        } else {
            self.volume.clamp(0.0, 1.0)
        };
        if !(self.playback_rate.is_finite() && self.playback_rate > 0.0) {
            self.playback_rate = 1.0;
        }
        self
    }
}
