//! Preference store implementations
//!
//! `JsonPreferenceStore` persists under the same document shape the web
//! player kept in local storage:
//!
//! ```json
//! { "state": { "playbackRate": 1, "repeat": "off", "volume": 1, "shuffle": false }, "version": 0 }
//! ```

use crate::error::{QimError, Result};
use crate::traits::PreferenceStore;
use crate::types::PlaybackPreferences;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// In-memory store, mainly for tests and hosts without persistence
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    preferences: Option<PlaybackPreferences>,
}

impl MemoryPreferenceStore {
    /// Create a store seeded with preferences
    pub fn with_preferences(preferences: PlaybackPreferences) -> Self {
        Self {
            preferences: Some(preferences),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<PlaybackPreferences> {
        Ok(self.preferences.unwrap_or_default())
    }

    fn save(&mut self, preferences: &PlaybackPreferences) -> Result<()> {
        self.preferences = Some(*preferences);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedDocument {
    state: PlaybackPreferences,
    #[serde(default)]
    version: u32,
}

/// File-backed store using a JSON document
#[derive(Debug, Clone)]
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    /// Create a store for the given file (the file need not exist yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn load(&self) -> Result<PlaybackPreferences> {
        if !self.path.exists() {
            debug!(path = ?self.path, "No stored preferences, using defaults");
            return Ok(PlaybackPreferences::default());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let document: PersistedDocument = serde_json::from_str(&raw).map_err(|e| {
            QimError::preferences(format!("Malformed preferences at {:?}: {e}", self.path))
        })?;

        Ok(document.state.sanitized())
    }

    fn save(&mut self, preferences: &PlaybackPreferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let document = PersistedDocument {
            state: *preferences,
            version: 0,
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        debug!(path = ?self.path, "Saved preferences");
        Ok(())
    }
}
