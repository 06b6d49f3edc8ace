//! Collaborator traits consumed by the playback engine's hosts
use crate::error::Result;
use crate::types::PlaybackPreferences;
use async_trait::async_trait;

/// Audio resolution service
///
/// Turns a recitation edition (e.g. `ar.alafasy`) and a reference (`"2:255"`
/// or an absolute ayah/surah number) into a playable address.
///
/// The engine never calls this directly. Hosts resolve pending items and
/// hand the result back to the engine as a queue-item update.
#[async_trait]
pub trait AudioResolver: Send + Sync {
    /// Resolve the playable address for one reference
    ///
    /// # Errors
    /// Returns `QimError::Resolution` if no address can be produced
    async fn resolve_audio(&self, edition: &str, reference: &str) -> Result<String>;
}

/// Persisted playback defaults (volume, rate, repeat, shuffle)
pub trait PreferenceStore: Send {
    /// Load stored preferences, falling back to defaults when nothing is stored
    fn load(&self) -> Result<PlaybackPreferences>;

    /// Persist preferences
    fn save(&mut self, preferences: &PlaybackPreferences) -> Result<()>;
}
