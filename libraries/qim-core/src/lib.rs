//! Qim Player Core
//!
//! Platform-agnostic types, collaborator traits and error handling shared by
//! the playback engine and the applications that host it.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `QueueItem`, `RepeatMode`, `PlaybackPreferences`
//! - **Collaborator Traits**: `AudioResolver` (address lookup for an ayah or
//!   surah) and `PreferenceStore` (persisted playback defaults)
//! - **Error Handling**: Unified `QimError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use qim_core::{QueueItem, PlaybackPreferences, RepeatMode};
//!
//! let item = QueueItem::new("1:1", 1, 1, "In the name of Allah")
//!     .with_audio_url("https://cdn.islamic.network/quran/audio/128/ar.alafasy/1.mp3");
//! assert!(item.is_resolved());
//!
//! let prefs = PlaybackPreferences::default();
//! assert_eq!(prefs.repeat, RepeatMode::Off);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod preferences;
pub mod resolver;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{QimError, Result};
pub use preferences::{JsonPreferenceStore, MemoryPreferenceStore};
pub use resolver::TemplateAudioResolver;
pub use traits::{AudioResolver, PreferenceStore};
pub use types::{PlaybackPreferences, QueueItem, RepeatMode};
