//! Qim Player Playback Engine
//!
//! Platform-agnostic sequential playback of recitation queues.
//!
//! # Features
//!
//! - Queue sequencing with repeat (off / item / all) and shuffle
//! - Items awaiting audio-address resolution, started on `update_item`
//! - Per-address retry with exponential backoff, then skip
//! - Debounced, idempotent `play_all`
//! - Snapshot notifications after every transition
//! - Injectable timer source (`Scheduler`) and playback resource
//!   (`AudioResource`)
//!
//! # Example
//!
//! ```rust,ignore
//! use qim_playback::{EngineConfig, ManualScheduler, PlaybackEngine};
//!
//! let mut engine = PlaybackEngine::new(resource, ManualScheduler::new(), EngineConfig::default(), |snapshot| {
//!     println!("{:?} at {}", snapshot.state, snapshot.current_index);
//! });
//!
//! engine.play_all(items, 0, None);
//! ```

pub mod engine;
pub mod error;
pub mod events;
pub mod queue;
pub mod resource;
pub mod retry;
#[cfg(feature = "runtime")]
pub mod runtime;
pub mod scheduler;
pub mod shuffle;
pub mod types;
pub mod volume;

pub use engine::PlaybackEngine;
pub use error::{PlaybackError, Result};
pub use events::{EngineEvent, FinishCallback, Observer, PlaybackSnapshot, PlaybackStatus};
pub use queue::Queue;
pub use resource::{AudioResource, FailureKind, PlayTicket, ResourceEvent};
pub use retry::{RetryDecision, RetryTracker};
#[cfg(feature = "runtime")]
pub use runtime::{EngineHandle, ResourceEventSender, TokioScheduler};
pub use scheduler::{ManualScheduler, Scheduler, TimerId, TimerKind};
pub use types::{EngineConfig, PlayerState};
pub use volume::{PlaybackRate, Volume};

// Re-export core types for convenience
pub use qim_core::{QueueItem, RepeatMode};
