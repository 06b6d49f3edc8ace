//! State notifications
//!
//! After every state-affecting operation the engine hands one immutable
//! `PlaybackSnapshot` to the observer registered at construction. The
//! observer is the engine's only link to UI and persistence layers.

use crate::types::PlayerState;
use qim_core::{QueueItem, RepeatMode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What caused a snapshot to be emitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A new queue was installed
    QueueReplaced {
        /// Clamped start index
        start_index: usize,
    },

    /// The resource is loading the item at `index`
    ItemLoading { index: usize },

    /// The item at `index` has no address yet; waiting for a resolver update
    ItemAwaiting { index: usize },

    /// The resource acknowledged start of the item at `index`
    ItemStarted { index: usize },

    /// An item in the queue was replaced
    ItemUpdated { index: usize },

    /// A failed item will be retried
    RetryScheduled {
        /// Item index
        index: usize,
        /// 1-based retry number
        attempt: u32,
        /// Backoff before the retry
        delay_ms: u64,
    },

    /// Retries exhausted; the item was skipped (non-fatal)
    ItemSkipped {
        /// Index of the skipped item
        index: usize,
        /// Reference of the skipped item
        reference: String,
        /// Retries spent before giving up
        attempts: u32,
    },

    /// Playback paused
    Paused,

    /// Playback resumed
    Resumed,

    /// End of queue reached
    Finished,

    /// Queue cleared and resource released
    Stopped,
}

/// Read-only view of engine state
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    /// Whether audio is progressing or about to
    pub is_playing: bool,

    /// Current queue position
    pub current_index: usize,

    /// Queue contents at the time of the snapshot
    pub queue: Arc<Vec<QueueItem>>,

    /// Controller state
    pub state: PlayerState,

    /// Transition that produced this snapshot
    pub event: EngineEvent,
}

impl PlaybackSnapshot {
    /// Item at `current_index`, if the queue is non-empty
    pub fn current_item(&self) -> Option<&QueueItem> {
        self.queue.get(self.current_index)
    }
}

/// Point-in-time engine status for queries
#[derive(Debug, Clone)]
pub struct PlaybackStatus {
    pub state: PlayerState,
    pub is_playing: bool,
    pub current_index: usize,
    pub queue: Arc<Vec<QueueItem>>,
    pub volume: f32,
    pub playback_rate: f32,
    pub repeat: RepeatMode,
    pub shuffle: bool,
}

/// Observer receiving every snapshot
pub type Observer = Box<dyn FnMut(&PlaybackSnapshot) + Send>;

/// Callback fired when the queue finishes
pub type FinishCallback = Box<dyn FnMut() + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_current_item() {
        let queue = Arc::new(vec![
            QueueItem::new("1:1", 1, 1, "a"),
            QueueItem::new("1:2", 1, 2, "b"),
        ]);
        let snapshot = PlaybackSnapshot {
            is_playing: true,
            current_index: 1,
            queue,
            state: PlayerState::Awaiting,
            event: EngineEvent::ItemAwaiting { index: 1 },
        };

        assert_eq!(snapshot.current_item().unwrap().reference, "1:2");
    }

    #[test]
    fn skip_event_serializes() {
        let event = EngineEvent::ItemSkipped {
            index: 3,
            reference: "2:4".to_string(),
            attempts: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ItemSkipped"));

        let back: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
