//! Queue manager
//!
//! Holds the ordered list of recitation items and the current position, and
//! decides where playback goes next.
//!
//! ```text
//!   0: 1:1  ─┐
//!   1: 1:2   │ insertion order = playback order
//! ▶ 2: 1:3   │ (current)
//!   3: 1:4  ─┘
//! ```

use crate::shuffle::pick_other_index;
use qim_core::{QueueItem, RepeatMode};
use rand::Rng;
use std::sync::Arc;

/// Ordered playback queue with a current index
///
/// Items live behind an `Arc` so state snapshots can share them without
/// copying; mutation goes through `Arc::make_mut`.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    items: Arc<Vec<QueueItem>>,
    current: usize,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new list and starting index
    ///
    /// `start` is clamped to the last item. Returns `false` (and leaves the
    /// queue untouched) when `items` is empty.
    pub fn replace(&mut self, items: Vec<QueueItem>, start: usize) -> bool {
        if items.is_empty() {
            return false;
        }

        self.current = start.min(items.len() - 1);
        self.items = Arc::new(items);
        true
    }

    /// Drop all items and reset the position
    pub fn clear(&mut self) {
        self.items = Arc::new(Vec::new());
        self.current = 0;
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current position (meaningless when empty)
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Item at the current position
    pub fn current_item(&self) -> Option<&QueueItem> {
        self.items.get(self.current)
    }

    /// Items in playback order
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    /// Shared handle to the items for snapshots
    pub fn shared(&self) -> Arc<Vec<QueueItem>> {
        Arc::clone(&self.items)
    }

    /// Move to `index` if it is in bounds
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    /// Replace the item at `index`, returning the previous value
    pub fn update(&mut self, index: usize, item: QueueItem) -> Option<QueueItem> {
        let slot = Arc::make_mut(&mut self.items).get_mut(index)?;
        Some(std::mem::replace(slot, item))
    }

    /// Whether `items` lists the same references in the same order
    ///
    /// Audio addresses are ignored: a queue whose items were resolved since
    /// it was installed is still the same queue.
    pub fn same_sequence(&self, items: &[QueueItem]) -> bool {
        self.items.len() == items.len()
            && self
                .items
                .iter()
                .zip(items)
                .all(|(held, other)| held.reference == other.reference)
    }

    /// Index to play after the current item completes on its own
    ///
    /// - `RepeatMode::Item` stays put
    /// - shuffle picks a random other index (never signals end-of-queue)
    /// - otherwise steps forward, wrapping only under `RepeatMode::All`
    ///
    /// `None` means end-of-queue.
    pub fn next_index<R: Rng + ?Sized>(
        &self,
        repeat: RepeatMode,
        shuffle: bool,
        rng: &mut R,
    ) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }

        if repeat == RepeatMode::Item {
            return Some(self.current);
        }

        if shuffle {
            return Some(pick_other_index(self.items.len(), self.current, rng));
        }

        let next = self.current + 1;
        if next < self.items.len() {
            Some(next)
        } else if repeat == RepeatMode::All {
            Some(0)
        } else {
            None
        }
    }

    /// Index for an explicit "next" request: plain sequential step
    pub fn manual_next_index(&self) -> Option<usize> {
        let next = self.current + 1;
        (next < self.items.len()).then_some(next)
    }

    /// Index for "previous": one step back, never wrapping
    pub fn previous_index(&self) -> usize {
        self.current.saturating_sub(1)
    }
}
