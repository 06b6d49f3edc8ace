//! Injectable timers
//!
//! The engine never sleeps or reads a clock. It asks a `Scheduler` for a
//! timer and the host hands the `TimerId` back through
//! `PlaybackEngine::handle_timer` when it fires. `ManualScheduler` runs on
//! virtual time so retry and debounce behavior can be tested step by step.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Handle for a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Wrap a raw id (for scheduler implementations)
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Why a timer was scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Backoff before retrying a failed item
    Retry,

    /// End of the `play_all` debounce window
    DebounceRearm,
}

/// Timer source used by the engine
pub trait Scheduler: Send {
    /// Arrange for `id` to be delivered back after `delay`
    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerId;

    /// Cancel a pending timer; unknown or fired ids are ignored
    fn cancel(&mut self, id: TimerId);
}

#[derive(Debug, Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    // Ordered by (deadline, id) so equal deadlines fire in scheduling order
    pending: BTreeMap<(Duration, TimerId), TimerKind>,
}

/// Virtual-time scheduler
///
/// Clones share the same clock, so a test can keep one handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<ManualClock>>,
}

impl ManualScheduler {
    /// Create a scheduler at time zero
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move time forward and return the timers that came due, in order
    pub fn advance(&self, by: Duration) -> Vec<TimerId> {
        let mut clock = self.lock();
        clock.now += by;
        let now = clock.now;

        let due: Vec<(Duration, TimerId)> = clock
            .pending
            .keys()
            .take_while(|(deadline, _)| *deadline <= now)
            .copied()
            .collect();

        due.into_iter()
            .map(|key| {
                clock.pending.remove(&key);
                key.1
            })
            .collect()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of timers still waiting to fire
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Kinds of the pending timers, soonest first
    pub fn pending_kinds(&self) -> Vec<TimerKind> {
        self.lock().pending.values().copied().collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerId {
        let mut clock = self.lock();
        clock.next_id += 1;
        let id = TimerId(clock.next_id);
        let deadline = clock.now.saturating_add(delay);
        clock.pending.insert((deadline, id), kind);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.lock().pending.retain(|(_, pending), _| *pending != id);
    }
}
