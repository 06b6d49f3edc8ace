//! Playback engine - core orchestration
//!
//! Sequences a queue of recitation items through one `AudioResource`:
//! loads and starts the current item, advances on natural completion,
//! retries failed addresses with backoff before skipping them, and pushes a
//! snapshot to the observer after every transition.
//!
//! ```text
//!            play_all/next/previous
//!   Idle ──────────────┬──────────────▶ Awaiting ──update_item──┐
//!                      └──────────────▶ Loading ◀───────────────┘
//!                                          │ Started
//!                  Ended ┌──────────────── Playing ◀──resume── Paused
//!        (next index)    ▼                 │ Failed
//!   Loading ◀── advance ─┴─▶ Finished      ▼
//!                                        Error ──timer──▶ Loading
//!                                          └──exhausted──▶ skip (advance)
//! ```
//!
//! The engine is a plain state machine: it never blocks, spawns or reads a
//! clock. Resource completion signals arrive through
//! [`PlaybackEngine::handle_resource_event`] and fired timers through
//! [`PlaybackEngine::handle_timer`]. See `runtime` for a tokio host.

use crate::{
    error::{PlaybackError, Result},
    events::{EngineEvent, FinishCallback, Observer, PlaybackSnapshot, PlaybackStatus},
    queue::Queue,
    resource::{AudioResource, FailureKind, PlayTicket, ResourceEvent},
    retry::{RetryDecision, RetryTracker},
    scheduler::{Scheduler, TimerId, TimerKind},
    types::{EngineConfig, PlayerState},
    volume::{PlaybackRate, Volume},
};
use qim_core::{QueueItem, RepeatMode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Sequential playback engine
///
/// Owns the queue, the controller state and the single playback resource.
/// All mutation goes through `&mut self`, so callers on threaded platforms
/// must serialize access (see `runtime::EngineHandle`).
///
/// After [`cleanup`](Self::cleanup) the engine is released: every operation
/// becomes a no-op and getters report an empty, idle engine.
pub struct PlaybackEngine<R: AudioResource, S: Scheduler> {
    resource: R,
    scheduler: S,
    observer: Option<Observer>,
    on_finish: Option<FinishCallback>,

    queue: Queue,
    state: PlayerState,

    // Settings
    volume: Volume,
    playback_rate: PlaybackRate,
    repeat: RepeatMode,
    shuffle: bool,

    // Retry/backoff
    retries: RetryTracker,
    pending_retry: Option<TimerId>,
    skips_since_start: usize,

    // play_all debounce
    debounce: Option<TimerId>,
    debounce_window: Duration,

    // Generation of the latest play request
    ticket: PlayTicket,
    source_bound: bool,
    item_started: bool,

    released: bool,
    rng: StdRng,
}

impl<R: AudioResource, S: Scheduler> PlaybackEngine<R, S> {
    /// Create an engine and bind the resource's listeners
    ///
    /// `observer` receives every state snapshot until `cleanup()`.
    pub fn new<F>(mut resource: R, scheduler: S, config: EngineConfig, observer: F) -> Self
    where
        F: FnMut(&PlaybackSnapshot) + Send + 'static,
    {
        let volume = Volume::new(config.volume);
        let playback_rate = PlaybackRate::new(config.playback_rate);

        resource.attach();
        resource.set_volume(volume.level());
        resource.set_playback_rate(playback_rate.get());

        Self {
            resource,
            scheduler,
            observer: Some(Box::new(observer)),
            on_finish: None,
            queue: Queue::new(),
            state: PlayerState::Idle,
            volume,
            playback_rate,
            repeat: config.repeat,
            shuffle: config.shuffle,
            retries: RetryTracker::new(config.max_retries, config.retry_base_delay()),
            pending_retry: None,
            skips_since_start: 0,
            debounce: None,
            debounce_window: config.debounce_window(),
            ticket: PlayTicket::new(0),
            source_bound: false,
            item_started: false,
            released: false,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed seed for shuffle selection
    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ===== Playback Control =====

    /// Replace the queue and start playing at `start_index`
    ///
    /// `start_index` is clamped to the last item; an empty queue is ignored.
    /// A call targeting the queue and index already playing is dropped, and
    /// any call inside the debounce window of the previous one is dropped too.
    pub fn play_all(
        &mut self,
        items: Vec<QueueItem>,
        start_index: usize,
        on_finish: Option<FinishCallback>,
    ) {
        if self.ignored_after_release("play_all") {
            return;
        }

        if items.is_empty() {
            debug!("play_all with empty queue ignored");
            return;
        }

        let target = start_index.min(items.len() - 1);
        if self.is_playing()
            && self.queue.current_index() == target
            && self.queue.same_sequence(&items)
        {
            debug!(index = target, "Already playing this queue at this index");
            return;
        }

        if self.debounce.is_some() {
            debug!("play_all suppressed inside debounce window");
            return;
        }
        if !self.debounce_window.is_zero() {
            self.debounce = Some(
                self.scheduler
                    .schedule(self.debounce_window, TimerKind::DebounceRearm),
            );
        }

        info!(count = items.len(), start_index = target, "Replacing queue");

        self.queue.replace(items, target);
        self.retries.reset();
        self.skips_since_start = 0;
        self.on_finish = on_finish;

        self.load_current(Some(EngineEvent::QueueReplaced {
            start_index: target,
        }));
    }

    /// Pause playback
    ///
    /// Applies whenever the engine intends to play (including while loading,
    /// awaiting an address or waiting on a retry). No-op otherwise.
    pub fn pause(&mut self) {
        if self.ignored_after_release("pause") {
            return;
        }

        if !self.state.is_active() {
            debug!(state = ?self.state, "pause ignored");
            return;
        }

        self.invalidate();
        self.pause_resource();
        self.state = PlayerState::Paused;
        self.notify(EngineEvent::Paused);
    }

    /// Resume after `pause`, or restart the current item after the queue
    /// finished
    ///
    /// A paused item that had started continues from its position; one that
    /// never started is loaded again.
    pub fn resume(&mut self) {
        if self.ignored_after_release("resume") {
            return;
        }

        match self.state {
            PlayerState::Paused if self.item_started && self.source_bound => {
                self.state = PlayerState::Playing;
                self.resource.play(self.ticket);
                self.notify(EngineEvent::Resumed);
            }
            PlayerState::Paused => self.load_current(Some(EngineEvent::Resumed)),
            PlayerState::Finished if !self.queue.is_empty() => {
                self.load_current(Some(EngineEvent::Resumed));
            }
            state => debug!(?state, "resume ignored"),
        }
    }

    /// Clear the queue and release the resource
    ///
    /// Safe to call repeatedly and with nothing loaded.
    pub fn stop(&mut self) {
        if self.ignored_after_release("stop") {
            return;
        }

        self.invalidate();
        self.release_source();
        self.queue.clear();
        self.retries.reset();
        self.skips_since_start = 0;
        self.item_started = false;
        self.state = PlayerState::Idle;

        info!("Playback stopped");
        self.notify(EngineEvent::Stopped);
    }

    /// Skip to the next item
    ///
    /// Always sequential; repeat and shuffle only govern automatic advance.
    /// Past the last item the queue finishes.
    pub fn next(&mut self) {
        if self.ignored_after_release("next") || self.queue.is_empty() {
            return;
        }

        match self.queue.manual_next_index() {
            Some(index) => {
                self.skips_since_start = 0;
                self.queue.set_current(index);
                self.load_current(None);
            }
            None if self.state == PlayerState::Finished => debug!("next ignored, finished"),
            None => self.finish(),
        }
    }

    /// Go back one item; no-op at the first item
    pub fn previous(&mut self) {
        if self.ignored_after_release("previous") || self.queue.is_empty() {
            return;
        }

        if self.queue.current_index() == 0 {
            debug!("previous ignored at first item");
            return;
        }

        let index = self.queue.previous_index();
        self.skips_since_start = 0;
        self.queue.set_current(index);
        self.load_current(None);
    }

    /// Tear the engine down: stop, cancel timers, unbind the resource's
    /// listeners and drop the observer and completion callback
    ///
    /// The engine is unusable afterwards; later calls (including a second
    /// `cleanup`) are no-ops.
    pub fn cleanup(&mut self) {
        if self.ignored_after_release("cleanup") {
            return;
        }

        self.stop();
        if let Some(id) = self.debounce.take() {
            self.scheduler.cancel(id);
        }
        self.resource.detach();
        self.on_finish = None;
        self.observer = None;
        self.released = true;

        info!("Playback engine released");
    }

    // ===== Queue Updates =====

    /// Replace the item at `index`
    ///
    /// This is how resolved addresses reach the engine: if the engine is
    /// waiting on this item, playback starts right away.
    pub fn update_item(&mut self, index: usize, item: QueueItem) -> Result<()> {
        if self.ignored_after_release("update_item") {
            return Ok(());
        }

        let len = self.queue.len();
        if self.queue.update(index, item).is_none() {
            return Err(PlaybackError::IndexOutOfBounds { index, len });
        }

        let resolved_current = index == self.queue.current_index()
            && self
                .queue
                .current_item()
                .is_some_and(QueueItem::is_resolved);

        if self.state == PlayerState::Awaiting && resolved_current {
            debug!(index, "Awaited item resolved");
            self.load_current(None);
        } else {
            self.notify(EngineEvent::ItemUpdated { index });
        }
        Ok(())
    }

    // ===== Settings =====

    /// Set volume, clamped to 0.0-1.0 (NaN is ignored)
    pub fn set_volume(&mut self, volume: f32) {
        if self.ignored_after_release("set_volume") {
            return;
        }

        if self.volume.set_level(volume) {
            self.resource.set_volume(self.volume.level());
        } else {
            warn!(volume, "Ignoring invalid volume");
        }
    }

    /// Set playback rate (must be positive and finite)
    pub fn set_playback_rate(&mut self, rate: f32) {
        if self.ignored_after_release("set_playback_rate") {
            return;
        }

        if self.playback_rate.set(rate) {
            self.resource.set_playback_rate(rate);
        } else {
            warn!(rate, "Ignoring invalid playback rate");
        }
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        if !self.ignored_after_release("set_repeat_mode") {
            self.repeat = mode;
        }
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        if !self.ignored_after_release("set_shuffle") {
            self.shuffle = shuffle;
        }
    }

    // ===== Resource & Timer Signals =====

    /// Feed a completion signal from the resource
    ///
    /// Signals for an abandoned request (older ticket) and interruptions the
    /// engine caused itself are dropped without a trace beyond a debug log.
    pub fn handle_resource_event(&mut self, event: ResourceEvent) {
        if self.released {
            return;
        }

        if event.ticket() != self.ticket {
            debug!(?event, current = self.ticket.generation(), "Dropping stale resource event");
            return;
        }

        match event {
            ResourceEvent::Started(_) => {
                if self.state == PlayerState::Loading {
                    self.state = PlayerState::Playing;
                    self.item_started = true;
                    self.skips_since_start = 0;
                    let index = self.queue.current_index();
                    self.notify(EngineEvent::ItemStarted { index });
                }
            }
            ResourceEvent::Ended(_) => {
                if self.state == PlayerState::Playing {
                    debug!(index = self.queue.current_index(), "Item ended, advancing");
                    self.advance();
                }
            }
            ResourceEvent::Failed {
                kind: FailureKind::Interrupted,
                ..
            } => {
                debug!("Playback interrupted");
            }
            ResourceEvent::Failed { message, .. } => {
                if matches!(self.state, PlayerState::Loading | PlayerState::Playing) {
                    self.handle_failure(&message);
                } else {
                    debug!(state = ?self.state, %message, "Failure outside playback ignored");
                }
            }
        }
    }

    /// Deliver a fired timer
    pub fn handle_timer(&mut self, id: TimerId) {
        if self.debounce == Some(id) {
            self.debounce = None;
            return;
        }

        if self.pending_retry == Some(id) {
            self.pending_retry = None;
            if self.state == PlayerState::Error && !self.released {
                info!(index = self.queue.current_index(), "Retrying item");
                self.load_current(None);
            }
            return;
        }

        debug!(timer = id.raw(), "Ignoring unknown timer");
    }

    // ===== State Queries =====

    pub fn current_index(&self) -> usize {
        self.queue.current_index()
    }

    /// Items in playback order
    pub fn queue(&self) -> &[QueueItem] {
        self.queue.items()
    }

    /// Whether audio is progressing or about to
    pub fn is_playing(&self) -> bool {
        self.state.is_active()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn volume(&self) -> f32 {
        self.volume.level()
    }

    pub fn playback_rate(&self) -> f32 {
        self.playback_rate.get()
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Whether `cleanup()` has run
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Everything a caller may query, in one value
    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            is_playing: self.is_playing(),
            current_index: self.queue.current_index(),
            queue: self.queue.shared(),
            volume: self.volume.level(),
            playback_rate: self.playback_rate.get(),
            repeat: self.repeat,
            shuffle: self.shuffle,
        }
    }

    /// The underlying resource
    pub fn resource(&self) -> &R {
        &self.resource
    }

    // ===== Internal =====

    /// Bind the current item to the resource and request playback
    ///
    /// Items without an address park the engine in `Awaiting`.
    fn load_current(&mut self, event: Option<EngineEvent>) {
        self.invalidate();
        self.item_started = false;

        let index = self.queue.current_index();
        let Some(item) = self.queue.current_item() else {
            self.finish();
            return;
        };

        let url = item.audio_url.clone().filter(|url| !url.is_empty());
        match url {
            None => {
                debug!(index, reference = %item.reference, "Awaiting audio address");
                self.release_source();
                self.state = PlayerState::Awaiting;
                self.notify(event.unwrap_or(EngineEvent::ItemAwaiting { index }));
            }
            Some(url) => {
                debug!(index, reference = %item.reference, "Loading item");
                self.pause_resource();
                self.resource.set_source(&url);
                self.resource.load();
                self.source_bound = true;
                self.state = PlayerState::Loading;
                self.resource.play(self.ticket);
                self.notify(event.unwrap_or(EngineEvent::ItemLoading { index }));
            }
        }
    }

    fn advance(&mut self) {
        match self
            .queue
            .next_index(self.repeat, self.shuffle, &mut self.rng)
        {
            Some(index) => {
                self.queue.set_current(index);
                self.load_current(None);
            }
            None => self.finish(),
        }
    }

    /// Resource failure while loading or playing the current item
    fn handle_failure(&mut self, message: &str) {
        let index = self.queue.current_index();
        let Some(item) = self.queue.current_item() else {
            return;
        };
        let Some(url) = item.audio_url.clone() else {
            return;
        };
        let reference = item.reference.clone();

        // Late signals from the failed request must not act again
        self.invalidate();
        // A failed source cannot be resumed in place
        self.item_started = false;

        match self.retries.record_failure(&url) {
            RetryDecision::Retry { attempt, delay } => {
                warn!(
                    index,
                    %reference,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %message,
                    "Playback failed, retrying"
                );
                self.state = PlayerState::Error;
                self.pending_retry = Some(self.scheduler.schedule(delay, TimerKind::Retry));
                self.notify(EngineEvent::RetryScheduled {
                    index,
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                });
            }
            RetryDecision::Exhausted { attempts } => {
                error!(index, %reference, attempts, %message, "Retries exhausted, skipping item");
                self.state = PlayerState::Error;
                self.notify(EngineEvent::ItemSkipped {
                    index,
                    reference,
                    attempts,
                });
                self.skip_failed(index);
            }
        }
    }

    /// Advance past an item that cannot be played
    ///
    /// Finishes instead when the advance policy lands on the same item again
    /// (repeat-item, or a one-item queue), or when a full lap of the queue
    /// has been skipped without any item starting.
    fn skip_failed(&mut self, failed_index: usize) {
        self.skips_since_start += 1;
        if self.skips_since_start >= self.queue.len() {
            warn!(skipped = self.skips_since_start, "No playable item left in queue");
            self.finish();
            return;
        }

        match self
            .queue
            .next_index(self.repeat, self.shuffle, &mut self.rng)
        {
            Some(index) if index != failed_index => {
                self.queue.set_current(index);
                self.load_current(None);
            }
            _ => self.finish(),
        }
    }

    fn finish(&mut self) {
        self.invalidate();
        self.state = PlayerState::Finished;
        info!(index = self.queue.current_index(), "Queue finished");
        self.notify(EngineEvent::Finished);

        if let Some(on_finish) = self.on_finish.as_mut() {
            on_finish();
        }
    }

    /// Cancel a pending retry and abandon the in-flight play request
    fn invalidate(&mut self) {
        if let Some(id) = self.pending_retry.take() {
            self.scheduler.cancel(id);
        }
        self.ticket = self.ticket.bumped();
    }

    fn pause_resource(&mut self) {
        if self.source_bound && !self.resource.is_paused() {
            self.resource.pause();
        }
    }

    fn release_source(&mut self) {
        if self.source_bound {
            self.pause_resource();
            self.resource.clear_source();
            self.source_bound = false;
        }
    }

    fn notify(&mut self, event: EngineEvent) {
        let snapshot = PlaybackSnapshot {
            is_playing: self.is_playing(),
            current_index: self.queue.current_index(),
            queue: self.queue.shared(),
            state: self.state,
            event,
        };

        if let Some(observer) = self.observer.as_mut() {
            observer(&snapshot);
        }
    }

    fn ignored_after_release(&self, operation: &str) -> bool {
        if self.released {
            debug!(operation, "Engine released, ignoring call");
        }
        self.released
    }
}
