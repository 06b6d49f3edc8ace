//! Shared fixtures for playback integration tests
//!
//! `RecordingResource` logs every call the engine makes; `Harness` wires it
//! to a `ManualScheduler` and collects every snapshot.

#![allow(dead_code)]

use qim_playback::{
    AudioResource, EngineConfig, EngineEvent, ManualScheduler, PlayTicket, PlaybackEngine,
    PlaybackSnapshot, QueueItem, ResourceEvent,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ===== Recording Resource =====

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Attach,
    Detach,
    SetSource(String),
    ClearSource,
    Load,
    Play(PlayTicket),
    Pause,
    SetVolume(f32),
    SetPlaybackRate(f32),
}

#[derive(Debug, Default)]
struct ResourceLog {
    calls: Vec<Call>,
    paused: bool,
}

/// Resource whose log is shared between clones
#[derive(Debug, Clone)]
pub struct RecordingResource {
    log: Arc<Mutex<ResourceLog>>,
}

impl RecordingResource {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(ResourceLog {
                calls: Vec::new(),
                paused: true,
            })),
        }
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().calls.push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.log.lock().unwrap().calls.iter().filter(|c| matches(c)).count()
    }

    /// Addresses bound, in order
    pub fn sources(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::SetSource(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ticket of the most recent play request
    pub fn last_ticket(&self) -> PlayTicket {
        self.log
            .lock()
            .unwrap()
            .calls
            .iter()
            .rev()
            .find_map(|call| match call {
                Call::Play(ticket) => Some(*ticket),
                _ => None,
            })
            .expect("no play request recorded")
    }

    pub fn plays(&self) -> usize {
        self.count(|call| matches!(call, Call::Play(_)))
    }

    pub fn is_playing_audio(&self) -> bool {
        !self.log.lock().unwrap().paused
    }
}

impl AudioResource for RecordingResource {
    fn attach(&mut self) {
        self.record(Call::Attach);
    }

    fn detach(&mut self) {
        self.record(Call::Detach);
    }

    fn set_source(&mut self, url: &str) {
        self.record(Call::SetSource(url.to_string()));
    }

    fn clear_source(&mut self) {
        self.record(Call::ClearSource);
    }

    fn load(&mut self) {
        self.log.lock().unwrap().paused = true;
        self.record(Call::Load);
    }

    fn play(&mut self, ticket: PlayTicket) {
        self.log.lock().unwrap().paused = false;
        self.record(Call::Play(ticket));
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().paused = true;
        self.record(Call::Pause);
    }

    fn is_paused(&self) -> bool {
        self.log.lock().unwrap().paused
    }

    fn set_volume(&mut self, volume: f32) {
        self.record(Call::SetVolume(volume));
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.record(Call::SetPlaybackRate(rate));
    }
}

// ===== Items =====

pub fn audio_url(n: usize) -> String {
    format!("https://audio.example/ayah/{n}.mp3")
}

/// `count` resolved items of surah 2
pub fn create_test_items(count: usize) -> Vec<QueueItem> {
    (1..=count)
        .map(|n| {
            QueueItem::new(format!("2:{n}"), 2, n as u32, format!("Ayah {n}"))
                .with_audio_url(audio_url(n))
        })
        .collect()
}

/// `count` items with no address yet
pub fn create_unresolved_items(count: usize) -> Vec<QueueItem> {
    (1..=count)
        .map(|n| QueueItem::new(format!("2:{n}"), 2, n as u32, format!("Ayah {n}")))
        .collect()
}

// ===== Harness =====

pub struct Harness {
    pub engine: PlaybackEngine<RecordingResource, ManualScheduler>,
    pub resource: RecordingResource,
    pub clock: ManualScheduler,
    pub snapshots: Arc<Mutex<Vec<PlaybackSnapshot>>>,
    pub finished: Arc<Mutex<usize>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let resource = RecordingResource::new();
        let clock = ManualScheduler::new();
        let snapshots = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&snapshots);
        let engine = PlaybackEngine::new(resource.clone(), clock.clone(), config, move |s: &PlaybackSnapshot| {
            sink.lock().unwrap().push(s.clone());
        })
        .with_shuffle_seed(7);

        Self {
            engine,
            resource,
            clock,
            snapshots,
            finished: Arc::new(Mutex::new(0)),
        }
    }

    /// `play_all` with a completion callback counted in `finished`
    pub fn play_all(&mut self, items: Vec<QueueItem>, start_index: usize) {
        let finished = Arc::clone(&self.finished);
        self.engine.play_all(
            items,
            start_index,
            Some(Box::new(move || *finished.lock().unwrap() += 1)),
        );
    }

    pub fn finished_count(&self) -> usize {
        *self.finished.lock().unwrap()
    }

    pub fn start_current(&mut self) {
        let ticket = self.resource.last_ticket();
        self.engine.handle_resource_event(ResourceEvent::Started(ticket));
    }

    pub fn end_current(&mut self) {
        let ticket = self.resource.last_ticket();
        self.engine.handle_resource_event(ResourceEvent::Ended(ticket));
    }

    /// Start then end the current item
    pub fn play_through(&mut self) {
        self.start_current();
        self.end_current();
    }

    pub fn fail_current(&mut self) {
        let ticket = self.resource.last_ticket();
        self.engine
            .handle_resource_event(ResourceEvent::media_failure(ticket, "network error"));
    }

    /// Advance virtual time, delivering due timers to the engine
    pub fn advance_ms(&mut self, ms: u64) {
        for id in self.clock.advance(Duration::from_millis(ms)) {
            self.engine.handle_timer(id);
        }
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.snapshots
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.event.clone())
            .collect()
    }

    pub fn last_snapshot(&self) -> PlaybackSnapshot {
        self.snapshots
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no snapshot emitted")
    }

    pub fn clear_snapshots(&self) {
        self.snapshots.lock().unwrap().clear();
    }
}
