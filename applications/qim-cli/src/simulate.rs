//! Simulated playback session
//!
//! Runs the engine actor against `SimulatedResource`, a stand-in for a media
//! element driven by tokio timers. Unresolved items are resolved in the
//! background and pushed back with `update_item`, the way a UI layer feeds
//! addresses to the engine.

use crate::config::CliConfig;
use crate::error::{CliError, Result};
use qim_core::{
    AudioResolver, JsonPreferenceStore, PreferenceStore, QueueItem, RepeatMode,
    TemplateAudioResolver,
};
use qim_playback::{
    AudioResource, EngineConfig, EngineEvent, EngineHandle, PlayTicket, PlaybackSnapshot,
    PlaybackStatus, ResourceEvent, ResourceEventSender,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Timer-driven playback resource
///
/// Each play request starts after `load_delay` and ends after
/// `item_duration`. Addresses containing `fail` report a media error on
/// every attempt.
pub struct SimulatedResource {
    events: ResourceEventSender,
    item_duration: Duration,
    load_delay: Duration,
    source: Option<String>,
    paused: bool,
    request: Option<JoinHandle<()>>,
}

impl SimulatedResource {
    pub fn new(events: ResourceEventSender, item_duration: Duration, load_delay: Duration) -> Self {
        Self {
            events,
            item_duration,
            load_delay,
            source: None,
            paused: true,
            request: None,
        }
    }

    fn abort_request(&mut self) {
        if let Some(request) = self.request.take() {
            request.abort();
        }
    }
}

impl AudioResource for SimulatedResource {
    fn attach(&mut self) {
        debug!("Simulated resource attached");
    }

    fn detach(&mut self) {
        self.abort_request();
        debug!("Simulated resource detached");
    }

    fn set_source(&mut self, url: &str) {
        self.abort_request();
        self.source = Some(url.to_string());
    }

    fn clear_source(&mut self) {
        self.abort_request();
        self.source = None;
    }

    fn load(&mut self) {
        self.paused = true;
    }

    fn play(&mut self, ticket: PlayTicket) {
        self.abort_request();
        self.paused = false;

        let Some(source) = self.source.clone() else {
            return;
        };
        let events = self.events.clone();
        let (load_delay, item_duration) = (self.load_delay, self.item_duration);

        self.request = Some(tokio::spawn(async move {
            tokio::time::sleep(load_delay).await;
            if source.contains("fail") {
                events.send(ResourceEvent::media_failure(
                    ticket,
                    format!("HTTP 404 for {source}"),
                ));
                return;
            }

            events.send(ResourceEvent::Started(ticket));
            tokio::time::sleep(item_duration).await;
            events.send(ResourceEvent::Ended(ticket));
        }));
    }

    fn pause(&mut self) {
        self.abort_request();
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_volume(&mut self, volume: f32) {
        debug!(volume, "Simulated volume");
    }

    fn set_playback_rate(&mut self, rate: f32) {
        debug!(rate, "Simulated playback rate");
    }
}

impl Drop for SimulatedResource {
    fn drop(&mut self) {
        self.abort_request();
    }
}

/// What to simulate
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub surah: u32,
    pub items: usize,
    pub start: usize,
    /// Indices left without an address, resolved in the background
    pub unresolved: BTreeSet<usize>,
    /// Indices given an address that always fails
    pub failing: BTreeSet<usize>,
    pub repeat: Option<RepeatMode>,
    pub shuffle: Option<bool>,
}

impl Default for SimulationPlan {
    fn default() -> Self {
        Self {
            surah: 1,
            items: 7,
            start: 0,
            unresolved: BTreeSet::new(),
            failing: BTreeSet::new(),
            repeat: None,
            shuffle: None,
        }
    }
}

impl SimulationPlan {
    fn validate(&self) -> Result<()> {
        if self.items == 0 {
            return Err(CliError::Simulation("queue must not be empty".to_string()));
        }
        if let Some(index) = self
            .unresolved
            .iter()
            .chain(&self.failing)
            .find(|&&index| index >= self.items)
        {
            return Err(CliError::Simulation(format!(
                "index {index} is outside a queue of {} items",
                self.items
            )));
        }
        Ok(())
    }
}

/// Outcome of a simulated session
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Whether the completion callback fired before the time limit
    pub finished: bool,
    pub events: Vec<EngineEvent>,
    pub status: PlaybackStatus,
}

impl SimulationReport {
    pub fn skipped(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, EngineEvent::ItemSkipped { .. }))
            .count()
    }

    pub fn started(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, EngineEvent::ItemStarted { .. }))
            .count()
    }
}

/// Build the queue for `plan`, resolving every item not marked unresolved
pub fn build_queue(
    plan: &SimulationPlan,
    resolver: &TemplateAudioResolver,
    edition: &str,
) -> Result<Vec<QueueItem>> {
    (0..plan.items)
        .map(|index| {
            let ayah = index as u32 + 1;
            let reference = format!("{}:{ayah}", plan.surah);
            let item = QueueItem::new(
                reference.clone(),
                plan.surah,
                ayah,
                format!("Surah {} ayah {ayah}", plan.surah),
            );

            if plan.failing.contains(&index) {
                Ok(item.with_audio_url(format!(
                    "https://fail.invalid/{}/{ayah}.mp3",
                    plan.surah
                )))
            } else if plan.unresolved.contains(&index) {
                Ok(item)
            } else {
                Ok(item.with_audio_url(resolver.expand(edition, &reference)?))
            }
        })
        .collect()
}

/// Run a simulated session to completion (or the configured time limit)
pub async fn run_simulation(config: &CliConfig, plan: &SimulationPlan) -> Result<SimulationReport> {
    plan.validate()?;

    let resolver = config.audio_resolver()?;
    let queue = build_queue(plan, &resolver, &config.resolver.edition)?;

    let mut engine_config: EngineConfig = config.playback.clone();
    if let Some(file) = &config.preferences.file {
        let preferences = JsonPreferenceStore::new(file).load()?;
        debug!(?preferences, "Applying stored preferences");
        engine_config = engine_config.with_preferences(&preferences);
    }
    if let Some(repeat) = plan.repeat {
        engine_config.repeat = repeat;
    }
    if let Some(shuffle) = plan.shuffle {
        engine_config.shuffle = shuffle;
    }

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let observer = move |snapshot: &PlaybackSnapshot| {
        let reference = snapshot
            .current_item()
            .map(|item| item.reference.as_str())
            .unwrap_or("-");
        info!(
            state = ?snapshot.state,
            index = snapshot.current_index,
            %reference,
            event = ?snapshot.event,
            "Playback update"
        );
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot.event.clone());
    };

    let item_duration = Duration::from_millis(config.simulation.item_ms);
    let load_delay = Duration::from_millis(config.simulation.load_ms);
    let (handle, task) = EngineHandle::spawn(engine_config, observer, |sender| {
        SimulatedResource::new(sender, item_duration, load_delay)
    });

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    info!(items = queue.len(), start = plan.start, "Starting simulated session");
    handle.play_all_then(queue.clone(), plan.start, move || {
        let _ = done_tx.send(());
    })?;

    let resolutions = spawn_resolutions(&handle, &resolver, config, plan, &queue);

    let limit = Duration::from_millis(config.simulation.max_ms);
    let finished = tokio::time::timeout(limit, done_rx.recv())
        .await
        .is_ok_and(|done| done.is_some());
    if !finished {
        warn!(limit_ms = config.simulation.max_ms, "Session did not finish in time, stopping");
    }

    let status = handle.status().await?;
    for resolution in resolutions {
        resolution.abort();
    }
    handle.shutdown().await?;
    task.await?;

    let events = std::mem::take(&mut *events.lock().unwrap_or_else(PoisonError::into_inner));
    Ok(SimulationReport {
        finished,
        events,
        status,
    })
}

/// Resolve each unresolved item after a staggered delay and hand it to the
/// engine
fn spawn_resolutions(
    handle: &EngineHandle,
    resolver: &TemplateAudioResolver,
    config: &CliConfig,
    plan: &SimulationPlan,
    queue: &[QueueItem],
) -> Vec<JoinHandle<()>> {
    plan.unresolved
        .iter()
        .enumerate()
        .map(|(order, &index)| {
            let handle = handle.clone();
            let resolver = resolver.clone();
            let edition = config.resolver.edition.clone();
            let item = queue[index].clone();
            let delay = Duration::from_millis(config.resolver.latency_ms * (order as u64 + 1));

            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                match resolver.resolve_audio(&edition, &item.reference).await {
                    Ok(url) => {
                        debug!(index, %url, "Resolved audio address");
                        if let Err(e) = handle.update_item(index, item.with_audio_url(url)).await {
                            warn!(index, error = %e, "Could not deliver resolved item");
                        }
                    }
                    Err(e) => warn!(index, error = %e, "Audio resolution failed"),
                }
            })
        })
        .collect()
}
