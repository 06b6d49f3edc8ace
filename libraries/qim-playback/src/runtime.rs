//! Tokio host for the playback engine
//!
//! `EngineHandle::spawn` moves a `PlaybackEngine` into its own task. Caller
//! commands, resource signals and fired timers all arrive on channels and
//! are applied one at a time, so the engine never sees concurrent mutation.

use crate::{
    engine::PlaybackEngine,
    error::{PlaybackError, Result},
    events::{PlaybackSnapshot, PlaybackStatus},
    resource::{AudioResource, ResourceEvent},
    scheduler::{Scheduler, TimerId, TimerKind},
    types::EngineConfig,
};
use qim_core::{QueueItem, RepeatMode};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Scheduler backed by `tokio::time::sleep`
///
/// Fired timers are delivered on the channel given at construction.
pub struct TokioScheduler {
    next_id: u64,
    fired: mpsc::UnboundedSender<TimerId>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    /// Create a scheduler sending fired timer ids to `fired`
    pub fn new(fired: mpsc::UnboundedSender<TimerId>) -> Self {
        Self {
            next_id: 0,
            fired,
            tasks: HashMap::new(),
        }
    }

    /// Timers not yet fired or cancelled
    pub fn pending(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerId {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let id = TimerId::new(self.next_id);
        let fired = self.fired.clone();

        trace!(timer = id.raw(), ?kind, ?delay, "Scheduling timer");
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the engine task has exited
            let _ = fired.send(id);
        });
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for task in self.tasks.values() {
            task.abort();
        }
    }
}

/// Channel a resource uses to report completion signals
#[derive(Debug, Clone)]
pub struct ResourceEventSender {
    tx: mpsc::UnboundedSender<ResourceEvent>,
}

impl ResourceEventSender {
    /// Wrap a channel; `EngineHandle::spawn` creates one for you
    pub fn new(tx: mpsc::UnboundedSender<ResourceEvent>) -> Self {
        Self { tx }
    }

    /// Report a signal; returns false once the engine task is gone
    pub fn send(&self, event: ResourceEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

enum Command {
    PlayAll {
        items: Vec<QueueItem>,
        start_index: usize,
        on_finish: Option<Box<dyn FnMut() + Send>>,
    },
    Pause,
    Resume,
    Stop,
    Next,
    Previous,
    SetVolume(f32),
    SetPlaybackRate(f32),
    SetRepeatMode(RepeatMode),
    SetShuffle(bool),
    UpdateItem {
        index: usize,
        item: QueueItem,
        reply: oneshot::Sender<Result<()>>,
    },
    Status(oneshot::Sender<PlaybackStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle to an engine running in a tokio task
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PlayAll { .. } => "PlayAll",
            Self::Pause => "Pause",
            Self::Resume => "Resume",
            Self::Stop => "Stop",
            Self::Next => "Next",
            Self::Previous => "Previous",
            Self::SetVolume(_) => "SetVolume",
            Self::SetPlaybackRate(_) => "SetPlaybackRate",
            Self::SetRepeatMode(_) => "SetRepeatMode",
            Self::SetShuffle(_) => "SetShuffle",
            Self::UpdateItem { .. } => "UpdateItem",
            Self::Status(_) => "Status",
            Self::Shutdown(_) => "Shutdown",
        };
        f.write_str(name)
    }
}

impl EngineHandle {
    /// Spawn an engine task
    ///
    /// `make_resource` receives the sender its resource must use to report
    /// `Started`/`Ended`/`Failed` signals. Must be called inside a tokio
    /// runtime.
    pub fn spawn<R, F, O>(config: EngineConfig, observer: O, make_resource: F) -> (Self, JoinHandle<()>)
    where
        R: AudioResource + 'static,
        F: FnOnce(ResourceEventSender) -> R,
        O: FnMut(&PlaybackSnapshot) + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (resource_tx, resource_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        let resource = make_resource(ResourceEventSender::new(resource_tx));
        let engine = PlaybackEngine::new(resource, TokioScheduler::new(timer_tx), config, observer);
        let task = tokio::spawn(run_engine(engine, command_rx, resource_rx, timer_rx));

        (Self { commands: command_tx }, task)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::EngineClosed)
    }

    /// Replace the queue and start at `start_index`
    pub fn play_all(&self, items: Vec<QueueItem>, start_index: usize) -> Result<()> {
        self.send(Command::PlayAll {
            items,
            start_index,
            on_finish: None,
        })
    }

    /// Like `play_all`, with a callback fired each time the queue finishes
    pub fn play_all_then<F>(&self, items: Vec<QueueItem>, start_index: usize, on_finish: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.send(Command::PlayAll {
            items,
            start_index,
            on_finish: Some(Box::new(on_finish)),
        })
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn next(&self) -> Result<()> {
        self.send(Command::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send(Command::Previous)
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(Command::SetVolume(volume))
    }

    pub fn set_playback_rate(&self, rate: f32) -> Result<()> {
        self.send(Command::SetPlaybackRate(rate))
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.send(Command::SetRepeatMode(mode))
    }

    pub fn set_shuffle(&self, shuffle: bool) -> Result<()> {
        self.send(Command::SetShuffle(shuffle))
    }

    /// Replace one queue item, e.g. once its address has been resolved
    pub async fn update_item(&self, index: usize, item: QueueItem) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::UpdateItem { index, item, reply })?;
        response.await.map_err(|_| PlaybackError::EngineClosed)?
    }

    /// Current engine status
    pub async fn status(&self) -> Result<PlaybackStatus> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Status(reply))?;
        response.await.map_err(|_| PlaybackError::EngineClosed)
    }

    /// Release the engine and wait for the task to acknowledge
    ///
    /// Fails with `EngineClosed` if the engine was already shut down.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Shutdown(reply))?;
        response.await.map_err(|_| PlaybackError::EngineClosed)
    }
}

async fn run_engine<R: AudioResource>(
    mut engine: PlaybackEngine<R, TokioScheduler>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut resource_events: mpsc::UnboundedReceiver<ResourceEvent>,
    mut timers: mpsc::UnboundedReceiver<TimerId>,
) {
    debug!("Playback engine task started");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Shutdown(reply)) => {
                    engine.cleanup();
                    let _ = reply.send(());
                    break;
                }
                Some(command) => apply_command(&mut engine, command),
                None => {
                    // Every handle dropped
                    engine.cleanup();
                    break;
                }
            },
            Some(event) = resource_events.recv() => engine.handle_resource_event(event),
            Some(id) = timers.recv() => engine.handle_timer(id),
        }
    }

    debug!("Playback engine task exited");
}

fn apply_command<R: AudioResource>(engine: &mut PlaybackEngine<R, TokioScheduler>, command: Command) {
    trace!(?command, "Applying command");

    match command {
        Command::PlayAll {
            items,
            start_index,
            on_finish,
        } => engine.play_all(items, start_index, on_finish),
        Command::Pause => engine.pause(),
        Command::Resume => engine.resume(),
        Command::Stop => engine.stop(),
        Command::Next => engine.next(),
        Command::Previous => engine.previous(),
        Command::SetVolume(volume) => engine.set_volume(volume),
        Command::SetPlaybackRate(rate) => engine.set_playback_rate(rate),
        Command::SetRepeatMode(mode) => engine.set_repeat_mode(mode),
        Command::SetShuffle(shuffle) => engine.set_shuffle(shuffle),
        Command::UpdateItem { index, item, reply } => {
            let _ = reply.send(engine.update_item(index, item));
        }
        Command::Status(reply) => {
            let _ = reply.send(engine.status());
        }
        // Handled by the loop
        Command::Shutdown(_) => {}
    }
}
