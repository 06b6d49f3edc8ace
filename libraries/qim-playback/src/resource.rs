//! Platform-agnostic playback resource
//!
//! Abstracts the one audio element/player the engine drives (an
//! `HtmlAudioElement`, a native media player, a decoder sink...). Calls into
//! the resource never block; the resource reports progress later as
//! `ResourceEvent`s, which the host feeds to
//! `PlaybackEngine::handle_resource_event`.

use serde::{Deserialize, Serialize};

/// Identifies one `play` request
///
/// The engine bumps the ticket on every stop, pause, track switch and
/// reload. Events carrying an older ticket belong to a request the engine
/// already abandoned and are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayTicket(u64);

impl PlayTicket {
    /// Wrap a raw generation value
    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// Raw generation value
    pub fn generation(self) -> u64 {
        self.0
    }

    pub(crate) fn bumped(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Failure category reported by the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The request was aborted by a newer engine request (pause, switch)
    Interrupted,

    /// Network, decode or playback failure
    Media,
}

/// Completion signal from the resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceEvent {
    /// The request for `ticket` started producing audio
    Started(PlayTicket),

    /// The item bound under `ticket` played to its end
    Ended(PlayTicket),

    /// The request for `ticket` failed
    Failed {
        ticket: PlayTicket,
        kind: FailureKind,
        message: String,
    },
}

impl ResourceEvent {
    /// Ticket the event refers to
    pub fn ticket(&self) -> PlayTicket {
        match self {
            Self::Started(ticket) | Self::Ended(ticket) => *ticket,
            Self::Failed { ticket, .. } => *ticket,
        }
    }

    /// Convenience constructor for a media failure
    pub fn media_failure(ticket: PlayTicket, message: impl Into<String>) -> Self {
        Self::Failed {
            ticket,
            kind: FailureKind::Media,
            message: message.into(),
        }
    }
}

/// The single underlying playback resource
///
/// Exclusively owned by the engine; nothing else may change its source,
/// volume or rate.
pub trait AudioResource: Send {
    /// Bind event listeners. Called exactly once, by the engine constructor.
    fn attach(&mut self);

    /// Unbind event listeners. Called exactly once, by `cleanup()`.
    fn detach(&mut self);

    /// Assign a new source address
    fn set_source(&mut self, url: &str);

    /// Drop the current source so nothing can keep sounding
    fn clear_source(&mut self);

    /// Begin loading the assigned source
    fn load(&mut self);

    /// Start or continue playback; outcome arrives as a `ResourceEvent`
    /// tagged with `ticket`
    fn play(&mut self, ticket: PlayTicket);

    /// Pause playback, keeping the position
    fn pause(&mut self);

    /// Whether the resource is currently paused (or never started)
    fn is_paused(&self) -> bool;

    /// Apply output volume (0.0-1.0)
    fn set_volume(&mut self, volume: f32);

    /// Apply playback speed multiplier
    fn set_playback_rate(&mut self, rate: f32);
}
