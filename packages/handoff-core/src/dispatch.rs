//! The single-threaded dispatcher's message types and sinks.
//!
//! Everything that can change core state arrives as a [`DispatchMessage`] on
//! one unbounded channel: user commands, control requests from the
//! notification proxy, remote callbacks, engine callbacks, and timer ticks.
//! The dispatcher applies them strictly one at a time, which is the only
//! synchronization the coordinator and queue mirror rely on.
//!
//! Collaborators never hold the channel directly. They receive typed sinks
//! ([`RemoteEventSink`], [`EngineEventSink`], [`ControlHandle`]) that wrap it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::engine::EngineEvent;
use crate::media::{MediaDescriptor, QueueItemId};
use crate::player::PlayerSnapshot;
use crate::remote::RemoteEvent;
use crate::services::queue_mirror::EnqueueMode;
use crate::state::{Generation, PlaybackLocation};
use crate::timer::TimerTick;

/// User-issued command, routed to the coordinator or the queue mirror.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    Play {
        media: Arc<MediaDescriptor>,
        start_position_ms: u64,
    },
    Pause,
    Resume,
    Seek {
        position_ms: u64,
    },
    Stop,
    ShowControls,
    Destroy,
    RemoveAt {
        position: usize,
    },
    RemoveAll,
    MoveItem {
        from: usize,
        to: usize,
    },
    JumpTo {
        item_id: QueueItemId,
    },
    PlayItemAt {
        position: usize,
    },
    PlayUpcoming,
    StopAfterCurrent,
    Enqueue {
        media: Arc<MediaDescriptor>,
        mode: EnqueueMode,
    },
}

impl PlayerCommand {
    /// Short command name used in logs and `CommandFailed` events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Seek { .. } => "seek",
            Self::Stop => "stop",
            Self::ShowControls => "show_controls",
            Self::Destroy => "destroy",
            Self::RemoveAt { .. } => "remove_at",
            Self::RemoveAll => "remove_all",
            Self::MoveItem { .. } => "move_item",
            Self::JumpTo { .. } => "jump_to",
            Self::PlayItemAt { .. } => "play_item_at",
            Self::PlayUpcoming => "play_upcoming",
            Self::StopAfterCurrent => "stop_after_current",
            Self::Enqueue { .. } => "enqueue",
        }
    }
}

/// Transport action raised by a notification / lock-screen control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Play,
    Pause,
    Seek(u64),
    Stop,
}

/// A control action together with the location the control was rendered for.
///
/// The coordinator routes by its *current* location; the rendered location
/// is only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    pub action: ControlAction,
    pub rendered_for: PlaybackLocation,
}

/// Every input the dispatcher processes.
#[derive(Debug)]
pub enum DispatchMessage {
    Command(PlayerCommand),
    Control(ControlRequest),
    /// Remote callback stamped with the generation of the sink it came through.
    Remote {
        generation: Generation,
        event: RemoteEvent,
    },
    Engine(EngineEvent),
    Timer(TimerTick),
    Snapshot(oneshot::Sender<PlayerSnapshot>),
    Shutdown,
}

/// Cloneable sending half of the dispatcher channel.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<DispatchMessage>,
}

impl Dispatcher {
    /// Creates the dispatcher channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DispatchMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Posts a message. Returns `false` once the dispatcher has shut down.
    pub fn post(&self, message: DispatchMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Mints a remote sink stamped with `generation`.
    pub fn remote_sink(&self, generation: Generation) -> RemoteEventSink {
        RemoteEventSink {
            dispatcher: self.clone(),
            generation,
        }
    }

    pub fn engine_sink(&self) -> EngineEventSink {
        EngineEventSink {
            dispatcher: self.clone(),
        }
    }

    pub fn control_handle(&self) -> ControlHandle {
        ControlHandle {
            dispatcher: self.clone(),
        }
    }
}

/// Sink handed to the remote session service.
///
/// Every event sent through it carries the generation it was minted with, so
/// events from a superseded sink are recognised and dropped.
#[derive(Clone, Debug)]
pub struct RemoteEventSink {
    dispatcher: Dispatcher,
    generation: Generation,
}

impl RemoteEventSink {
    pub fn send(&self, event: RemoteEvent) -> bool {
        self.dispatcher.post(DispatchMessage::Remote {
            generation: self.generation,
            event,
        })
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Sink handed to the local playback engine.
#[derive(Clone, Debug)]
pub struct EngineEventSink {
    dispatcher: Dispatcher,
}

impl EngineEventSink {
    pub fn send(&self, event: EngineEvent) -> bool {
        self.dispatcher.post(DispatchMessage::Engine(event))
    }
}

/// Handle handed to the notification proxy for forwarding control actions.
#[derive(Clone, Debug)]
pub struct ControlHandle {
    dispatcher: Dispatcher,
}

impl ControlHandle {
    pub fn send(&self, action: ControlAction, rendered_for: PlaybackLocation) -> bool {
        self.dispatcher.post(DispatchMessage::Control(ControlRequest {
            action,
            rendered_for,
        }))
    }
}
