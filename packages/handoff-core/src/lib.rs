//! Handoff Core - media playback that moves between a local engine and a
//! remote receiver.
//!
//! The crate keeps one playback session alive across location changes and
//! mirrors the receiver's queue with a bounded item cache. Platform code
//! supplies the engine, the remote session and the notification surface;
//! everything else runs on a single dispatcher task.
//!
//! # Architecture
//!
//! - [`dispatch`]: Message types and the sinks collaborators report through
//! - [`player`]: Applies dispatcher messages to the coordinator and mirror
//! - [`services`]: [`PlaybackCoordinator`] and [`QueueMirror`]
//! - [`remote`]: Receiver session trait and wire types
//! - [`engine`]: Local playback engine trait
//! - [`timer`]: Position polling and control auto-hide timers
//! - [`events`]: Event system for observers
//! - [`state`]: Configuration and session state
//! - [`sim`]: In-memory collaborators for tests and headless runs
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`LocalPlaybackEngine`](engine::LocalPlaybackEngine): On-device playback
//! - [`RemoteSessionService`](remote::RemoteSessionService): Receiver session
//! - [`NotificationProxy`](proxy::NotificationProxy): Platform media controls
//! - [`TimerScheduler`](timer::TimerScheduler): Dispatcher timers
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod media;
pub mod player;
pub mod protocol_constants;
pub mod proxy;
pub mod remote;
pub mod runtime;
pub mod services;
pub mod sim;
pub mod state;
pub mod timer;
pub mod utils;

// Re-export commonly used types at the crate root
pub use dispatch::{
    ControlAction, ControlHandle, ControlRequest, DispatchMessage, Dispatcher, PlayerCommand,
};
pub use engine::{EngineEvent, LocalPlaybackEngine};
pub use error::{
    CommandError, CommandResult, ConfigError, EngineError, ErrorCode, RemoteError, RemoteResult,
};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, EventEmitter, LoggingEventEmitter, NoopEventEmitter,
    PlaybackEvent, QueueEvent, QueueNotification,
};
pub use media::{ContentLocator, MediaDescriptor, QueueItem, QueueItemId, Track, TrackKind};
pub use player::{Collaborators, Flow, Player, PlayerSnapshot};
pub use proxy::{LoggingNotificationProxy, NotificationProxy};
pub use remote::{
    DisconnectReason, MediaStatus, RemoteEvent, RemotePlayerState, RemoteSessionService,
};
pub use runtime::{run_dispatcher, PlayerHandle, TaskSpawner, TokioSpawner};
pub use services::{EnqueueMode, PlaybackCoordinator, QueueMirror, QueueView};
pub use state::{
    CoreConfig, DetachPolicy, Generation, PlaybackConfig, PlaybackLocation, PlaybackSession,
    PlaybackState, QueueConfig,
};
pub use timer::{TimerScheduler, TokioTimerScheduler};
pub use utils::{format_millis, now_millis};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_player, BootstrappedPlayer};
