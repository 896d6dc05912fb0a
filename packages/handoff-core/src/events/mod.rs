//! Event system for observers of the playback core.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the coordinator and queue mirror to emit events
//! - [`BroadcastEventBridge`] for fan-out to any number of subscribers
//! - Event types for the two domains (playback, queue)
//!
//! The [`QueueNotification`] type is defined in [`crate::services::queue_mirror`]
//! and re-exported here.

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

// Re-export QueueNotification from the queue mirror for convenience
pub use crate::services::queue_mirror::QueueNotification;

use serde::Serialize;

use crate::state::{Generation, PlaybackLocation, PlaybackState};

/// Events broadcast to observers.
///
/// This enum categorizes all events the core produces. Each category has its
/// own inner event type with specific variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Events from the playback coordinator.
    Playback(PlaybackEvent),

    /// Events from the queue mirror.
    Queue(QueueEvent),
}

/// Events related to the playback session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// The playback state changed.
    StateChanged {
        location: PlaybackLocation,
        state: PlaybackState,
        /// Title of the current media, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Playback moved between the local engine and the receiver.
    LocationChanged {
        from: PlaybackLocation,
        to: PlaybackLocation,
        /// Generation after the change.
        generation: Generation,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Periodic position update while playing.
    Progress {
        #[serde(rename = "positionMs")]
        position_ms: u64,
        #[serde(rename = "durationMs", skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// On-screen controls were shown or hidden.
    ControlsVisibility {
        visible: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Local playback resumed where the remote session left off.
    LocalResumed {
        #[serde(rename = "positionMs")]
        position_ms: u64,
        title: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A command could not be carried out.
    CommandFailed {
        /// Name of the failed command.
        command: String,
        /// Machine-readable error code.
        code: String,
        /// Human-readable error message.
        message: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Event emitted whenever the queue mirror applies a change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEvent {
    /// What changed.
    pub change: QueueNotification,
    /// Queue length after the change.
    pub count: usize,
    /// Whether the mirror follows a live remote queue.
    pub attached: bool,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
}
