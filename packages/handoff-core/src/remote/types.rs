//! Value types exchanged with the remote session service.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::media::{MediaDescriptor, QueueItem, QueueItemId};

/// Player state reported by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemotePlayerState {
    Idle,
    Buffering,
    Playing,
    Paused,
}

/// Why the receiver went idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdleReason {
    Finished,
    Cancelled,
    Interrupted,
    Error,
}

/// Receiver queue repeat behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    Single,
    AllAndShuffle,
}

/// Status update pushed by the receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatus {
    pub player_state: RemotePlayerState,
    /// Only meaningful when `player_state` is `Idle`. An idle status without a
    /// reason means nothing was loaded yet.
    pub idle_reason: Option<IdleReason>,
    pub position_ms: u64,
    pub media: Option<Arc<MediaDescriptor>>,
    pub current_item_id: Option<QueueItemId>,
    /// Item the receiver is preloading, i.e. the upcoming item.
    pub preloaded_item_id: Option<QueueItemId>,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
}

impl MediaStatus {
    /// Convenience constructor for a status without queue information.
    pub fn new(player_state: RemotePlayerState, position_ms: u64) -> Self {
        Self {
            player_state,
            idle_reason: None,
            position_ms,
            media: None,
            current_item_id: None,
            preloaded_item_id: None,
            repeat_mode: RepeatMode::Off,
        }
    }

    #[must_use]
    pub fn with_idle_reason(mut self, reason: IdleReason) -> Self {
        self.idle_reason = Some(reason);
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: Arc<MediaDescriptor>) -> Self {
        self.media = Some(media);
        self
    }

    #[must_use]
    pub fn with_queue_markers(
        mut self,
        current: Option<QueueItemId>,
        preloaded: Option<QueueItemId>,
    ) -> Self {
        self.current_item_id = current;
        self.preloaded_item_id = preloaded;
        self
    }
}

/// Request to load a single media entry on the receiver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    pub media: Arc<MediaDescriptor>,
    /// Start playing as soon as the media is ready.
    pub autoplay: bool,
    pub position_ms: u64,
}

/// Receiver-side view of the queue at one instant.
///
/// Item ids only; full items are fetched on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub item_ids: Vec<QueueItemId>,
    pub current_item_id: Option<QueueItemId>,
    pub upcoming_item_id: Option<QueueItemId>,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
}

/// Change to the receiver queue, pushed after the receiver applied it.
///
/// Indices refer to the queue as it was before the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QueueChange {
    /// `item_ids` were inserted starting at `index`.
    Inserted {
        index: usize,
        item_ids: Vec<QueueItemId>,
    },
    /// The items at `indices` were removed.
    Removed { indices: Vec<usize> },
    /// The item at `from` now sits at `to`.
    Moved { from: usize, to: usize },
    /// Full content of these items, either fetched or modified.
    Updated { items: Vec<QueueItem> },
    /// The queue was replaced wholesale.
    Reloaded { item_ids: Vec<QueueItemId> },
}

/// Why the remote session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisconnectReason {
    /// The user or the receiver ended the session.
    Ended,
    /// The connection dropped.
    ConnectionLost,
    /// The session failed to start or resume.
    Failed(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ended => write!(f, "ended"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Remote request kinds, used when the receiver rejects one asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteCommand {
    Load,
    Play,
    Pause,
    Seek,
    Stop,
    QueueLoad,
    QueueInsert,
    QueueRemove,
    QueueMove,
    QueueJump,
    QueueFetch,
}

impl RemoteCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Seek => "seek",
            Self::Stop => "stop",
            Self::QueueLoad => "queue_load",
            Self::QueueInsert => "queue_insert",
            Self::QueueRemove => "queue_remove",
            Self::QueueMove => "queue_move",
            Self::QueueJump => "queue_jump",
            Self::QueueFetch => "queue_fetch",
        }
    }
}

/// Everything the remote session service reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// A receiver session became available.
    Connected { session_id: String },
    /// The receiver session ended.
    Disconnected { reason: DisconnectReason },
    /// Periodic or change-driven status update.
    StatusChanged(MediaStatus),
    /// The receiver queue changed.
    QueueChanged(QueueChange),
    /// The receiver rejected a request after it was sent.
    CommandRejected {
        command: RemoteCommand,
        reason: String,
    },
}
