//! Application services layer.
//!
//! The two stateful components the dispatcher drives: the playback
//! coordinator and the queue mirror.

pub(crate) mod item_cache;
pub mod playback_coordinator;
pub mod queue_mirror;

pub use playback_coordinator::PlaybackCoordinator;
pub use queue_mirror::{EnqueueMode, QueueListener, QueueMirror, QueueNotification, QueueView};
