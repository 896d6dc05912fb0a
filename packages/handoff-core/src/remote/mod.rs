//! Remote receiver session integration.
//!
//! - [`traits`] - the [`RemoteSessionService`] collaborator
//! - [`types`] - status, queue and event types it exchanges

pub mod traits;
pub mod types;

pub use traits::RemoteSessionService;
pub use types::{
    DisconnectReason, IdleReason, LoadRequest, MediaStatus, QueueChange, QueueSnapshot,
    RemoteCommand, RemoteEvent, RemotePlayerState, RepeatMode,
};
