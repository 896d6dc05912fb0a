//! Remote session service abstraction.
//!
//! The service wraps a receiver session (discovery, transport, wire protocol
//! all live behind it). Requests return immediately once sent; the receiver's
//! answer arrives later as a [`RemoteEvent`](super::RemoteEvent) through the
//! most recently registered [`RemoteEventSink`].

use crate::dispatch::RemoteEventSink;
use crate::error::RemoteResult;
use crate::media::{QueueItem, QueueItemId};

use super::types::{LoadRequest, QueueSnapshot, RepeatMode};

/// Connection to a remote receiver.
///
/// Shared by the coordinator (transport) and the queue mirror (queue
/// operations), which is why methods take `&self`.
pub trait RemoteSessionService: Send + Sync {
    /// Replaces the sink events are delivered through.
    ///
    /// The coordinator registers a freshly stamped sink on every generation
    /// bump. Implementations must send every subsequent event through the
    /// new sink and stop using the previous one.
    fn register_sink(&self, sink: RemoteEventSink);

    /// Returns `true` while a receiver session is connected.
    fn is_connected(&self) -> bool;

    /// Loads a single media entry on the receiver.
    fn load(&self, request: LoadRequest) -> RemoteResult<()>;

    fn play(&self) -> RemoteResult<()>;

    fn pause(&self) -> RemoteResult<()>;

    fn seek(&self, position_ms: u64) -> RemoteResult<()>;

    fn stop(&self) -> RemoteResult<()>;

    /// Returns the receiver's current queue, or `None` if there is no live
    /// queue to follow.
    fn queue_snapshot(&self) -> Option<QueueSnapshot>;

    /// Replaces the receiver queue.
    ///
    /// # Arguments
    ///
    /// * `items` - Items to load, without ids
    /// * `start_index` - Index of the item to start playing
    /// * `repeat_mode` - Repeat behaviour of the new queue
    fn queue_load(
        &self,
        items: Vec<QueueItem>,
        start_index: usize,
        repeat_mode: RepeatMode,
    ) -> RemoteResult<()>;

    /// Inserts items before `insert_before`, or appends when `None`.
    fn queue_insert(
        &self,
        items: Vec<QueueItem>,
        insert_before: Option<QueueItemId>,
    ) -> RemoteResult<()>;

    /// Inserts one item before `insert_before` (or appends) and jumps to it.
    fn queue_insert_and_play(
        &self,
        item: QueueItem,
        insert_before: Option<QueueItemId>,
    ) -> RemoteResult<()>;

    fn queue_remove(&self, item_ids: &[QueueItemId]) -> RemoteResult<()>;

    /// Moves an item so that it ends up at `new_index`.
    fn queue_move(&self, item_id: QueueItemId, new_index: usize) -> RemoteResult<()>;

    fn queue_jump_to(&self, item_id: QueueItemId) -> RemoteResult<()>;

    /// Requests the full content of items. The answer arrives as a
    /// `QueueChange::Updated` event.
    fn queue_fetch(&self, item_ids: &[QueueItemId]) -> RemoteResult<()>;
}
