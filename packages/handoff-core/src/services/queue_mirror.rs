//! Local mirror of the receiver's playback queue.
//!
//! The receiver owns the queue. The mirror keeps the ordered list of item ids,
//! a bounded cache of full items fetched on demand, and the current/upcoming
//! markers. It never applies a mutation optimistically: every command is sent
//! to the receiver, and the local view changes only when the receiver reports
//! the change back.
//!
//! While no remote session is connected the mirror is *detached*: it keeps
//! (or discards, per [`DetachPolicy`]) the last-seen queue and refuses every
//! mutation except rebuild-and-reload into a new session.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, CommandResult, RemoteError};
use crate::events::{EventEmitter, QueueEvent};
use crate::media::{MediaDescriptor, QueueItem, QueueItemId};
use crate::remote::{MediaStatus, QueueChange, RemoteSessionService, RepeatMode};
use crate::services::item_cache::ItemCache;
use crate::state::{DetachPolicy, QueueConfig};
use crate::utils::now_millis;

/// Where a newly enqueued item goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnqueueMode {
    /// Insert before the current item and start playing it.
    PlayNow,
    /// Insert right after the current item.
    PlayNext,
    /// Append to the end of the queue.
    Append,
}

/// Change notification delivered to the queue listener and emitted as a
/// [`QueueEvent`].
///
/// Notifications describe changes the mirror has already applied. Indices are
/// positions in the queue before the change, like the receiver reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueNotification {
    Inserted {
        index: usize,
        count: usize,
    },
    Removed {
        indices: Vec<usize>,
    },
    Moved {
        from: usize,
        to: usize,
    },
    /// Full content became available (or changed) for these positions.
    Updated {
        indices: Vec<usize>,
    },
    /// The whole queue was replaced.
    Reloaded {
        count: usize,
    },
    MarkersChanged {
        #[serde(rename = "currentItemId")]
        current_item_id: Option<QueueItemId>,
        #[serde(rename = "upcomingItemId")]
        upcoming_item_id: Option<QueueItemId>,
    },
    Attached,
    Detached,
}

/// Single observer of the mirror, typically the queue UI.
///
/// Called after every applied change with read-only access to the mirror.
/// Repeated delivery of the same notification must be harmless: listeners
/// re-render from the mirror's state rather than replaying deltas.
pub trait QueueListener: Send {
    fn on_queue_changed(&mut self, mirror: &QueueMirror, change: &QueueNotification);
}

impl<F> QueueListener for F
where
    F: FnMut(&QueueMirror, &QueueNotification) + Send,
{
    fn on_queue_changed(&mut self, mirror: &QueueMirror, change: &QueueNotification) {
        self(mirror, change)
    }
}

/// Serializable summary of the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueView {
    pub count: usize,
    pub cached: usize,
    pub attached: bool,
    pub current_item_id: Option<QueueItemId>,
    pub upcoming_item_id: Option<QueueItemId>,
    pub repeat_mode: RepeatMode,
}

/// Mirror of the remote queue.
pub struct QueueMirror {
    config: QueueConfig,
    remote: Arc<dyn RemoteSessionService>,
    emitter: Arc<dyn EventEmitter>,
    /// Full ordering, ids only.
    item_ids: Vec<QueueItemId>,
    cache: ItemCache,
    /// Ids requested from the receiver and not yet delivered.
    pending_fetch: HashSet<QueueItemId>,
    current_item_id: Option<QueueItemId>,
    upcoming_item_id: Option<QueueItemId>,
    repeat_mode: RepeatMode,
    attached: bool,
    listener: Option<Box<dyn QueueListener>>,
}

impl QueueMirror {
    /// Creates an empty, detached mirror.
    pub fn new(
        config: QueueConfig,
        remote: Arc<dyn RemoteSessionService>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        let cache = ItemCache::new(config.cache_capacity);
        Self {
            config,
            remote,
            emitter,
            item_ids: Vec::new(),
            cache,
            pending_fetch: HashSet::new(),
            current_item_id: None,
            upcoming_item_id: None,
            repeat_mode: RepeatMode::Off,
            attached: false,
            listener: None,
        }
    }

    /// Installs the listener, replacing any previous one.
    pub fn set_listener(&mut self, listener: Box<dyn QueueListener>) {
        self.listener = Some(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn count(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn current_item_id(&self) -> Option<QueueItemId> {
        self.current_item_id
    }

    pub fn upcoming_item_id(&self) -> Option<QueueItemId> {
        self.upcoming_item_id
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn item_ids(&self) -> &[QueueItemId] {
        &self.item_ids
    }

    /// Number of items currently held in the cache.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Returns the full item at `position` if it is cached.
    ///
    /// On a cache miss this returns `None` and, while attached, asks the
    /// receiver for a batch of items around `position`. At most one fetch is
    /// in flight per item; the answer arrives as an `Updated` notification.
    pub fn item_at(&mut self, position: usize) -> Option<&QueueItem> {
        let id = *self.item_ids.get(position)?;
        if self.cache.contains(id) {
            return self.cache.get(id);
        }
        self.request_window(position);
        None
    }

    /// Returns the cached item at `position` without fetching or touching
    /// recency. Intended for listeners.
    pub fn cached_item_at(&self, position: usize) -> Option<&QueueItem> {
        let id = self.item_ids.get(position)?;
        self.cache.peek(*id)
    }

    /// Position of an item id, or `None` if it is not in the queue.
    pub fn position_of_item_id(&self, item_id: QueueItemId) -> Option<usize> {
        self.item_ids.iter().position(|id| *id == item_id)
    }

    pub fn is_current(&self, position: usize) -> bool {
        self.marker_at(position, self.current_item_id)
    }

    pub fn is_upcoming(&self, position: usize) -> bool {
        self.marker_at(position, self.upcoming_item_id)
    }

    pub fn view(&self) -> QueueView {
        QueueView {
            count: self.item_ids.len(),
            cached: self.cache.len(),
            attached: self.attached,
            current_item_id: self.current_item_id,
            upcoming_item_id: self.upcoming_item_id,
            repeat_mode: self.repeat_mode,
        }
    }

    fn marker_at(&self, position: usize, marker: Option<QueueItemId>) -> bool {
        match (self.item_ids.get(position), marker) {
            (Some(id), Some(marker)) => *id == marker,
            _ => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Asks the receiver to remove the item at `position`.
    pub fn remove_at(&mut self, position: usize) -> CommandResult<()> {
        let Some(item_id) = self.mutable_item_id(position, "remove_at") else {
            return Ok(());
        };
        self.remote.queue_remove(&[item_id])?;
        log::debug!("[QueueMirror] Requested removal of {} at {}", item_id, position);
        Ok(())
    }

    /// Asks the receiver to empty the queue.
    pub fn remove_all(&mut self) -> CommandResult<()> {
        if !self.attached {
            log::debug!("[QueueMirror] Ignoring remove_all while detached");
            return Ok(());
        }
        if self.item_ids.is_empty() {
            return Ok(());
        }
        self.remote.queue_remove(&self.item_ids)?;
        log::debug!("[QueueMirror] Requested removal of all {} items", self.item_ids.len());
        Ok(())
    }

    /// Asks the receiver to move the item at `from` to `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> CommandResult<()> {
        if from == to {
            return Ok(());
        }
        let Some(item_id) = self.mutable_item_id(from, "move_item") else {
            return Ok(());
        };
        if to >= self.item_ids.len() {
            log::debug!(
                "[QueueMirror] Ignoring move_item: target {} out of range ({} items)",
                to,
                self.item_ids.len()
            );
            return Ok(());
        }
        self.remote.queue_move(item_id, to)?;
        Ok(())
    }

    /// Asks the receiver to start playing `item_id`.
    pub fn jump_to(&mut self, item_id: QueueItemId) -> CommandResult<()> {
        if !self.attached {
            log::debug!("[QueueMirror] Ignoring jump_to while detached");
            return Ok(());
        }
        if self.position_of_item_id(item_id).is_none() {
            log::debug!("[QueueMirror] Ignoring jump_to: {} not in queue", item_id);
            return Ok(());
        }
        self.remote.queue_jump_to(item_id)?;
        Ok(())
    }

    /// Plays the item at `position`.
    ///
    /// Attached: jumps to it unless it is already current. Detached: rebuilds
    /// the frozen queue and reloads it into the connected session starting at
    /// that item.
    pub fn play_item_at(&mut self, position: usize) -> CommandResult<()> {
        if !self.attached {
            return self.reload_from(position);
        }
        match self.item_ids.get(position).copied() {
            Some(item_id) if Some(item_id) != self.current_item_id => self.jump_to(item_id),
            _ => Ok(()),
        }
    }

    /// Skips ahead to the upcoming item.
    pub fn play_upcoming(&mut self) -> CommandResult<()> {
        match self.upcoming_item_id {
            Some(item_id) => self.jump_to(item_id),
            None => Ok(()),
        }
    }

    /// Removes everything from the upcoming item to the end, so playback
    /// stops once the current item finishes.
    pub fn stop_after_current(&mut self) -> CommandResult<()> {
        if !self.attached {
            log::debug!("[QueueMirror] Ignoring stop_after_current while detached");
            return Ok(());
        }
        let Some(start) = self
            .upcoming_item_id
            .and_then(|id| self.position_of_item_id(id))
        else {
            return Ok(());
        };
        self.remote.queue_remove(&self.item_ids[start..])?;
        Ok(())
    }

    /// Rebuilds the detached queue and loads it into the connected session,
    /// starting at `position`.
    pub fn reload_from(&mut self, position: usize) -> CommandResult<()> {
        if self.attached {
            log::debug!("[QueueMirror] reload_from only applies to a detached queue");
            return Ok(());
        }
        if position >= self.item_ids.len() {
            return Ok(());
        }
        if !self.remote.is_connected() {
            return Err(RemoteError::NotConnected.into());
        }
        let (items, start_index) = self.rebuild(Some(position));
        if items.is_empty() {
            log::warn!("[QueueMirror] Nothing cached to rebuild the queue from");
            return Ok(());
        }
        log::info!(
            "[QueueMirror] Reloading {} items into new session, starting at {}",
            items.len(),
            start_index
        );
        self.remote
            .queue_load(items, start_index, self.repeat_mode)?;
        Ok(())
    }

    /// Adds media to the queue.
    ///
    /// While detached with a frozen queue, `PlayNow` and `Append` rebuild the
    /// frozen queue with the new item at the end and reload it, starting at
    /// the new item. `PlayNext` needs a live queue and is ignored.
    pub fn enqueue(&mut self, media: Arc<MediaDescriptor>, mode: EnqueueMode) -> CommandResult<()> {
        if media.playable_locator().is_none() {
            return Err(CommandError::InvalidDescriptor(media.title.clone()));
        }
        let item = QueueItem::new(media, self.config.preload_time_secs);

        if self.item_ids.is_empty() {
            if !self.attached && !self.remote.is_connected() {
                return Err(RemoteError::NotConnected.into());
            }
            self.remote.queue_load(vec![item], 0, RepeatMode::Off)?;
            return Ok(());
        }

        if !self.attached {
            if !self.remote.is_connected() {
                return Err(RemoteError::NotConnected.into());
            }
            if mode == EnqueueMode::PlayNext {
                log::info!("[QueueMirror] Play-next needs a live queue; ignoring");
                return Ok(());
            }
            let (mut items, _) = self.rebuild(None);
            let start_index = items.len();
            items.push(item);
            self.remote
                .queue_load(items, start_index, self.repeat_mode)?;
            return Ok(());
        }

        match mode {
            EnqueueMode::PlayNow => {
                self.remote
                    .queue_insert_and_play(item, self.current_item_id)?;
            }
            EnqueueMode::PlayNext => {
                let insert_before = self
                    .current_item_id
                    .and_then(|id| self.position_of_item_id(id))
                    .and_then(|position| self.item_ids.get(position + 1).copied());
                self.remote.queue_insert(vec![item], insert_before)?;
            }
            EnqueueMode::Append => {
                self.remote.queue_insert(vec![item], None)?;
            }
        }
        Ok(())
    }

    fn mutable_item_id(&self, position: usize, operation: &str) -> Option<QueueItemId> {
        if !self.attached {
            log::debug!("[QueueMirror] Ignoring {} while detached", operation);
            return None;
        }
        let item_id = self.item_ids.get(position).copied();
        if item_id.is_none() {
            log::debug!(
                "[QueueMirror] Ignoring {}: position {} out of range ({} items)",
                operation,
                position,
                self.item_ids.len()
            );
        }
        item_id
    }

    /// Copies cached items without their ids. Uncached items are skipped.
    ///
    /// Returns the items and the index, within them, of `anchor` (or of the
    /// first cached item after it).
    fn rebuild(&self, anchor: Option<usize>) -> (Vec<QueueItem>, usize) {
        let mut items = Vec::with_capacity(self.cache.len());
        let mut start_index = None;
        let mut skipped = 0;

        for (position, item_id) in self.item_ids.iter().enumerate() {
            if start_index.is_none() && anchor.is_some_and(|anchor| position >= anchor) {
                start_index = Some(items.len());
            }
            match self.cache.peek(*item_id) {
                Some(item) => items.push(item.rebuilt()),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!(
                "[QueueMirror] Rebuild skipped {} items that were never fetched",
                skipped
            );
        }

        let start_index = start_index
            .unwrap_or(0)
            .min(items.len().saturating_sub(1));
        (items, start_index)
    }

    fn request_window(&mut self, position: usize) {
        if !self.attached {
            return;
        }
        let requested = self.item_ids[position];
        if self.pending_fetch.contains(&requested) {
            log::trace!("[QueueMirror] Fetch for {} already in flight", requested);
            return;
        }

        let len = self.item_ids.len();
        let batch = self.config.fetch_batch_size.min(self.config.cache_capacity);
        let start = position.min(len.saturating_sub(batch));
        let end = (start + batch).min(len);
        let missing: Vec<QueueItemId> = self.item_ids[start..end]
            .iter()
            .copied()
            .filter(|id| !self.cache.contains(*id) && !self.pending_fetch.contains(id))
            .collect();

        match self.remote.queue_fetch(&missing) {
            Ok(()) => {
                log::debug!(
                    "[QueueMirror] Fetching {} items for positions {}..{}",
                    missing.len(),
                    start,
                    end
                );
                self.pending_fetch.extend(missing);
            }
            Err(e) => log::warn!("[QueueMirror] Fetch around {} failed: {}", position, e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remote input
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts following the receiver's live queue.
    ///
    /// Markers are taken from the snapshot before any notification goes out.
    /// Without a live queue the mirror stays detached.
    pub fn attach(&mut self) {
        let Some(snapshot) = self.remote.queue_snapshot() else {
            log::debug!("[QueueMirror] No live remote queue; staying detached");
            return;
        };

        self.current_item_id = snapshot.current_item_id;
        self.upcoming_item_id = snapshot.upcoming_item_id;
        self.repeat_mode = snapshot.repeat_mode;
        self.item_ids = snapshot.item_ids;
        self.cache.clear();
        self.pending_fetch.clear();
        self.attached = true;

        let count = self.item_ids.len();
        log::info!("[QueueMirror] Attached to remote queue ({} items)", count);
        self.notify(QueueNotification::Attached);
        self.notify(QueueNotification::Reloaded { count });
    }

    /// Stops following the receiver. Applies the configured [`DetachPolicy`].
    pub fn detach(&mut self) {
        let was_attached = self.attached;
        self.attached = false;
        self.pending_fetch.clear();

        if self.config.detach_policy == DetachPolicy::Discard {
            self.item_ids.clear();
            self.cache.clear();
            self.current_item_id = None;
            self.upcoming_item_id = None;
        }

        if was_attached {
            log::info!(
                "[QueueMirror] Detached ({:?}, {} items kept)",
                self.config.detach_policy,
                self.item_ids.len()
            );
            self.notify(QueueNotification::Detached);
        }
    }

    /// Refreshes markers from a receiver status update.
    ///
    /// A detached mirror attaches when the status shows that the connected
    /// receiver is now playing from a queue.
    pub fn on_status(&mut self, status: &MediaStatus) {
        if !self.attached {
            if status.current_item_id.is_some() && self.remote.is_connected() {
                self.attach();
            }
            return;
        }

        self.repeat_mode = status.repeat_mode;
        if status.current_item_id != self.current_item_id
            || status.preloaded_item_id != self.upcoming_item_id
        {
            self.current_item_id = status.current_item_id;
            self.upcoming_item_id = status.preloaded_item_id;
            self.notify(QueueNotification::MarkersChanged {
                current_item_id: self.current_item_id,
                upcoming_item_id: self.upcoming_item_id,
            });
        }
    }

    /// Applies a change the receiver reported.
    pub fn apply_change(&mut self, change: QueueChange) {
        if !self.attached {
            if matches!(change, QueueChange::Reloaded { .. }) && self.remote.is_connected() {
                self.attach();
            } else {
                log::trace!("[QueueMirror] Ignoring queue change while detached");
            }
            return;
        }

        let len = self.item_ids.len();
        match change {
            QueueChange::Inserted { index, item_ids } => {
                if item_ids.is_empty() {
                    return;
                }
                let index = index.min(len);
                let count = item_ids.len();
                self.item_ids.splice(index..index, item_ids);
                self.notify(QueueNotification::Inserted { index, count });
            }
            QueueChange::Removed { indices } => {
                let mut indices: Vec<usize> = indices.into_iter().filter(|i| *i < len).collect();
                indices.sort_unstable();
                indices.dedup();
                if indices.is_empty() {
                    return;
                }
                for &index in indices.iter().rev() {
                    let item_id = self.item_ids.remove(index);
                    self.cache.remove(item_id);
                    self.pending_fetch.remove(&item_id);
                }
                self.notify(QueueNotification::Removed { indices });
            }
            QueueChange::Moved { from, to } => {
                if from >= len || to >= len {
                    log::warn!(
                        "[QueueMirror] Ignoring move {} -> {} outside queue of {}",
                        from,
                        to,
                        len
                    );
                    return;
                }
                if from == to {
                    return;
                }
                let item_id = self.item_ids.remove(from);
                self.item_ids.insert(to, item_id);
                self.notify(QueueNotification::Moved { from, to });
            }
            QueueChange::Updated { items } => {
                let mut indices = Vec::with_capacity(items.len());
                for item in items {
                    let Some(item_id) = item.id else {
                        continue;
                    };
                    self.pending_fetch.remove(&item_id);
                    if let Some(position) = self.position_of_item_id(item_id) {
                        self.cache.insert(item_id, item);
                        indices.push(position);
                    }
                }
                if indices.is_empty() {
                    return;
                }
                indices.sort_unstable();
                indices.dedup();
                self.notify(QueueNotification::Updated { indices });
            }
            QueueChange::Reloaded { item_ids } => {
                let count = item_ids.len();
                self.item_ids = item_ids;
                self.cache.clear();
                self.pending_fetch.clear();
                self.notify(QueueNotification::Reloaded { count });
            }
        }
    }

    fn notify(&mut self, change: QueueNotification) {
        self.emitter.emit_queue(QueueEvent {
            change: change.clone(),
            count: self.item_ids.len(),
            attached: self.attached,
            timestamp: now_millis(),
        });
        if let Some(mut listener) = self.listener.take() {
            listener.on_queue_changed(self, &change);
            self.listener = Some(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchMessage, Dispatcher};
    use crate::events::NoopEventEmitter;
    use crate::media::ContentLocator;
    use crate::remote::{RemoteEvent, RemotePlayerState};
    use crate::sim::{RemoteCall, SimulatedReceiver};
    use crate::state::Generation;
    use parking_lot::Mutex;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn media(title: &str) -> Arc<MediaDescriptor> {
        Arc::new(MediaDescriptor::new(
            ContentLocator::Url(format!("https://example.com/{}.mp4", title)),
            "video/mp4",
            title,
        ))
    }

    struct Fixture {
        receiver: Arc<SimulatedReceiver>,
        mirror: QueueMirror,
        rx: UnboundedReceiver<DispatchMessage>,
    }

    impl Fixture {
        fn new(queue_len: usize, policy: DetachPolicy) -> Self {
            let (dispatcher, rx) = Dispatcher::channel();
            let receiver = Arc::new(SimulatedReceiver::new());
            receiver.register_sink(dispatcher.remote_sink(Generation::INITIAL));
            receiver.connect();
            if queue_len > 0 {
                receiver.seed_queue(queue_len);
            }
            let config = QueueConfig {
                detach_policy: policy,
                ..QueueConfig::default()
            };
            let mirror = QueueMirror::new(config, receiver.clone(), Arc::new(NoopEventEmitter));
            let mut fixture = Self {
                receiver,
                mirror,
                rx,
            };
            fixture.pump();
            fixture.receiver.take_calls();
            fixture
        }

        /// Feeds every pending remote event into the mirror.
        fn pump(&mut self) {
            while let Ok(message) = self.rx.try_recv() {
                if let DispatchMessage::Remote { event, .. } = message {
                    match event {
                        RemoteEvent::QueueChanged(change) => self.mirror.apply_change(change),
                        RemoteEvent::StatusChanged(status) => self.mirror.on_status(&status),
                        _ => {}
                    }
                }
            }
        }

        fn fetch_calls(&self) -> Vec<Vec<QueueItemId>> {
            self.receiver
                .calls()
                .into_iter()
                .filter_map(|call| match call {
                    RemoteCall::QueueFetch(ids) => Some(ids),
                    _ => None,
                })
                .collect()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attach / Detach
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn attach_takes_ids_and_markers_from_snapshot() {
        let mut fx = Fixture::new(5, DetachPolicy::Freeze);
        fx.mirror.attach();

        assert!(fx.mirror.is_attached());
        assert_eq!(fx.mirror.count(), 5);
        assert!(fx.mirror.is_current(0));
        assert!(fx.mirror.is_upcoming(1));
        assert!(!fx.mirror.is_current(1));
    }

    #[test]
    fn attach_without_live_queue_stays_detached() {
        let mut fx = Fixture::new(0, DetachPolicy::Freeze);
        fx.mirror.attach();
        assert!(!fx.mirror.is_attached());
        assert_eq!(fx.mirror.count(), 0);
    }

    #[test]
    fn markers_are_set_before_listener_runs() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        fx.mirror
            .set_listener(Box::new(move |mirror: &QueueMirror, change: &QueueNotification| {
                seen_clone
                    .lock()
                    .push((change.clone(), mirror.current_item_id(), mirror.count()));
            }));

        fx.mirror.attach();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, QueueNotification::Attached);
        assert!(seen[0].1.is_some());
        assert_eq!(seen[0].2, 3);
        assert_eq!(seen[1].0, QueueNotification::Reloaded { count: 3 });
    }

    #[test]
    fn freeze_keeps_queue_after_detach() {
        let mut fx = Fixture::new(4, DetachPolicy::Freeze);
        fx.mirror.attach();
        fx.mirror.item_at(0);
        fx.pump();

        fx.mirror.detach();

        assert!(!fx.mirror.is_attached());
        assert_eq!(fx.mirror.count(), 4);
        assert!(fx.mirror.cached_item_at(0).is_some());
        assert!(fx.mirror.current_item_id().is_some());
    }

    #[test]
    fn discard_clears_queue_on_detach() {
        let mut fx = Fixture::new(4, DetachPolicy::Discard);
        fx.mirror.attach();
        fx.mirror.detach();

        assert_eq!(fx.mirror.count(), 0);
        assert_eq!(fx.mirror.cached_count(), 0);
        assert!(fx.mirror.current_item_id().is_none());
    }

    #[test]
    fn detach_twice_notifies_once() {
        let mut fx = Fixture::new(2, DetachPolicy::Freeze);
        let notified = Arc::new(Mutex::new(0));
        let counter = notified.clone();
        fx.mirror.attach();
        fx.mirror
            .set_listener(Box::new(move |_: &QueueMirror, change: &QueueNotification| {
                if *change == QueueNotification::Detached {
                    *counter.lock() += 1;
                }
            }));

        fx.mirror.detach();
        fx.mirror.detach();

        assert_eq!(*notified.lock(), 1);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lazy Fetch
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn miss_triggers_single_bounded_fetch() {
        let mut fx = Fixture::new(100, DetachPolicy::Freeze);
        fx.mirror.attach();

        assert!(fx.mirror.item_at(99).is_none());
        assert!(fx.mirror.item_at(99).is_none());

        let fetches = fx.fetch_calls();
        assert_eq!(fetches.len(), 1);
        assert!(fetches[0].len() <= 20);
        assert!(fetches[0].contains(&fx.mirror.item_ids()[99]));
    }

    #[test]
    fn fetched_items_become_available() {
        let mut fx = Fixture::new(100, DetachPolicy::Freeze);
        fx.mirror.attach();

        assert!(fx.mirror.item_at(99).is_none());
        fx.pump();

        let item_id = fx.mirror.item_at(99).expect("item fetched").id;
        assert_eq!(item_id, Some(fx.mirror.item_ids()[99]));
    }

    #[test]
    fn cache_never_exceeds_capacity() {
        let mut fx = Fixture::new(100, DetachPolicy::Freeze);
        fx.mirror.attach();

        for position in 0..100 {
            fx.mirror.item_at(position);
            fx.pump();
            assert!(fx.mirror.cached_count() <= 30);
        }
        assert_eq!(fx.mirror.cached_count(), 30);
    }

    #[test]
    fn no_fetch_while_detached() {
        let mut fx = Fixture::new(10, DetachPolicy::Freeze);
        fx.mirror.attach();
        fx.mirror.detach();

        assert!(fx.mirror.item_at(5).is_none());
        assert!(fx.fetch_calls().is_empty());
    }

    #[test]
    fn out_of_range_item_is_none_without_fetch() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        fx.mirror.attach();
        assert!(fx.mirror.item_at(3).is_none());
        assert!(fx.fetch_calls().is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn remove_is_not_applied_optimistically() {
        let mut fx = Fixture::new(5, DetachPolicy::Freeze);
        fx.mirror.attach();
        let removed = fx.mirror.item_ids()[2];

        fx.mirror.remove_at(2).unwrap();
        assert_eq!(fx.mirror.count(), 5);

        fx.pump();
        assert_eq!(fx.mirror.count(), 4);
        assert!(fx.mirror.position_of_item_id(removed).is_none());
    }

    #[test]
    fn mutations_are_noops_while_detached() {
        let mut fx = Fixture::new(5, DetachPolicy::Freeze);
        fx.mirror.attach();
        let first = fx.mirror.item_ids()[0];
        fx.mirror.detach();
        fx.receiver.take_calls();

        fx.mirror.remove_at(0).unwrap();
        fx.mirror.remove_all().unwrap();
        fx.mirror.move_item(0, 3).unwrap();
        fx.mirror.jump_to(first).unwrap();
        fx.mirror.stop_after_current().unwrap();

        assert!(fx.receiver.calls().is_empty());
    }

    #[test]
    fn move_item_follows_receiver_order() {
        let mut fx = Fixture::new(4, DetachPolicy::Freeze);
        fx.mirror.attach();
        let ids = fx.mirror.item_ids().to_vec();

        fx.mirror.move_item(0, 2).unwrap();
        fx.pump();

        assert_eq!(fx.mirror.item_ids(), &[ids[1], ids[2], ids[0], ids[3]]);
    }

    #[test]
    fn move_out_of_range_is_ignored() {
        let mut fx = Fixture::new(4, DetachPolicy::Freeze);
        fx.mirror.attach();
        fx.mirror.move_item(0, 4).unwrap();
        fx.mirror.move_item(2, 2).unwrap();
        assert!(fx.receiver.calls().is_empty());
    }

    #[test]
    fn stop_after_current_removes_tail() {
        let mut fx = Fixture::new(5, DetachPolicy::Freeze);
        fx.mirror.attach();
        let ids = fx.mirror.item_ids().to_vec();

        fx.mirror.stop_after_current().unwrap();

        assert_eq!(
            fx.receiver.calls(),
            vec![RemoteCall::QueueRemove(ids[1..].to_vec())]
        );
        fx.pump();
        assert_eq!(fx.mirror.count(), 1);
    }

    #[test]
    fn play_upcoming_jumps_to_preloaded_item() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        fx.mirror.attach();
        let upcoming = fx.mirror.upcoming_item_id().unwrap();

        fx.mirror.play_upcoming().unwrap();
        fx.pump();

        assert_eq!(fx.receiver.calls(), vec![RemoteCall::QueueJump(upcoming)]);
        assert_eq!(fx.mirror.current_item_id(), Some(upcoming));
    }

    #[test]
    fn play_item_at_current_is_noop() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        fx.mirror.attach();
        fx.mirror.play_item_at(0).unwrap();
        assert!(fx.receiver.calls().is_empty());
    }

    #[test]
    fn enqueue_rejects_unplayable_media() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        fx.mirror.attach();
        let mut broken = MediaDescriptor::new(ContentLocator::Url(String::new()), "video/mp4", "x");
        broken.locator = None;

        let err = fx
            .mirror
            .enqueue(Arc::new(broken), EnqueueMode::Append)
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidDescriptor(_)));
        assert!(fx.receiver.calls().is_empty());
    }

    #[test]
    fn enqueue_play_next_inserts_after_current() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        fx.mirror.attach();
        let second = fx.mirror.item_ids()[1];

        fx.mirror
            .enqueue(media("next"), EnqueueMode::PlayNext)
            .unwrap();

        match &fx.receiver.calls()[0] {
            RemoteCall::QueueInsert { items, insert_before } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].preload_time_secs, 20.0);
                assert!(items[0].autoplay);
                assert_eq!(*insert_before, Some(second));
            }
            other => panic!("unexpected call: {:?}", other),
        }
        fx.pump();
        assert_eq!(fx.mirror.count(), 4);
    }

    #[test]
    fn enqueue_play_now_inserts_before_current() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        fx.mirror.attach();
        let current = fx.mirror.current_item_id();

        fx.mirror.enqueue(media("now"), EnqueueMode::PlayNow).unwrap();

        match &fx.receiver.calls()[0] {
            RemoteCall::QueueInsertAndPlay { insert_before, .. } => {
                assert_eq!(*insert_before, current);
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[test]
    fn enqueue_into_empty_session_loads_queue() {
        let mut fx = Fixture::new(0, DetachPolicy::Freeze);
        fx.mirror.attach();

        fx.mirror.enqueue(media("first"), EnqueueMode::Append).unwrap();
        match &fx.receiver.calls()[0] {
            RemoteCall::QueueLoad { items, start_index } => {
                assert_eq!(items.len(), 1);
                assert_eq!(*start_index, 0);
            }
            other => panic!("unexpected call: {:?}", other),
        }

        // The receiver reports the new queue; the mirror attaches to it
        fx.pump();
        assert!(fx.mirror.is_attached());
        assert_eq!(fx.mirror.count(), 1);
    }

    #[test]
    fn detached_append_rebuilds_frozen_queue() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        fx.mirror.attach();
        fx.mirror.item_at(0);
        fx.pump();
        fx.mirror.detach();
        fx.receiver.take_calls();

        fx.mirror.enqueue(media("extra"), EnqueueMode::Append).unwrap();

        match &fx.receiver.calls()[0] {
            RemoteCall::QueueLoad { items, start_index } => {
                assert_eq!(items.len(), 4);
                assert_eq!(*start_index, 3);
                assert!(items.iter().all(|item| item.id.is_none()));
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[test]
    fn detached_play_next_is_refused() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        fx.mirror.attach();
        fx.mirror.detach();
        fx.receiver.take_calls();

        fx.mirror.enqueue(media("x"), EnqueueMode::PlayNext).unwrap();
        assert!(fx.receiver.calls().is_empty());
    }

    #[test]
    fn detached_enqueue_without_session_fails() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        fx.mirror.attach();
        fx.mirror.detach();
        fx.receiver.disconnect(crate::remote::DisconnectReason::Ended);

        let err = fx
            .mirror
            .enqueue(media("x"), EnqueueMode::Append)
            .unwrap_err();
        assert_eq!(err, CommandError::Remote(RemoteError::NotConnected));
    }

    #[test]
    fn reload_from_starts_at_selected_item() {
        let mut fx = Fixture::new(5, DetachPolicy::Freeze);
        fx.mirror.attach();
        fx.mirror.item_at(0);
        fx.pump();
        fx.mirror.detach();
        fx.receiver.take_calls();

        fx.mirror.play_item_at(2).unwrap();

        match &fx.receiver.calls()[0] {
            RemoteCall::QueueLoad { items, start_index } => {
                assert_eq!(items.len(), 5);
                assert_eq!(*start_index, 2);
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remote Changes
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn status_updates_markers_once() {
        let mut fx = Fixture::new(3, DetachPolicy::Freeze);
        fx.mirror.attach();
        let ids = fx.mirror.item_ids().to_vec();
        let changes = Arc::new(Mutex::new(0));
        let counter = changes.clone();
        fx.mirror
            .set_listener(Box::new(move |_: &QueueMirror, change: &QueueNotification| {
                if matches!(change, QueueNotification::MarkersChanged { .. }) {
                    *counter.lock() += 1;
                }
            }));

        let status = MediaStatus::new(RemotePlayerState::Playing, 0)
            .with_queue_markers(Some(ids[1]), Some(ids[2]));
        fx.mirror.on_status(&status);
        fx.mirror.on_status(&status);

        assert_eq!(*changes.lock(), 1);
        assert!(fx.mirror.is_current(1));
        assert!(fx.mirror.is_upcoming(2));
    }

    #[test]
    fn removed_items_leave_cache() {
        let mut fx = Fixture::new(5, DetachPolicy::Freeze);
        fx.mirror.attach();
        fx.mirror.item_at(0);
        fx.pump();
        assert_eq!(fx.mirror.cached_count(), 5);

        fx.mirror.apply_change(QueueChange::Removed {
            indices: vec![4, 1, 1, 9],
        });

        assert_eq!(fx.mirror.count(), 3);
        assert_eq!(fx.mirror.cached_count(), 3);
    }

    #[test]
    fn inserted_index_is_clamped() {
        let mut fx = Fixture::new(2, DetachPolicy::Freeze);
        fx.mirror.attach();

        fx.mirror.apply_change(QueueChange::Inserted {
            index: 10,
            item_ids: vec![QueueItemId(500)],
        });

        assert_eq!(fx.mirror.item_ids().last(), Some(&QueueItemId(500)));
    }

    #[test]
    fn changes_while_detached_are_ignored() {
        let mut fx = Fixture::new(2, DetachPolicy::Freeze);
        fx.mirror.attach();
        fx.mirror.detach();

        fx.mirror.apply_change(QueueChange::Inserted {
            index: 0,
            item_ids: vec![QueueItemId(500)],
        });

        assert_eq!(fx.mirror.count(), 2);
    }
}
