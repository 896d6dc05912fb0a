//! In-memory remote receiver.
//!
//! Behaves like a well-mannered receiver: every accepted request is applied to
//! an internal queue/player model and answered with the same events a real
//! receiver would push (queue changes first, then a status update). Events go
//! through the most recently registered sink, so they carry whatever
//! generation the coordinator stamped that sink with.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatch::RemoteEventSink;
use crate::error::{RemoteError, RemoteResult};
use crate::media::{ContentLocator, MediaDescriptor, QueueItem, QueueItemId};
use crate::protocol_constants::QUEUE_PRELOAD_TIME_SECS;
use crate::remote::{
    DisconnectReason, IdleReason, LoadRequest, MediaStatus, QueueChange, QueueSnapshot,
    RemoteEvent, RemotePlayerState, RemoteSessionService, RepeatMode,
};
use crate::state::Generation;

/// Request as recorded by [`SimulatedReceiver`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Load(LoadRequest),
    Play,
    Pause,
    Seek(u64),
    Stop,
    QueueLoad {
        items: Vec<QueueItem>,
        start_index: usize,
    },
    QueueInsert {
        items: Vec<QueueItem>,
        insert_before: Option<QueueItemId>,
    },
    QueueInsertAndPlay {
        item: QueueItem,
        insert_before: Option<QueueItemId>,
    },
    QueueRemove(Vec<QueueItemId>),
    QueueMove {
        item_id: QueueItemId,
        new_index: usize,
    },
    QueueJump(QueueItemId),
    QueueFetch(Vec<QueueItemId>),
}

struct ReceiverInner {
    sink: Option<RemoteEventSink>,
    /// Sinks replaced by later registrations, oldest first.
    retired_sinks: Vec<RemoteEventSink>,
    session_id: Option<String>,
    queue: Vec<QueueItem>,
    next_item_id: u32,
    current_item_id: Option<QueueItemId>,
    player_state: RemotePlayerState,
    idle_reason: Option<IdleReason>,
    position_ms: u64,
    media: Option<Arc<MediaDescriptor>>,
    repeat_mode: RepeatMode,
    calls: Vec<RemoteCall>,
    fail_next: Option<RemoteError>,
}

impl Default for ReceiverInner {
    fn default() -> Self {
        Self {
            sink: None,
            retired_sinks: Vec::new(),
            session_id: None,
            queue: Vec::new(),
            next_item_id: 1,
            current_item_id: None,
            player_state: RemotePlayerState::Idle,
            idle_reason: None,
            position_ms: 0,
            media: None,
            repeat_mode: RepeatMode::Off,
            calls: Vec::new(),
            fail_next: None,
        }
    }
}

impl ReceiverInner {
    fn assign_id(&mut self, item: QueueItem) -> QueueItem {
        let id = QueueItemId(self.next_item_id);
        self.next_item_id += 1;
        item.with_id(id)
    }

    fn position_of(&self, item_id: QueueItemId) -> Option<usize> {
        self.queue.iter().position(|item| item.id == Some(item_id))
    }

    fn upcoming_item_id(&self) -> Option<QueueItemId> {
        let current = self.position_of(self.current_item_id?)?;
        self.queue.get(current + 1).and_then(|item| item.id)
    }

    fn item_ids(&self) -> Vec<QueueItemId> {
        self.queue.iter().filter_map(|item| item.id).collect()
    }

    fn status(&self) -> MediaStatus {
        MediaStatus {
            player_state: self.player_state,
            idle_reason: self.idle_reason,
            position_ms: self.position_ms,
            media: self.media.clone(),
            current_item_id: self.current_item_id,
            preloaded_item_id: self.upcoming_item_id(),
            repeat_mode: self.repeat_mode,
        }
    }

    fn start_item(&mut self, item_id: Option<QueueItemId>) {
        self.current_item_id = item_id;
        self.media = item_id
            .and_then(|id| self.position_of(id))
            .map(|position| self.queue[position].media.clone());
        self.position_ms = 0;
        if self.media.is_some() {
            self.player_state = RemotePlayerState::Playing;
            self.idle_reason = None;
        } else {
            self.player_state = RemotePlayerState::Idle;
            self.idle_reason = Some(IdleReason::Finished);
        }
    }
}

/// Remote session double backed by an in-memory receiver model.
#[derive(Default)]
pub struct SimulatedReceiver {
    inner: Mutex<ReceiverInner>,
}

impl SimulatedReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Test controls
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a session and reports `Connected`. Returns the session id.
    pub fn connect(&self) -> String {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.inner.lock().session_id = Some(session_id.clone());
        self.emit(RemoteEvent::Connected {
            session_id: session_id.clone(),
        });
        session_id
    }

    /// Closes the session, forgets the receiver queue and reports
    /// `Disconnected`.
    pub fn disconnect(&self, reason: DisconnectReason) -> bool {
        {
            let mut inner = self.inner.lock();
            inner.session_id = None;
            inner.queue.clear();
            inner.current_item_id = None;
            inner.media = None;
            inner.player_state = RemotePlayerState::Idle;
        }
        self.emit(RemoteEvent::Disconnected { reason })
    }

    /// Fills the receiver queue with `count` generated items, the first one
    /// current and paused. Emits nothing. Returns the assigned ids.
    pub fn seed_queue(&self, count: usize) -> Vec<QueueItemId> {
        let mut inner = self.inner.lock();
        inner.queue.clear();
        for index in 0..count {
            let media = MediaDescriptor::new(
                ContentLocator::Url(format!("https://media.example.com/track-{}.mp3", index)),
                "audio/mpeg",
                format!("Track {}", index),
            )
            .with_duration_ms(180_000);
            let item = inner.assign_id(QueueItem::new(Arc::new(media), 20.0));
            inner.queue.push(item);
        }
        let first = inner.queue.first().and_then(|item| item.id);
        inner.start_item(first);
        if first.is_some() {
            inner.player_state = RemotePlayerState::Paused;
        }
        inner.item_ids()
    }

    /// Sends an arbitrary event through the current sink.
    pub fn emit(&self, event: RemoteEvent) -> bool {
        let sink = self.inner.lock().sink.clone();
        match sink {
            Some(sink) => sink.send(event),
            None => false,
        }
    }

    /// Sends an event through the sink registered before the current one,
    /// like a callback that was already in flight when the sink was replaced.
    pub fn emit_through_retired(&self, event: RemoteEvent) -> bool {
        let sink = self.inner.lock().retired_sinks.last().cloned();
        match sink {
            Some(sink) => sink.send(event),
            None => false,
        }
    }

    /// Moves the receiver's playback to `state` at `position_ms` and reports
    /// the new status.
    pub fn set_playback(&self, state: RemotePlayerState, position_ms: u64) -> bool {
        let status = {
            let mut inner = self.inner.lock();
            inner.player_state = state;
            inner.position_ms = position_ms;
            if state != RemotePlayerState::Idle {
                inner.idle_reason = None;
            }
            inner.status()
        };
        self.emit(RemoteEvent::StatusChanged(status))
    }

    /// Plays the current item to its end and advances like autoplay would.
    pub fn finish_current(&self) -> bool {
        let status = {
            let mut inner = self.inner.lock();
            let next = inner.upcoming_item_id();
            inner.start_item(next);
            inner.status()
        };
        self.emit(RemoteEvent::StatusChanged(status))
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<RemoteCall> {
        std::mem::take(&mut self.inner.lock().calls)
    }

    /// Makes the next request fail with `error`.
    pub fn fail_next(&self, error: RemoteError) {
        self.inner.lock().fail_next = Some(error);
    }

    /// Generation of the sink events currently go through.
    pub fn sink_generation(&self) -> Option<Generation> {
        self.inner.lock().sink.as_ref().map(|sink| sink.generation())
    }

    pub fn queue_ids(&self) -> Vec<QueueItemId> {
        self.inner.lock().item_ids()
    }

    pub fn current_item_id(&self) -> Option<QueueItemId> {
        self.inner.lock().current_item_id
    }

    pub fn position_ms(&self) -> u64 {
        self.inner.lock().position_ms
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Records the call, applies it when the session accepts it, then sends
    /// the resulting events outside the lock.
    fn request<F>(&self, call: RemoteCall, apply: F) -> RemoteResult<()>
    where
        F: FnOnce(&mut ReceiverInner) -> Vec<RemoteEvent>,
    {
        let (sink, events) = {
            let mut inner = self.inner.lock();
            inner.calls.push(call);
            if let Some(error) = inner.fail_next.take() {
                return Err(error);
            }
            if inner.session_id.is_none() {
                return Err(RemoteError::NotConnected);
            }
            let events = apply(&mut inner);
            (inner.sink.clone(), events)
        };
        if let Some(sink) = sink {
            for event in events {
                sink.send(event);
            }
        }
        Ok(())
    }
}

impl RemoteSessionService for SimulatedReceiver {
    fn register_sink(&self, sink: RemoteEventSink) {
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.sink.replace(sink) {
            inner.retired_sinks.push(previous);
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().session_id.is_some()
    }

    /// Replaces the receiver queue with a single item holding the media.
    fn load(&self, request: LoadRequest) -> RemoteResult<()> {
        self.request(RemoteCall::Load(request.clone()), |inner| {
            let item = QueueItem::new(request.media.clone(), QUEUE_PRELOAD_TIME_SECS);
            let item = inner.assign_id(item);
            inner.current_item_id = item.id;
            inner.queue = vec![item];
            inner.media = Some(request.media.clone());
            inner.position_ms = request.position_ms;
            inner.idle_reason = None;
            inner.player_state = if request.autoplay {
                RemotePlayerState::Playing
            } else {
                RemotePlayerState::Paused
            };
            let mut buffering = inner.status();
            buffering.player_state = RemotePlayerState::Buffering;
            vec![
                RemoteEvent::QueueChanged(QueueChange::Reloaded {
                    item_ids: inner.item_ids(),
                }),
                RemoteEvent::StatusChanged(buffering),
                RemoteEvent::StatusChanged(inner.status()),
            ]
        })
    }

    fn play(&self) -> RemoteResult<()> {
        self.request(RemoteCall::Play, |inner| {
            inner.player_state = RemotePlayerState::Playing;
            vec![RemoteEvent::StatusChanged(inner.status())]
        })
    }

    fn pause(&self) -> RemoteResult<()> {
        self.request(RemoteCall::Pause, |inner| {
            inner.player_state = RemotePlayerState::Paused;
            vec![RemoteEvent::StatusChanged(inner.status())]
        })
    }

    fn seek(&self, position_ms: u64) -> RemoteResult<()> {
        self.request(RemoteCall::Seek(position_ms), |inner| {
            inner.position_ms = position_ms;
            vec![RemoteEvent::StatusChanged(inner.status())]
        })
    }

    fn stop(&self) -> RemoteResult<()> {
        self.request(RemoteCall::Stop, |inner| {
            inner.player_state = RemotePlayerState::Idle;
            inner.idle_reason = Some(IdleReason::Cancelled);
            inner.media = None;
            inner.current_item_id = None;
            inner.position_ms = 0;
            vec![RemoteEvent::StatusChanged(inner.status())]
        })
    }

    fn queue_snapshot(&self) -> Option<QueueSnapshot> {
        let inner = self.inner.lock();
        if inner.session_id.is_none() || inner.queue.is_empty() {
            return None;
        }
        Some(QueueSnapshot {
            item_ids: inner.item_ids(),
            current_item_id: inner.current_item_id,
            upcoming_item_id: inner.upcoming_item_id(),
            repeat_mode: inner.repeat_mode,
        })
    }

    fn queue_load(
        &self,
        items: Vec<QueueItem>,
        start_index: usize,
        repeat_mode: RepeatMode,
    ) -> RemoteResult<()> {
        let call = RemoteCall::QueueLoad {
            items: items.clone(),
            start_index,
        };
        self.request(call, |inner| {
            let items: Vec<QueueItem> = items
                .into_iter()
                .map(|item| inner.assign_id(item))
                .collect();
            inner.queue = items;
            inner.repeat_mode = repeat_mode;
            let start = inner
                .queue
                .get(start_index)
                .or_else(|| inner.queue.first())
                .and_then(|item| item.id);
            inner.start_item(start);
            vec![
                RemoteEvent::QueueChanged(QueueChange::Reloaded {
                    item_ids: inner.item_ids(),
                }),
                RemoteEvent::StatusChanged(inner.status()),
            ]
        })
    }

    fn queue_insert(
        &self,
        items: Vec<QueueItem>,
        insert_before: Option<QueueItemId>,
    ) -> RemoteResult<()> {
        let call = RemoteCall::QueueInsert {
            items: items.clone(),
            insert_before,
        };
        self.request(call, |inner| {
            let index = insert_before
                .and_then(|id| inner.position_of(id))
                .unwrap_or(inner.queue.len());
            let items: Vec<QueueItem> = items
                .into_iter()
                .map(|item| inner.assign_id(item))
                .collect();
            let item_ids = items.iter().filter_map(|item| item.id).collect();
            inner.queue.splice(index..index, items);
            vec![
                RemoteEvent::QueueChanged(QueueChange::Inserted { index, item_ids }),
                RemoteEvent::StatusChanged(inner.status()),
            ]
        })
    }

    fn queue_insert_and_play(
        &self,
        item: QueueItem,
        insert_before: Option<QueueItemId>,
    ) -> RemoteResult<()> {
        let call = RemoteCall::QueueInsertAndPlay {
            item: item.clone(),
            insert_before,
        };
        self.request(call, |inner| {
            let index = insert_before
                .and_then(|id| inner.position_of(id))
                .unwrap_or(inner.queue.len());
            let item = inner.assign_id(item);
            let item_id = item.id;
            inner.queue.insert(index, item);
            inner.start_item(item_id);
            vec![
                RemoteEvent::QueueChanged(QueueChange::Inserted {
                    index,
                    item_ids: item_id.into_iter().collect(),
                }),
                RemoteEvent::StatusChanged(inner.status()),
            ]
        })
    }

    fn queue_remove(&self, item_ids: &[QueueItemId]) -> RemoteResult<()> {
        let item_ids = item_ids.to_vec();
        self.request(RemoteCall::QueueRemove(item_ids.clone()), |inner| {
            let indices: Vec<usize> = item_ids
                .iter()
                .filter_map(|id| inner.position_of(*id))
                .collect();
            if indices.is_empty() {
                return Vec::new();
            }

            // Current item removed: advance to whatever takes its place
            let current_position = inner.current_item_id.and_then(|id| inner.position_of(id));
            inner.queue.retain(|item| !item.id.is_some_and(|id| item_ids.contains(&id)));
            if let Some(position) = current_position {
                if indices.contains(&position) {
                    let next = inner.queue.get(position).and_then(|item| item.id);
                    inner.start_item(next);
                }
            }
            vec![
                RemoteEvent::QueueChanged(QueueChange::Removed { indices }),
                RemoteEvent::StatusChanged(inner.status()),
            ]
        })
    }

    fn queue_move(&self, item_id: QueueItemId, new_index: usize) -> RemoteResult<()> {
        self.request(RemoteCall::QueueMove { item_id, new_index }, |inner| {
            let Some(from) = inner.position_of(item_id) else {
                return Vec::new();
            };
            let item = inner.queue.remove(from);
            let to = new_index.min(inner.queue.len());
            inner.queue.insert(to, item);
            vec![
                RemoteEvent::QueueChanged(QueueChange::Moved { from, to }),
                RemoteEvent::StatusChanged(inner.status()),
            ]
        })
    }

    fn queue_jump_to(&self, item_id: QueueItemId) -> RemoteResult<()> {
        self.request(RemoteCall::QueueJump(item_id), |inner| {
            if inner.position_of(item_id).is_none() {
                return Vec::new();
            }
            inner.start_item(Some(item_id));
            vec![RemoteEvent::StatusChanged(inner.status())]
        })
    }

    fn queue_fetch(&self, item_ids: &[QueueItemId]) -> RemoteResult<()> {
        let item_ids = item_ids.to_vec();
        self.request(RemoteCall::QueueFetch(item_ids.clone()), |inner| {
            let items: Vec<QueueItem> = item_ids
                .iter()
                .filter_map(|id| inner.position_of(*id))
                .map(|position| inner.queue[position].clone())
                .collect();
            vec![RemoteEvent::QueueChanged(QueueChange::Updated { items })]
        })
    }
}
