//! Bridge implementation that maps domain events to broadcast transport.
//!
//! The [`BroadcastEventBridge`] lives at the boundary between the core and
//! its observers, mapping typed domain events onto a broadcast channel.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::emitter::EventEmitter;
use super::{BroadcastEvent, PlaybackEvent, QueueEvent};

/// Bridges domain events to a broadcast channel.
///
/// This adapter implements [`EventEmitter`] by forwarding events to
/// a `tokio::sync::broadcast` channel that observers subscribe to.
///
/// For platform-specific emission (e.g. a UI layer), the bridge also
/// forwards to an optional external emitter that can be set after construction.
///
/// # Thread Safety
///
/// The bridge is `Send + Sync` and can be shared across async tasks.
/// The external emitter uses `RwLock` to allow setting it after construction.
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<BroadcastEvent>,
    /// Optional external emitter for platform-specific event delivery
    external_emitter: Arc<RwLock<Option<Arc<dyn EventEmitter>>>>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an external emitter for platform-specific event delivery.
    ///
    /// Can be called after construction, which is useful when the platform
    /// handle isn't available until later.
    pub fn set_external_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.tx.subscribe()
    }
}

/// Generates an [`EventEmitter`] method that forwards to the external emitter
/// (if set) and then sends to the broadcast channel.
macro_rules! impl_emit {
    ($method:ident, $event_ty:ty, $variant:ident) => {
        fn $method(&self, event: $event_ty) {
            if let Some(ref emitter) = *self.external_emitter.read() {
                emitter.$method(event.clone());
            }
            if let Err(e) = self.tx.send(BroadcastEvent::$variant(event)) {
                log::trace!("[EventBridge] No broadcast receivers: {}", e);
            }
        }
    };
}

impl EventEmitter for BroadcastEventBridge {
    impl_emit!(emit_playback, PlaybackEvent, Playback);
    impl_emit!(emit_queue, QueueEvent, Queue);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExternal(AtomicUsize);

    impl EventEmitter for CountingExternal {
        fn emit_playback(&self, _event: PlaybackEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_queue(&self, _event: QueueEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn bridge_without_subscribers_does_not_fail() {
        let bridge = BroadcastEventBridge::new(4);
        bridge.emit_playback(PlaybackEvent::ControlsVisibility {
            visible: false,
            timestamp: 0,
        });
    }

    #[test]
    fn bridge_delivers_to_subscriber_and_external() {
        let bridge = BroadcastEventBridge::new(4);
        let external = Arc::new(CountingExternal(AtomicUsize::new(0)));
        bridge.set_external_emitter(external.clone());
        let mut rx = bridge.subscribe();

        bridge.emit_playback(PlaybackEvent::Progress {
            position_ms: 5000,
            duration_ms: None,
            timestamp: 1,
        });

        match rx.try_recv().unwrap() {
            BroadcastEvent::Playback(PlaybackEvent::Progress { position_ms, .. }) => {
                assert_eq!(position_ms, 5000);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(external.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn broadcast_event_serializes_with_category_tag() {
        let event = BroadcastEvent::Playback(PlaybackEvent::ControlsVisibility {
            visible: true,
            timestamp: 7,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "playback");
        assert_eq!(json["type"], "controlsVisibility");
        assert_eq!(json["visible"], true);
    }
}
