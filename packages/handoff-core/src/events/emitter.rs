//! Event emitter abstraction for decoupling components from transport.
//!
//! Components depend on the [`EventEmitter`] trait rather than concrete broadcast
//! channels, enabling testing and alternative transport implementations.

use super::{PlaybackEvent, QueueEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// The coordinator and queue mirror use this trait to emit events, decoupling
/// them from the specifics of how events reach observers (UI, logs, tests).
///
/// Emission happens on the dispatcher; implementations must not block.
///
/// # Example
///
/// ```ignore
/// struct MyComponent {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl MyComponent {
///     fn do_something(&self) {
///         self.emitter.emit_playback(PlaybackEvent::ControlsVisibility { ... });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a playback session event.
    fn emit_playback(&self, event: PlaybackEvent);

    /// Emits a queue mirror event.
    fn emit_queue(&self, event: QueueEvent);
}

/// No-op emitter for headless use or testing.
///
/// Events are silently discarded.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_playback(&self, _event: PlaybackEvent) {
        // No-op
    }

    fn emit_queue(&self, _event: QueueEvent) {
        // No-op
    }
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level. Useful for debugging event flow
/// or in development environments.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_playback(&self, event: PlaybackEvent) {
        tracing::debug!(?event, "playback_event");
    }

    fn emit_queue(&self, event: QueueEvent) {
        tracing::debug!(?event, "queue_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::QueueNotification;
    use crate::state::{PlaybackLocation, PlaybackState};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test emitter that counts events.
    struct CountingEventEmitter {
        playback_count: AtomicUsize,
        queue_count: AtomicUsize,
    }

    impl CountingEventEmitter {
        fn new() -> Self {
            Self {
                playback_count: AtomicUsize::new(0),
                queue_count: AtomicUsize::new(0),
            }
        }
    }

    impl EventEmitter for CountingEventEmitter {
        fn emit_playback(&self, _event: PlaybackEvent) {
            self.playback_count.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_queue(&self, _event: QueueEvent) {
            self.queue_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn counting_emitter_tracks_events() {
        let emitter = Arc::new(CountingEventEmitter::new());

        emitter.emit_playback(PlaybackEvent::StateChanged {
            location: PlaybackLocation::Local,
            state: PlaybackState::Preparing,
            title: None,
            timestamp: 0,
        });
        emitter.emit_playback(PlaybackEvent::ControlsVisibility {
            visible: true,
            timestamp: 0,
        });
        emitter.emit_queue(QueueEvent {
            change: QueueNotification::Detached,
            count: 0,
            attached: false,
            timestamp: 0,
        });

        assert_eq!(emitter.playback_count.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.queue_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_and_logging_emitters_accept_events() {
        let emitters: Vec<Arc<dyn EventEmitter>> =
            vec![Arc::new(NoopEventEmitter), Arc::new(LoggingEventEmitter)];
        for emitter in emitters {
            emitter.emit_playback(PlaybackEvent::Progress {
                position_ms: 1000,
                duration_ms: Some(60_000),
                timestamp: 0,
            });
        }
    }
}
