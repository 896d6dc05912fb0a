//! Player bootstrap and dependency wiring.
//!
//! This module is the composition root: the single place where the event
//! bridge, timer scheduler, player and dispatcher task are created and wired
//! together.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::error::ConfigError;
use crate::events::{BroadcastEventBridge, EventEmitter};
use crate::player::{Collaborators, Player};
use crate::runtime::{run_dispatcher, PlayerHandle, TaskSpawner, TokioSpawner};
use crate::state::CoreConfig;
use crate::timer::{TimerScheduler, TokioTimerScheduler};

/// Everything a host needs to drive and observe a running player.
#[derive(Clone)]
pub struct BootstrappedPlayer {
    /// Posts commands to the dispatcher.
    pub handle: PlayerHandle,
    /// Event bridge for subscribers and an optional external emitter.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedPlayer {
    /// Stops the dispatcher and every timer it owns.
    ///
    /// Queued commands are applied first. The token is cancelled afterwards
    /// so a dispatcher that never drains still stops.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning shutdown...");
        if !self.handle.shutdown() {
            log::debug!("[Bootstrap] Dispatcher already stopped");
        }
        self.cancel_token.cancel();
        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Wires a player around `collaborators` and starts its dispatcher task.
///
/// Wiring order:
///
/// 1. Config validation
/// 2. Event bridge and cancellation token
/// 3. Dispatcher channel and timer scheduler (depends on dispatcher)
/// 4. Player (depends on all of the above)
/// 5. Dispatcher task
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime context.
///
/// # Errors
///
/// Returns an error if `config` does not validate.
pub fn bootstrap_player(
    config: &CoreConfig,
    collaborators: Collaborators,
) -> Result<BootstrappedPlayer, ConfigError> {
    config.validate()?;

    let spawner = TokioSpawner::current();
    let event_bridge = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));
    let cancel_token = CancellationToken::new();

    let (dispatcher, rx) = Dispatcher::channel();
    let scheduler: Arc<dyn TimerScheduler> = Arc::new(TokioTimerScheduler::new(
        dispatcher.clone(),
        spawner.clone(),
    ));

    let player = Player::new(
        config,
        collaborators,
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        scheduler,
        dispatcher.clone(),
    );

    spawner.spawn(run_dispatcher(player, rx, cancel_token.clone()));
    log::info!(
        "[Bootstrap] Player started (poll {}ms, cache {})",
        config.playback.position_poll_interval_ms,
        config.queue.cache_capacity
    );

    Ok(BootstrappedPlayer {
        handle: PlayerHandle::new(dispatcher),
        event_bridge,
        spawner,
        cancel_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PlaybackEvent, QueueEvent};
    use crate::media::{ContentLocator, MediaDescriptor};
    use crate::sim::{RecordingProxy, SimulatedEngine, SimulatedReceiver};
    use crate::state::PlaybackState;
    use parking_lot::Mutex;

    /// Records the states of every playback event it sees.
    #[derive(Default)]
    struct RecordingEmitter {
        states: Mutex<Vec<PlaybackState>>,
    }

    impl EventEmitter for RecordingEmitter {
        fn emit_playback(&self, event: PlaybackEvent) {
            if let PlaybackEvent::StateChanged { state, .. } = event {
                self.states.lock().push(state);
            }
        }

        fn emit_queue(&self, _event: QueueEvent) {}
    }

    fn collaborators() -> Collaborators {
        Collaborators {
            engine: Box::new(SimulatedEngine::new()),
            remote: Arc::new(SimulatedReceiver::new()),
            proxy: Box::new(RecordingProxy::new()),
        }
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let mut config = CoreConfig::default();
        config.queue.cache_capacity = 0;

        assert!(bootstrap_player(&config, collaborators()).is_err());
    }

    #[tokio::test]
    async fn shutdown_stops_dispatcher() {
        let player = bootstrap_player(&CoreConfig::default(), collaborators()).unwrap();
        assert!(player.handle.snapshot().await.is_some());

        player.shutdown();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(player.handle.snapshot().await.is_none());
        assert!(player.cancel_token.is_cancelled());
    }

    #[tokio::test]
    async fn external_emitter_installed_after_start_sees_events() {
        let player = bootstrap_player(&CoreConfig::default(), collaborators()).unwrap();
        let external = Arc::new(RecordingEmitter::default());
        player
            .event_bridge
            .set_external_emitter(Arc::clone(&external) as Arc<dyn EventEmitter>);
        let mut subscriber = player.event_bridge.subscribe();

        let media = MediaDescriptor::new(
            ContentLocator::Url("https://example.com/a.mp4".into()),
            "video/mp4",
            "a",
        );
        assert!(player.handle.play(media, 0));
        // The engine's start report is queued behind the first snapshot
        assert!(player.handle.snapshot().await.is_some());
        assert!(player.handle.snapshot().await.is_some());

        assert_eq!(
            *external.states.lock(),
            vec![PlaybackState::Preparing, PlaybackState::Playing]
        );
        // Subscribers still receive everything the external emitter saw
        assert!(subscriber.try_recv().is_ok());

        player.shutdown();
    }
}
