//! Task spawning and the dispatcher loop.
//!
//! [`TaskSpawner`] keeps timer and dispatcher tasks off any particular
//! runtime. [`run_dispatcher`] drives a [`Player`] from its message channel,
//! and [`PlayerHandle`] is the cloneable front door callers post through.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::dispatch::{ControlHandle, DispatchMessage, Dispatcher, PlayerCommand};
use crate::media::{MediaDescriptor, QueueItemId};
use crate::player::{Flow, Player, PlayerSnapshot};
use crate::services::EnqueueMode;

/// Abstraction for spawning background tasks.
///
/// Implementations should let tasks run to completion even if the spawner
/// itself is dropped.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task. There is no join or cancel
    /// through the spawner; tasks watch a token instead.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a spawner on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher loop
// ─────────────────────────────────────────────────────────────────────────────

/// Applies messages to `player` one at a time until shutdown.
///
/// Stops on [`DispatchMessage::Shutdown`], on cancellation of `cancel`, or
/// when every sender is gone. The player is torn down before returning.
pub async fn run_dispatcher(
    mut player: Player,
    mut rx: mpsc::UnboundedReceiver<DispatchMessage>,
    cancel: CancellationToken,
) {
    log::info!("[Dispatcher] Started");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("[Dispatcher] Cancelled");
                break;
            }
            message = rx.recv() => match message {
                Some(message) => {
                    if player.handle(message) == Flow::Shutdown {
                        break;
                    }
                }
                None => break,
            },
        }
    }
    player.shutdown();
    log::info!("[Dispatcher] Stopped");
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Cloneable handle that posts commands to a running player.
///
/// Every method returns `false` once the dispatcher has stopped. Command
/// failures are reported as `CommandFailed` events, not through the handle.
#[derive(Clone)]
pub struct PlayerHandle {
    dispatcher: Dispatcher,
}

impl PlayerHandle {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn send(&self, command: PlayerCommand) -> bool {
        self.dispatcher.post(DispatchMessage::Command(command))
    }

    pub fn play(&self, media: impl Into<Arc<MediaDescriptor>>, start_position_ms: u64) -> bool {
        self.send(PlayerCommand::Play {
            media: media.into(),
            start_position_ms,
        })
    }

    pub fn pause(&self) -> bool {
        self.send(PlayerCommand::Pause)
    }

    pub fn resume(&self) -> bool {
        self.send(PlayerCommand::Resume)
    }

    pub fn seek(&self, position_ms: u64) -> bool {
        self.send(PlayerCommand::Seek { position_ms })
    }

    pub fn stop(&self) -> bool {
        self.send(PlayerCommand::Stop)
    }

    pub fn show_controls(&self) -> bool {
        self.send(PlayerCommand::ShowControls)
    }

    pub fn destroy(&self) -> bool {
        self.send(PlayerCommand::Destroy)
    }

    pub fn remove_at(&self, position: usize) -> bool {
        self.send(PlayerCommand::RemoveAt { position })
    }

    pub fn remove_all(&self) -> bool {
        self.send(PlayerCommand::RemoveAll)
    }

    pub fn move_item(&self, from: usize, to: usize) -> bool {
        self.send(PlayerCommand::MoveItem { from, to })
    }

    pub fn jump_to(&self, item_id: QueueItemId) -> bool {
        self.send(PlayerCommand::JumpTo { item_id })
    }

    pub fn play_item_at(&self, position: usize) -> bool {
        self.send(PlayerCommand::PlayItemAt { position })
    }

    pub fn play_upcoming(&self) -> bool {
        self.send(PlayerCommand::PlayUpcoming)
    }

    pub fn stop_after_current(&self) -> bool {
        self.send(PlayerCommand::StopAfterCurrent)
    }

    pub fn enqueue(&self, media: impl Into<Arc<MediaDescriptor>>, mode: EnqueueMode) -> bool {
        self.send(PlayerCommand::Enqueue {
            media: media.into(),
            mode,
        })
    }

    /// Handle for wiring platform controls to the player.
    pub fn controls(&self) -> ControlHandle {
        self.dispatcher.control_handle()
    }

    /// Waits for the dispatcher to reach this request and returns its view.
    ///
    /// Every message posted before this call has been applied by then.
    pub async fn snapshot(&self) -> Option<PlayerSnapshot> {
        let (tx, rx) = oneshot::channel();
        if !self.dispatcher.post(DispatchMessage::Snapshot(tx)) {
            return None;
        }
        rx.await.ok()
    }

    /// Asks the dispatcher to stop after the messages already queued.
    pub fn shutdown(&self) -> bool {
        self.dispatcher.post(DispatchMessage::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::events::NoopEventEmitter;
    use crate::media::ContentLocator;
    use crate::player::Collaborators;
    use crate::sim::{ManualTimerScheduler, RecordingProxy, SimulatedEngine, SimulatedReceiver};
    use crate::state::{CoreConfig, PlaybackState};

    fn spawn_player() -> (PlayerHandle, CancellationToken, tokio::task::JoinHandle<()>) {
        let (dispatcher, rx) = Dispatcher::channel();
        let player = Player::new(
            &CoreConfig::default(),
            Collaborators {
                engine: Box::new(SimulatedEngine::new()),
                remote: Arc::new(SimulatedReceiver::new()),
                proxy: Box::new(RecordingProxy::new()),
            },
            Arc::new(NoopEventEmitter),
            Arc::new(ManualTimerScheduler::new()),
            dispatcher.clone(),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_dispatcher(player, rx, cancel.clone()));
        (PlayerHandle::new(dispatcher), cancel, task)
    }

    #[tokio::test]
    async fn tokio_spawner_executes_task() {
        let spawner = TokioSpawner::current();
        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = executed.clone();

        spawner.spawn(async move {
            executed_clone.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(executed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn snapshot_observes_earlier_commands() {
        let (handle, _cancel, task) = spawn_player();
        let media = MediaDescriptor::new(
            ContentLocator::Url("https://example.com/a.mp4".into()),
            "video/mp4",
            "A",
        );

        assert!(handle.play(media, 5_000));
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.session.state, PlaybackState::Preparing);

        // Started from the engine was queued behind the snapshot request
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.session.state, PlaybackState::Playing);

        assert!(handle.shutdown());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_stops_dispatcher() {
        let (handle, cancel, task) = spawn_player();
        cancel.cancel();
        task.await.unwrap();

        assert!(!handle.pause());
        assert!(handle.snapshot().await.is_none());
    }
}
