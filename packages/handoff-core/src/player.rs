//! The dispatcher-side owner of the coordinator and the queue mirror.
//!
//! [`Player::handle`] applies one [`DispatchMessage`] at a time. It is the
//! only place remote callbacks are checked against the current generation
//! and fanned out to both components.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::dispatch::{DispatchMessage, Dispatcher, PlayerCommand};
use crate::engine::LocalPlaybackEngine;
use crate::error::CommandResult;
use crate::events::EventEmitter;
use crate::proxy::NotificationProxy;
use crate::remote::{RemoteEvent, RemoteSessionService};
use crate::services::{PlaybackCoordinator, QueueMirror, QueueView};
use crate::state::{CoreConfig, Generation, PlaybackSession};
use crate::timer::TimerScheduler;

/// The platform collaborators a player drives.
pub struct Collaborators {
    pub engine: Box<dyn LocalPlaybackEngine>,
    pub remote: Arc<dyn RemoteSessionService>,
    pub proxy: Box<dyn NotificationProxy>,
}

/// Whether the dispatcher keeps running after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

/// Point-in-time view of the whole player.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub session: PlaybackSession,
    pub position_ms: u64,
    pub queue: QueueView,
}

impl PlayerSnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Coordinator plus queue mirror, driven by dispatcher messages.
pub struct Player {
    coordinator: PlaybackCoordinator,
    queue: QueueMirror,
}

impl Player {
    pub fn new(
        config: &CoreConfig,
        collaborators: Collaborators,
        emitter: Arc<dyn EventEmitter>,
        scheduler: Arc<dyn TimerScheduler>,
        dispatcher: Dispatcher,
    ) -> Self {
        let Collaborators {
            engine,
            remote,
            proxy,
        } = collaborators;

        let queue = QueueMirror::new(config.queue.clone(), remote.clone(), emitter.clone());
        let coordinator = PlaybackCoordinator::new(
            config.playback.clone(),
            engine,
            remote,
            proxy,
            emitter,
            scheduler,
            dispatcher,
        );

        Self { coordinator, queue }
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut PlaybackCoordinator {
        &mut self.coordinator
    }

    pub fn queue(&self) -> &QueueMirror {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut QueueMirror {
        &mut self.queue
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            session: self.coordinator.session().clone(),
            position_ms: self.coordinator.current_position(),
            queue: self.queue.view(),
        }
    }

    /// Applies one message.
    pub fn handle(&mut self, message: DispatchMessage) -> Flow {
        match message {
            DispatchMessage::Command(command) => self.handle_command(command),
            DispatchMessage::Control(request) => {
                if let Err(e) = self.coordinator.on_control(request) {
                    log::warn!("[Player] Control {:?} failed: {}", request.action, e);
                    self.coordinator.report_failure("control", &e);
                }
            }
            DispatchMessage::Remote { generation, event } => self.handle_remote(generation, event),
            DispatchMessage::Engine(event) => self.coordinator.on_engine_event(event),
            DispatchMessage::Timer(tick) => self.coordinator.on_timer(tick),
            DispatchMessage::Snapshot(reply) => {
                // Receiver gone means the caller stopped waiting
                let _ = reply.send(self.snapshot());
            }
            DispatchMessage::Shutdown => return Flow::Shutdown,
        }
        Flow::Continue
    }

    /// Applies every message already queued on `rx` without waiting.
    ///
    /// Returns the number of messages handled, stopping early on shutdown.
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<DispatchMessage>) -> usize {
        let mut handled = 0;
        while let Ok(message) = rx.try_recv() {
            handled += 1;
            if self.handle(message) == Flow::Shutdown {
                break;
            }
        }
        handled
    }

    /// Releases timers and playback. Called when the dispatcher stops.
    pub fn shutdown(&mut self) {
        self.coordinator.destroy();
        self.queue.clear_listener();
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        let name = command.name();
        let result: CommandResult<()> = match command {
            PlayerCommand::Play {
                media,
                start_position_ms,
            } => self.coordinator.play(media, start_position_ms),
            PlayerCommand::Pause => self.coordinator.pause(),
            PlayerCommand::Resume => self.coordinator.resume(),
            PlayerCommand::Seek { position_ms } => self.coordinator.seek(position_ms),
            PlayerCommand::Stop => self.coordinator.stop(),
            PlayerCommand::ShowControls => {
                self.coordinator.show_controls();
                Ok(())
            }
            PlayerCommand::Destroy => {
                self.coordinator.destroy();
                Ok(())
            }
            PlayerCommand::RemoveAt { position } => self.queue.remove_at(position),
            PlayerCommand::RemoveAll => self.queue.remove_all(),
            PlayerCommand::MoveItem { from, to } => self.queue.move_item(from, to),
            PlayerCommand::JumpTo { item_id } => self.queue.jump_to(item_id),
            PlayerCommand::PlayItemAt { position } => self.queue.play_item_at(position),
            PlayerCommand::PlayUpcoming => self.queue.play_upcoming(),
            PlayerCommand::StopAfterCurrent => self.queue.stop_after_current(),
            PlayerCommand::Enqueue { media, mode } => self.queue.enqueue(media, mode),
        };

        if let Err(e) = result {
            log::warn!("[Player] Command {} failed: {}", name, e);
            self.coordinator.report_failure(name, &e);
        }
    }

    fn handle_remote(&mut self, generation: Generation, event: RemoteEvent) {
        if !self.coordinator.accepts(generation) {
            log::debug!(
                "[Player] Dropping stale remote event from {} (current {})",
                generation,
                self.coordinator.generation()
            );
            return;
        }

        match event {
            RemoteEvent::Connected { session_id } => {
                self.coordinator.on_remote_connected(&session_id);
                self.queue.attach();
            }
            RemoteEvent::Disconnected { reason } => {
                self.coordinator.on_remote_disconnected(&reason);
                self.queue.detach();
            }
            RemoteEvent::StatusChanged(status) => {
                self.queue.on_status(&status);
                self.coordinator.on_remote_status(status);
            }
            RemoteEvent::QueueChanged(change) => self.queue.apply_change(change),
            RemoteEvent::CommandRejected { command, reason } => {
                self.coordinator.on_remote_rejected(command, &reason);
            }
        }
    }
}
