//! Playback coordinator: one playback session across two locations.
//!
//! The coordinator owns the [`PlaybackSession`] and is the only writer of its
//! location, state, media and position. It routes transport commands to the
//! local engine or the remote session depending on the current location, and
//! runs the hand-off protocol when a remote session appears or goes away:
//!
//! - **Local to remote**: capture the local position, pause the engine, load
//!   the same media on the receiver at exactly that position (autoplay only
//!   if it was playing).
//! - **Remote to local**: load the media into the engine at the last
//!   reported remote position, paused.
//!
//! Every location change bumps the session generation and registers a new
//! stamped sink with the remote service, so callbacks issued for an earlier
//! location are recognised as stale and dropped by the dispatcher.

use std::sync::Arc;

use crate::dispatch::{ControlAction, ControlRequest, Dispatcher};
use crate::engine::{EngineEvent, LocalPlaybackEngine};
use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::events::{EventEmitter, PlaybackEvent};
use crate::media::MediaDescriptor;
use crate::proxy::NotificationProxy;
use crate::remote::{
    DisconnectReason, LoadRequest, MediaStatus, RemoteCommand, RemotePlayerState,
    RemoteSessionService,
};
use crate::state::{Generation, PlaybackConfig, PlaybackLocation, PlaybackSession, PlaybackState};
use crate::timer::{TimerHandle, TimerId, TimerKind, TimerSchedule, TimerScheduler, TimerTick};
use crate::utils::{format_millis, now_millis};

/// A timer the coordinator currently holds.
struct ActiveTimer {
    id: TimerId,
    handle: TimerHandle,
}

/// Slots for the two coordinator timers. At most one of each kind runs.
#[derive(Default)]
struct TimerSlots {
    position_poll: Option<ActiveTimer>,
    controls_auto_hide: Option<ActiveTimer>,
}

impl TimerSlots {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<ActiveTimer> {
        match kind {
            TimerKind::PositionPoll => &mut self.position_poll,
            TimerKind::ControlsAutoHide => &mut self.controls_auto_hide,
        }
    }

    fn is_live(&self, tick: &TimerTick) -> bool {
        let slot = match tick.kind {
            TimerKind::PositionPoll => &self.position_poll,
            TimerKind::ControlsAutoHide => &self.controls_auto_hide,
        };
        slot.as_ref().is_some_and(|timer| timer.id == tick.id)
    }
}

/// Coordinates playback between the local engine and a remote receiver.
pub struct PlaybackCoordinator {
    session: PlaybackSession,
    config: PlaybackConfig,
    engine: Box<dyn LocalPlaybackEngine>,
    remote: Arc<dyn RemoteSessionService>,
    proxy: Box<dyn NotificationProxy>,
    emitter: Arc<dyn EventEmitter>,
    scheduler: Arc<dyn TimerScheduler>,
    dispatcher: Dispatcher,
    timers: TimerSlots,
    next_timer_id: u64,
    destroyed: bool,
}

impl PlaybackCoordinator {
    /// Creates a coordinator in `Local` / `None` at the initial generation.
    ///
    /// Installs the engine sink, registers the first remote sink and binds
    /// the notification proxy's controls.
    pub fn new(
        config: PlaybackConfig,
        mut engine: Box<dyn LocalPlaybackEngine>,
        remote: Arc<dyn RemoteSessionService>,
        mut proxy: Box<dyn NotificationProxy>,
        emitter: Arc<dyn EventEmitter>,
        scheduler: Arc<dyn TimerScheduler>,
        dispatcher: Dispatcher,
    ) -> Self {
        let session = PlaybackSession::default();
        engine.set_event_sink(dispatcher.engine_sink());
        remote.register_sink(dispatcher.remote_sink(session.generation));
        proxy.bind_controls(dispatcher.control_handle());

        Self {
            session,
            config,
            engine,
            remote,
            proxy,
            emitter,
            scheduler,
            dispatcher,
            timers: TimerSlots::default(),
            next_timer_id: 0,
            destroyed: false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn location(&self) -> PlaybackLocation {
        self.session.location
    }

    pub fn state(&self) -> PlaybackState {
        self.session.state
    }

    pub fn generation(&self) -> Generation {
        self.session.generation
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether a remote callback stamped with `generation` is still current.
    pub fn accepts(&self, generation: Generation) -> bool {
        !self.destroyed && generation == self.session.generation
    }

    /// Current position in milliseconds.
    ///
    /// Local: read from the engine while media is loaded. Remote: the last
    /// position the receiver reported.
    pub fn current_position(&self) -> u64 {
        match self.session.location {
            PlaybackLocation::Local if self.session.media.is_some() => self.engine.position(),
            _ => self.session.position_ms,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts playing `media` at `start_position_ms` at the current location.
    ///
    /// The state becomes `Preparing` until the engine (or receiver) confirms.
    pub fn play(&mut self, media: Arc<MediaDescriptor>, start_position_ms: u64) -> CommandResult<()> {
        if self.destroyed {
            return Ok(());
        }
        if media.playable_locator().is_none() {
            log::warn!("[Coordinator] Rejecting '{}': no playable locator", media.title);
            return Err(CommandError::InvalidDescriptor(media.title.clone()));
        }

        match self.session.location {
            PlaybackLocation::Local => {
                self.engine.load(&media, start_position_ms)?;
                self.engine.play()?;
            }
            PlaybackLocation::Remote => {
                self.remote.load(LoadRequest {
                    media: media.clone(),
                    autoplay: true,
                    position_ms: start_position_ms,
                })?;
            }
        }

        log::info!(
            "[Coordinator] Playing '{}' {} from {}",
            media.title,
            self.session.location,
            format_millis(start_position_ms)
        );
        self.session.media = Some(media);
        self.session.position_ms = start_position_ms;
        self.transition(PlaybackState::Preparing);
        if self.session.location == PlaybackLocation::Local {
            self.restart_position_polling();
        }
        Ok(())
    }

    pub fn pause(&mut self) -> CommandResult<()> {
        if self.destroyed || self.session.state == PlaybackState::None {
            return Ok(());
        }
        match self.session.location {
            PlaybackLocation::Local => {
                self.engine.pause()?;
                self.session.position_ms = self.engine.position();
                self.cancel_timer(TimerKind::PositionPoll);
                self.transition(PlaybackState::Paused);
            }
            PlaybackLocation::Remote => {
                // State follows the receiver's status update
                self.remote.pause()?;
            }
        }
        Ok(())
    }

    pub fn resume(&mut self) -> CommandResult<()> {
        if self.destroyed || self.session.state != PlaybackState::Paused {
            return Ok(());
        }
        match self.session.location {
            PlaybackLocation::Local => {
                self.engine.play()?;
                self.transition(PlaybackState::Playing);
                self.restart_position_polling();
            }
            PlaybackLocation::Remote => {
                self.remote.play()?;
            }
        }
        Ok(())
    }

    pub fn seek(&mut self, position_ms: u64) -> CommandResult<()> {
        if self.destroyed || self.session.state == PlaybackState::None {
            return Ok(());
        }
        match self.session.location {
            PlaybackLocation::Local => {
                self.engine.seek(position_ms)?;
                self.session.position_ms = position_ms;
                self.emit_progress(position_ms);
            }
            PlaybackLocation::Remote => {
                self.remote.seek(position_ms)?;
            }
        }
        Ok(())
    }

    /// Stops playback and clears the session media.
    ///
    /// Timers are cancelled before anything else so no tick can observe the
    /// torn-down session.
    pub fn stop(&mut self) -> CommandResult<()> {
        if self.destroyed || self.session.state == PlaybackState::None {
            return Ok(());
        }
        self.cancel_all_timers();

        let result = match self.session.location {
            PlaybackLocation::Local => self.engine.stop().map_err(CommandError::from),
            PlaybackLocation::Remote => self.remote.stop().map_err(CommandError::from),
        };
        if let Err(e) = result {
            if self.session.state == PlaybackState::Playing {
                self.restart_position_polling();
            }
            return Err(e);
        }

        self.finish_session();
        Ok(())
    }

    /// Shows on-screen controls and schedules their auto-hide.
    ///
    /// While remote, controls stay visible and no hide timer runs.
    pub fn show_controls(&mut self) {
        if self.destroyed {
            return;
        }
        self.emitter.emit_playback(PlaybackEvent::ControlsVisibility {
            visible: true,
            timestamp: now_millis(),
        });
        self.cancel_timer(TimerKind::ControlsAutoHide);
        if self.session.location == PlaybackLocation::Local {
            self.start_timer(
                TimerKind::ControlsAutoHide,
                TimerSchedule::Once {
                    delay: self.config.controls_auto_hide(),
                },
            );
        }
    }

    /// Tears the coordinator down. Every later command or callback is a no-op.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.cancel_all_timers();
        if self.session.location == PlaybackLocation::Local && self.session.state != PlaybackState::None {
            if let Err(e) = self.engine.stop() {
                log::warn!("[Coordinator] Engine stop during destroy failed: {}", e);
            }
        }
        self.session.media = None;
        self.transition(PlaybackState::None);
        self.session.generation = self.session.generation.next();
        self.destroyed = true;
        log::info!("[Coordinator] Destroyed at {}", self.session.generation);
    }

    /// Handles a tap on a notification / lock-screen control.
    ///
    /// Routed by the current location, whatever location the control was
    /// rendered for.
    pub fn on_control(&mut self, request: ControlRequest) -> CommandResult<()> {
        if request.rendered_for != self.session.location {
            log::debug!(
                "[Coordinator] Control rendered for {} applied {}",
                request.rendered_for,
                self.session.location
            );
        }
        match request.action {
            ControlAction::Play => match (self.session.state, self.session.media.clone()) {
                (PlaybackState::None, Some(media)) => {
                    let position = self.session.position_ms;
                    self.play(media, position)
                }
                _ => self.resume(),
            },
            ControlAction::Pause => self.pause(),
            ControlAction::Seek(position_ms) => self.seek(position_ms),
            ControlAction::Stop => self.stop(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hand-off
    // ─────────────────────────────────────────────────────────────────────────

    /// A remote session became available: move playback to the receiver.
    pub fn on_remote_connected(&mut self, session_id: &str) {
        if self.destroyed {
            return;
        }
        if self.session.location == PlaybackLocation::Remote {
            log::debug!("[Coordinator] Already remote; ignoring connect of {}", session_id);
            return;
        }

        let was_active = self.session.state.is_active();
        let autoplay = matches!(
            self.session.state,
            PlaybackState::Playing | PlaybackState::Preparing
        );
        let position = self.current_position();
        let media = self.session.media.take();

        self.cancel_all_timers();
        if was_active {
            if let Err(e) = self.engine.pause() {
                log::warn!("[Coordinator] Local pause during hand-off failed: {}", e);
            }
        }

        self.change_location(PlaybackLocation::Remote);
        log::info!("[Coordinator] Remote session {} connected", session_id);

        let Some(media) = media.filter(|_| was_active) else {
            self.session.position_ms = 0;
            return;
        };

        log::info!(
            "[Coordinator] Handing '{}' to receiver at {} (autoplay: {})",
            media.title,
            format_millis(position),
            autoplay
        );
        self.session.position_ms = position;
        let request = LoadRequest {
            media: media.clone(),
            autoplay,
            position_ms: position,
        };
        match self.remote.load(request) {
            Ok(()) => {
                self.session.media = Some(media);
            }
            Err(e) => {
                log::warn!("[Coordinator] Remote load during hand-off failed: {}", e);
                self.report_failure("handoff_load", &CommandError::from(e));
            }
        }
    }

    /// The remote session ended: resurface playback locally, paused, at the
    /// last position the receiver reported.
    pub fn on_remote_disconnected(&mut self, reason: &DisconnectReason) {
        if self.destroyed {
            return;
        }
        if self.session.location == PlaybackLocation::Local {
            log::debug!("[Coordinator] Already local; ignoring disconnect ({})", reason);
            return;
        }

        let resumable = matches!(
            self.session.state,
            PlaybackState::Playing | PlaybackState::Paused
        );
        let position = self.session.position_ms;
        let media = self.session.media.take();

        self.cancel_all_timers();
        self.change_location(PlaybackLocation::Local);
        log::info!("[Coordinator] Remote session ended ({})", reason);

        let Some(media) = media.filter(|_| resumable) else {
            self.session.position_ms = 0;
            return;
        };

        match self.engine.load(&media, position) {
            Ok(()) => {
                log::info!(
                    "[Coordinator] Resuming '{}' locally at {}",
                    media.title,
                    format_millis(position)
                );
                self.session.media = Some(media.clone());
                self.session.position_ms = position;
                self.transition(PlaybackState::Paused);
                self.emitter.emit_playback(PlaybackEvent::LocalResumed {
                    position_ms: position,
                    title: media.title.clone(),
                    timestamp: now_millis(),
                });
            }
            Err(e) => {
                log::warn!("[Coordinator] Local load after disconnect failed: {}", e);
                self.session.position_ms = 0;
                self.report_failure("handoff_load", &CommandError::from(e));
            }
        }
    }

    /// Mirrors a receiver status update into the session.
    pub fn on_remote_status(&mut self, status: MediaStatus) {
        if self.destroyed || self.session.location != PlaybackLocation::Remote {
            return;
        }

        self.session.position_ms = status.position_ms;
        if let Some(media) = status.media {
            self.session.media = Some(media);
        }

        match status.player_state {
            RemotePlayerState::Buffering => {
                self.cancel_timer(TimerKind::PositionPoll);
                self.transition(PlaybackState::Preparing);
            }
            RemotePlayerState::Playing => {
                self.transition(PlaybackState::Playing);
                if self.timers.position_poll.is_none() {
                    self.start_position_polling();
                }
            }
            RemotePlayerState::Paused => {
                self.cancel_timer(TimerKind::PositionPoll);
                self.transition(PlaybackState::Paused);
            }
            RemotePlayerState::Idle => {
                self.cancel_all_timers();
                if status.idle_reason.is_some() && self.session.state != PlaybackState::None {
                    log::debug!("[Coordinator] Receiver idle: {:?}", status.idle_reason);
                    self.finish_session();
                } else {
                    self.session.media = None;
                    self.transition(PlaybackState::None);
                }
            }
        }
    }

    /// The receiver rejected a request after it was sent. State is untouched.
    pub fn on_remote_rejected(&mut self, command: RemoteCommand, reason: &str) {
        log::warn!("[Coordinator] Receiver rejected {}: {}", command.as_str(), reason);
        self.emitter.emit_playback(PlaybackEvent::CommandFailed {
            command: command.as_str().to_string(),
            code: "remote_rejected".to_string(),
            message: reason.to_string(),
            timestamp: now_millis(),
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Engine and timer callbacks
    // ─────────────────────────────────────────────────────────────────────────

    pub fn on_engine_event(&mut self, event: EngineEvent) {
        if self.destroyed || self.session.location != PlaybackLocation::Local {
            log::trace!("[Coordinator] Ignoring engine event {:?}", event);
            return;
        }
        match event {
            EngineEvent::Started => {
                if self.session.state == PlaybackState::Preparing {
                    self.transition(PlaybackState::Playing);
                }
            }
            EngineEvent::Completed => {
                if self.session.state != PlaybackState::None {
                    log::info!("[Coordinator] Local playback completed");
                    self.cancel_all_timers();
                    self.finish_session();
                }
            }
            EngineEvent::Failed { reason } => {
                log::warn!("[Coordinator] Local playback failed: {}", reason);
                self.cancel_all_timers();
                if self.session.state != PlaybackState::None {
                    self.finish_session();
                }
                self.emitter.emit_playback(PlaybackEvent::CommandFailed {
                    command: "play".to_string(),
                    code: "engine_failed".to_string(),
                    message: reason,
                    timestamp: now_millis(),
                });
            }
        }
    }

    /// Handles a timer tick. Ticks from cancelled or replaced timers are
    /// discarded.
    pub fn on_timer(&mut self, tick: TimerTick) {
        if self.destroyed || !self.timers.is_live(&tick) {
            log::trace!("[Coordinator] Discarding stale tick {:?}", tick);
            return;
        }
        match tick.kind {
            TimerKind::PositionPoll => {
                let position = self.current_position();
                self.session.position_ms = position;
                self.emit_progress(position);
            }
            TimerKind::ControlsAutoHide => {
                self.timers.controls_auto_hide = None;
                self.emitter.emit_playback(PlaybackEvent::ControlsVisibility {
                    visible: false,
                    timestamp: now_millis(),
                });
            }
        }
    }

    /// Emits `CommandFailed` for a command that returned an error.
    pub fn report_failure(&self, command: &str, error: &CommandError) {
        self.emitter.emit_playback(PlaybackEvent::CommandFailed {
            command: command.to_string(),
            code: error.code().to_string(),
            message: error.to_string(),
            timestamp: now_millis(),
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn transition(&mut self, next: PlaybackState) {
        let previous = self.session.state;
        if previous == next {
            return;
        }
        log::debug!(
            "[Coordinator] {:?} -> {:?} ({})",
            previous,
            next,
            self.session.location
        );
        self.session.state = next;
        self.publish_state();
    }

    fn publish_state(&mut self) {
        self.proxy.on_state_changed(
            self.session.location,
            self.session.state,
            self.session.media.as_deref(),
        );
        self.emitter.emit_playback(PlaybackEvent::StateChanged {
            location: self.session.location,
            state: self.session.state,
            title: self.session.media.as_ref().map(|m| m.title.clone()),
            timestamp: now_millis(),
        });
    }

    /// Switches location through `None` and bumps the generation.
    fn change_location(&mut self, to: PlaybackLocation) {
        let from = self.session.location;
        self.session.generation = self.session.generation.next();
        self.remote
            .register_sink(self.dispatcher.remote_sink(self.session.generation));
        self.session.location = to;

        self.emitter.emit_playback(PlaybackEvent::LocationChanged {
            from,
            to,
            generation: self.session.generation,
            timestamp: now_millis(),
        });
        if self.session.state == PlaybackState::None {
            // Observers still need to learn the new location
            self.publish_state();
        } else {
            self.transition(PlaybackState::None);
        }
    }

    /// `Stopped` then `None`, clearing media and position.
    fn finish_session(&mut self) {
        self.transition(PlaybackState::Stopped);
        self.session.media = None;
        self.session.position_ms = 0;
        self.transition(PlaybackState::None);
    }

    fn emit_progress(&self, position_ms: u64) {
        let duration_ms = match self.session.location {
            PlaybackLocation::Local => self.engine.duration(),
            PlaybackLocation::Remote => self
                .session
                .media
                .as_ref()
                .map(|m| m.duration_ms)
                .filter(|d| *d > 0),
        };
        self.emitter.emit_playback(PlaybackEvent::Progress {
            position_ms,
            duration_ms,
            timestamp: now_millis(),
        });
    }

    fn start_timer(&mut self, kind: TimerKind, schedule: TimerSchedule) {
        self.next_timer_id += 1;
        let id = TimerId(self.next_timer_id);
        let handle = self.scheduler.schedule(TimerTick { kind, id }, schedule);
        if let Some(previous) = self.timers.slot(kind).replace(ActiveTimer { id, handle }) {
            previous.handle.cancel();
        }
    }

    fn start_position_polling(&mut self) {
        self.start_timer(
            TimerKind::PositionPoll,
            TimerSchedule::Repeating {
                initial_delay: self.config.position_poll_initial_delay(),
                period: self.config.position_poll_interval(),
            },
        );
    }

    fn restart_position_polling(&mut self) {
        self.cancel_timer(TimerKind::PositionPoll);
        self.start_position_polling();
    }

    fn cancel_timer(&mut self, kind: TimerKind) {
        if let Some(timer) = self.timers.slot(kind).take() {
            timer.handle.cancel();
        }
    }

    fn cancel_all_timers(&mut self) {
        self.cancel_timer(TimerKind::PositionPoll);
        self.cancel_timer(TimerKind::ControlsAutoHide);
    }
}
