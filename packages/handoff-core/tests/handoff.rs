//! Local/remote hand-off scenarios driven through the player.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{media, Harness};
use handoff_core::remote::LoadRequest;
use handoff_core::sim::{EngineCall, RemoteCall, SimulatedEngine, SimulatedReceiver, Transition};
use handoff_core::timer::{TimerKind, TimerTick};
use handoff_core::{
    bootstrap_player, BroadcastEvent, Collaborators, ControlAction, CoreConfig, DisconnectReason,
    DispatchMessage, EngineError, LoggingNotificationProxy, MediaStatus, PlaybackEvent,
    PlaybackLocation, PlaybackState, PlayerCommand, RemoteEvent, RemotePlayerState,
};

fn t(location: PlaybackLocation, state: PlaybackState) -> Transition {
    Transition { location, state }
}

#[test]
fn play_connect_disconnect_scenario() {
    use PlaybackLocation::{Local, Remote};
    use PlaybackState::{None, Paused, Playing, Preparing};

    let mut h = Harness::new();
    let d1 = media("d1");

    h.play(d1.clone(), 0);
    assert_eq!(h.player.coordinator().location(), Local);
    assert_eq!(h.player.coordinator().state(), Playing);
    assert_eq!(
        h.proxy.transitions(),
        vec![t(Local, Preparing), t(Local, Playing)]
    );

    h.engine.set_position(42_000);
    h.engine.take_calls();
    h.receiver.connect();
    h.settle();

    assert_eq!(h.engine.take_calls(), vec![EngineCall::Pause]);
    let loads: Vec<LoadRequest> = h
        .receiver
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RemoteCall::Load(request) => Some(request),
            _ => Option::None,
        })
        .collect();
    assert_eq!(
        loads,
        vec![LoadRequest {
            media: d1.clone(),
            autoplay: true,
            position_ms: 42_000,
        }]
    );
    assert_eq!(h.player.coordinator().location(), Remote);
    assert_eq!(h.player.coordinator().state(), Playing);

    h.receiver.set_playback(RemotePlayerState::Playing, 77_000);
    h.settle();
    h.proxy.clear();
    h.receiver.disconnect(DisconnectReason::ConnectionLost);
    h.settle();

    assert_eq!(h.player.coordinator().location(), Local);
    assert_eq!(h.player.coordinator().state(), Paused);
    assert_eq!(h.player.coordinator().current_position(), 77_000);
    assert_eq!(
        h.engine.take_calls(),
        vec![EngineCall::Load("d1".to_string(), 77_000)]
    );
    assert!(!h.engine.is_playing());
    assert_eq!(h.proxy.transitions(), vec![t(Local, None), t(Local, Paused)]);
}

#[test]
fn hand_off_of_paused_playback_does_not_autoplay() {
    let mut h = Harness::new();
    h.play(media("d1"), 0);
    h.engine.set_position(10_500);
    h.send(PlayerCommand::Pause);

    h.receiver.connect();
    h.settle();

    let load = h.receiver.calls().into_iter().find_map(|call| match call {
        RemoteCall::Load(request) => Some(request),
        _ => None,
    });
    let load = load.unwrap();
    assert!(!load.autoplay);
    assert_eq!(load.position_ms, 10_500);
    assert_eq!(h.player.coordinator().state(), PlaybackState::Paused);
}

#[test]
fn connect_without_playback_only_changes_location() {
    let mut h = Harness::new();
    h.receiver.connect();
    h.settle();

    assert_eq!(h.player.coordinator().location(), PlaybackLocation::Remote);
    assert_eq!(h.player.coordinator().state(), PlaybackState::None);
    assert!(h.receiver.calls().is_empty());
}

#[test]
fn double_disconnect_equals_single_disconnect() {
    let mut h = Harness::new();
    h.play(media("d1"), 0);
    h.receiver.connect();
    h.settle();

    h.receiver.disconnect(DisconnectReason::Ended);
    h.settle();
    let session = h.player.coordinator().session().clone();
    let transitions = h.proxy.transitions();
    let engine_calls = h.engine.calls();

    h.receiver.disconnect(DisconnectReason::Ended);
    h.settle();

    assert_eq!(h.player.coordinator().session(), &session);
    assert_eq!(h.proxy.transitions(), transitions);
    assert_eq!(h.engine.calls(), engine_calls);
}

#[test]
fn stale_generation_status_is_dropped() {
    let mut h = Harness::new();
    h.play(media("d1"), 0);
    h.receiver.connect();
    h.settle();
    let generation = h.player.coordinator().generation();
    let position = h.player.coordinator().current_position();

    assert!(h
        .receiver
        .emit_through_retired(RemoteEvent::StatusChanged(MediaStatus::new(
            RemotePlayerState::Idle,
            999_000,
        ))));
    h.settle();

    assert_eq!(h.player.coordinator().generation(), generation);
    assert_eq!(h.player.coordinator().state(), PlaybackState::Playing);
    assert_eq!(h.player.coordinator().current_position(), position);
}

#[test]
fn status_queued_before_disconnect_is_dropped_after_it() {
    let mut h = Harness::new();
    h.play(media("d1"), 0);
    h.receiver.connect();
    h.settle();

    // Disconnect is applied first; the status was sent through the old sink
    h.receiver.disconnect(DisconnectReason::ConnectionLost);
    h.settle();
    h.receiver
        .emit_through_retired(RemoteEvent::StatusChanged(MediaStatus::new(
            RemotePlayerState::Playing,
            5_000,
        )));
    h.settle();

    assert_eq!(h.player.coordinator().location(), PlaybackLocation::Local);
    assert_eq!(h.player.coordinator().state(), PlaybackState::Paused);
}

#[test]
fn controls_route_by_current_location() {
    let mut h = Harness::new();
    h.play(media("d1"), 0);
    h.receiver.connect();
    h.settle();
    h.receiver.take_calls();
    h.engine.take_calls();

    // Rendered while local, tapped after the hand-off
    let controls = h.dispatcher.control_handle();
    assert!(controls.send(ControlAction::Pause, PlaybackLocation::Local));
    h.settle();

    assert_eq!(h.receiver.take_calls(), vec![RemoteCall::Pause]);
    assert!(h.engine.calls().is_empty());
    assert_eq!(h.player.coordinator().state(), PlaybackState::Paused);
}

#[test]
fn stop_cancels_timers_and_late_ticks_do_nothing() {
    let mut h = Harness::new();
    h.play(media("d1"), 0);
    h.send(PlayerCommand::ShowControls);
    assert_eq!(h.timers.active(TimerKind::PositionPoll), 1);
    assert_eq!(h.timers.active(TimerKind::ControlsAutoHide), 1);
    let poll: TimerTick = h.timers.latest(TimerKind::PositionPoll).unwrap();
    let hide: TimerTick = h.timers.latest(TimerKind::ControlsAutoHide).unwrap();

    h.send(PlayerCommand::Stop);
    assert_eq!(h.timers.active(TimerKind::PositionPoll), 0);
    assert_eq!(h.timers.active(TimerKind::ControlsAutoHide), 0);
    h.playback_events();

    h.player.handle(DispatchMessage::Timer(poll));
    h.player.handle(DispatchMessage::Timer(hide));

    assert!(h.playback_events().is_empty());
    assert_eq!(h.player.coordinator().state(), PlaybackState::None);
}

#[test]
fn failed_command_emits_command_failed_and_keeps_state() {
    let mut h = Harness::new();
    h.play(media("d1"), 0);
    h.playback_events();
    h.engine.fail_next(EngineError::Busy("decoder".into()));

    h.send(PlayerCommand::Seek { position_ms: 30_000 });

    let events = h.playback_events();
    assert!(matches!(
        events.as_slice(),
        [PlaybackEvent::CommandFailed { command, code, .. }]
            if command == "seek" && code == "engine_busy"
    ));
    assert_eq!(h.player.coordinator().state(), PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn bootstrapped_player_polls_position_on_tokio_timers() {
    let engine = SimulatedEngine::new();
    let receiver = Arc::new(SimulatedReceiver::new());
    let player = bootstrap_player(
        &CoreConfig::default(),
        Collaborators {
            engine: Box::new(engine.clone()),
            remote: receiver.clone(),
            proxy: Box::new(LoggingNotificationProxy::new()),
        },
    )
    .unwrap();
    let mut events = player.event_bridge.subscribe();

    assert!(player.handle.play(media("d1"), 12_000));
    tokio::time::sleep(Duration::from_millis(3_500)).await;

    let snapshot = player.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.session.state, PlaybackState::Playing);
    assert_eq!(snapshot.position_ms, 12_000);

    let mut progress = 0;
    while let Ok(event) = events.try_recv() {
        if let BroadcastEvent::Playback(PlaybackEvent::Progress { position_ms, .. }) = event {
            assert_eq!(position_ms, 12_000);
            progress += 1;
        }
    }
    // Ticks at 100ms, 1.1s, 2.1s and 3.1s
    assert_eq!(progress, 4);

    player.shutdown();
}
