//! Shared harness: a player wired to the simulated collaborators and driven
//! synchronously by draining its dispatcher channel.

#![allow(dead_code)]

use std::sync::Arc;

use handoff_core::sim::{ManualTimerScheduler, RecordingProxy, SimulatedEngine, SimulatedReceiver};
use handoff_core::{
    BroadcastEvent, BroadcastEventBridge, Collaborators, ContentLocator, CoreConfig,
    DispatchMessage, Dispatcher, MediaDescriptor, PlaybackEvent, Player, PlayerCommand,
};
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedReceiver;

pub fn media(title: &str) -> Arc<MediaDescriptor> {
    Arc::new(
        MediaDescriptor::new(
            ContentLocator::Url(format!("https://media.example.com/{}.mp4", title)),
            "video/mp4",
            title,
        )
        .with_duration_ms(600_000),
    )
}

pub struct Harness {
    pub player: Player,
    pub dispatcher: Dispatcher,
    pub engine: SimulatedEngine,
    pub receiver: Arc<SimulatedReceiver>,
    pub proxy: RecordingProxy,
    pub timers: Arc<ManualTimerScheduler>,
    pub events: broadcast::Receiver<BroadcastEvent>,
    rx: UnboundedReceiver<DispatchMessage>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    pub fn with_config(config: CoreConfig) -> Self {
        let (dispatcher, rx) = Dispatcher::channel();
        let engine = SimulatedEngine::new();
        let receiver = Arc::new(SimulatedReceiver::new());
        let proxy = RecordingProxy::new();
        let timers = Arc::new(ManualTimerScheduler::new());
        let bridge = Arc::new(BroadcastEventBridge::new(1024));
        let events = bridge.subscribe();

        let player = Player::new(
            &config,
            Collaborators {
                engine: Box::new(engine.clone()),
                remote: receiver.clone(),
                proxy: Box::new(proxy.clone()),
            },
            bridge,
            timers.clone(),
            dispatcher.clone(),
        );

        Self {
            player,
            dispatcher,
            engine,
            receiver,
            proxy,
            timers,
            events,
            rx,
        }
    }

    /// Posts a command without applying it yet.
    pub fn post(&self, command: PlayerCommand) {
        assert!(self.dispatcher.post(DispatchMessage::Command(command)));
    }

    /// Posts a command and applies everything it causes.
    pub fn send(&mut self, command: PlayerCommand) {
        self.post(command);
        self.settle();
    }

    /// Applies every queued message, including ones queued while applying.
    pub fn settle(&mut self) -> usize {
        self.player.drain(&mut self.rx)
    }

    pub fn play(&mut self, media: Arc<MediaDescriptor>, start_position_ms: u64) {
        self.send(PlayerCommand::Play {
            media,
            start_position_ms,
        });
    }

    /// Playback events received since the last call.
    pub fn playback_events(&mut self) -> Vec<PlaybackEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let BroadcastEvent::Playback(event) = event {
                out.push(event);
            }
        }
        out
    }
}
