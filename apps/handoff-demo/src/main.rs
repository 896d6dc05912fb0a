//! Handoff Demo - headless hand-off scenario runner.
//!
//! Drives a player wired to the simulated engine and receiver through a
//! local play, a hand-off to the receiver, a disconnect back to local and a
//! large remote queue, logging every event the core emits.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use handoff_core::sim::{SimulatedEngine, SimulatedReceiver};
use handoff_core::{
    bootstrap_player, BootstrappedPlayer, Collaborators, DisconnectReason, EnqueueMode,
    LoggingEventEmitter, LoggingNotificationProxy, RemotePlayerState, TaskSpawner,
};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

use crate::config::DemoConfig;

/// Handoff Demo - runs the local/remote hand-off scenario headlessly.
#[derive(Parser, Debug)]
#[command(name = "handoff-demo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "HANDOFF_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Pause between scenario steps in milliseconds (overrides config file).
    #[arg(short = 's', long, env = "HANDOFF_STEP_DELAY_MS")]
    step_delay_ms: Option<u64>,

    /// Keep the player running after the scenario until Ctrl+C.
    #[arg(short, long)]
    wait: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Handoff Demo v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        DemoConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(delay) = args.step_delay_ms {
        config.step_delay_ms = delay;
    }

    log::info!(
        "Configuration: catalog={} items, remote_queue_length={}, step_delay={}ms",
        config.catalog.len(),
        config.remote_queue_length,
        config.step_delay_ms
    );

    let engine = SimulatedEngine::new();
    let receiver = Arc::new(SimulatedReceiver::new());
    let player = bootstrap_player(
        &config.core,
        Collaborators {
            engine: Box::new(engine.clone()),
            remote: receiver.clone(),
            proxy: Box::new(LoggingNotificationProxy::new()),
        },
    )
    .context("Failed to bootstrap player")?;

    // Debug-level trace of every event as it is emitted
    player
        .event_bridge
        .set_external_emitter(Arc::new(LoggingEventEmitter));
    spawn_event_logger(&player);

    let scenario = Scenario {
        player: &player,
        engine: &engine,
        receiver: &receiver,
        config: &config,
    };
    scenario.run().await?;

    if args.wait {
        log::info!("Scenario complete; waiting for Ctrl+C");
        shutdown_signal().await;
        log::info!("Shutdown signal received, cleaning up...");
    }

    player.shutdown();
    // Let the dispatcher release its timers before the runtime goes away
    tokio::time::sleep(Duration::from_millis(10)).await;

    log::info!("Shutdown complete");
    Ok(())
}

/// Logs every broadcast event as JSON until shutdown.
fn spawn_event_logger(player: &BootstrappedPlayer) {
    let mut events = player.event_bridge.subscribe();
    let cancel = player.cancel_token.clone();

    player.spawner.spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => log::info!("[Event] {}", json),
                        Err(e) => log::warn!("[Event] Failed to serialize event: {}", e),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("[Event] Logger lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });
}

struct Scenario<'a> {
    player: &'a BootstrappedPlayer,
    engine: &'a SimulatedEngine,
    receiver: &'a Arc<SimulatedReceiver>,
    config: &'a DemoConfig,
}

impl Scenario<'_> {
    async fn run(&self) -> Result<()> {
        let handle = &self.player.handle;
        let catalog = &self.config.catalog;

        log::info!("── Step 1: play locally");
        handle.play(catalog[0].clone(), 0);
        self.step().await;
        self.engine.set_position(42_000);
        self.report("local playing").await?;

        log::info!("── Step 2: receiver connects, hand-off to remote");
        self.receiver.connect();
        self.step().await;
        self.report("remote after hand-off").await?;

        log::info!("── Step 3: enqueue the rest of the catalog");
        for media in catalog.iter().skip(1) {
            handle.enqueue(media.clone(), EnqueueMode::Append);
            self.step().await;
        }
        self.receiver.set_playback(RemotePlayerState::Playing, 95_000);
        self.step().await;
        self.report("remote queue").await?;

        log::info!("── Step 4: receiver drops, playback resurfaces locally");
        self.receiver.disconnect(DisconnectReason::ConnectionLost);
        self.step().await;
        self.report("local after disconnect").await?;

        log::info!(
            "── Step 5: reconnect to a {}-item remote queue",
            self.config.remote_queue_length
        );
        handle.stop();
        self.step().await;
        self.receiver.seed_queue(self.config.remote_queue_length);
        self.receiver.connect();
        self.step().await;
        if self.config.remote_queue_length > 0 {
            handle.play_item_at(self.config.remote_queue_length - 1);
            self.step().await;
        }
        self.report("remote queue attached").await?;

        log::info!("── Step 6: receiver session ends");
        self.receiver.disconnect(DisconnectReason::Ended);
        self.step().await;
        self.report("final").await?;

        Ok(())
    }

    async fn step(&self) {
        tokio::time::sleep(Duration::from_millis(self.config.step_delay_ms)).await;
    }

    async fn report(&self, label: &str) -> Result<()> {
        let snapshot = self
            .player
            .handle
            .snapshot()
            .await
            .context("Player stopped unexpectedly")?;
        log::info!("[Snapshot] {}: {}", label, snapshot.to_json());
        Ok(())
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
