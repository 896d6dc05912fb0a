//! Timers owned by the coordinator.
//!
//! A timer never touches state directly. When it fires it posts a
//! [`TimerTick`] to the dispatcher; the coordinator then checks that the tick
//! belongs to a timer it still holds. Cancelling a timer therefore takes
//! effect immediately even if a tick is already queued.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::dispatch::{DispatchMessage, Dispatcher};
use crate::runtime::{TaskSpawner, TokioSpawner};

/// The two timers the coordinator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Periodic position updates while playing.
    PositionPoll,
    /// One-shot hide of on-screen controls.
    ControlsAutoHide,
}

/// Identity of one scheduled timer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Message posted when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub kind: TimerKind,
    pub id: TimerId,
}

/// When a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSchedule {
    Once {
        delay: Duration,
    },
    Repeating {
        initial_delay: Duration,
        period: Duration,
    },
}

/// Cancels the underlying timer task when asked or when dropped.
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Schedules timers whose ticks are delivered through the dispatcher.
pub trait TimerScheduler: Send + Sync {
    /// Starts a timer that posts `tick` according to `schedule`.
    fn schedule(&self, tick: TimerTick, schedule: TimerSchedule) -> TimerHandle;
}

/// Tokio-backed scheduler. Each timer is one spawned task.
pub struct TokioTimerScheduler {
    dispatcher: Dispatcher,
    spawner: TokioSpawner,
}

impl TokioTimerScheduler {
    pub fn new(dispatcher: Dispatcher, spawner: TokioSpawner) -> Self {
        Self {
            dispatcher,
            spawner,
        }
    }
}

impl TimerScheduler for TokioTimerScheduler {
    fn schedule(&self, tick: TimerTick, schedule: TimerSchedule) -> TimerHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let dispatcher = self.dispatcher.clone();

        self.spawner.spawn(async move {
            match schedule {
                TimerSchedule::Once { delay } => {
                    tokio::select! {
                        _ = cancelled.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {
                            dispatcher.post(DispatchMessage::Timer(tick));
                        }
                    }
                }
                TimerSchedule::Repeating {
                    initial_delay,
                    period,
                } => {
                    let start = tokio::time::Instant::now() + initial_delay;
                    let mut interval = tokio::time::interval_at(start, period);
                    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                    loop {
                        tokio::select! {
                            _ = cancelled.cancelled() => break,
                            _ = interval.tick() => {
                                if !dispatcher.post(DispatchMessage::Timer(tick)) {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            log::trace!("[Timer] {:?} {:?} finished", tick.kind, tick.id);
        });

        TimerHandle::new(token)
    }
}
