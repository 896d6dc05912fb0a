//! Timer scheduler that never fires on its own.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::timer::{TimerHandle, TimerKind, TimerSchedule, TimerScheduler, TimerTick};

struct ScheduledTimer {
    tick: TimerTick,
    schedule: TimerSchedule,
    token: CancellationToken,
}

/// Records scheduled timers; tests fire them by passing the returned ticks
/// to the player or coordinator.
#[derive(Default)]
pub struct ManualTimerScheduler {
    scheduled: Mutex<Vec<ScheduledTimer>>,
}

impl ManualTimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers of `kind` that have not been cancelled.
    pub fn active(&self, kind: TimerKind) -> usize {
        self.scheduled
            .lock()
            .iter()
            .filter(|timer| timer.tick.kind == kind && !timer.token.is_cancelled())
            .count()
    }

    /// Tick of the most recently scheduled timer of `kind`, cancelled or not.
    pub fn latest(&self, kind: TimerKind) -> Option<TimerTick> {
        self.scheduled
            .lock()
            .iter()
            .rev()
            .find(|timer| timer.tick.kind == kind)
            .map(|timer| timer.tick)
    }

    /// Schedule of the most recently scheduled timer of `kind`.
    pub fn latest_schedule(&self, kind: TimerKind) -> Option<TimerSchedule> {
        self.scheduled
            .lock()
            .iter()
            .rev()
            .find(|timer| timer.tick.kind == kind)
            .map(|timer| timer.schedule)
    }

    /// Total number of timers of `kind` ever scheduled.
    pub fn scheduled_count(&self, kind: TimerKind) -> usize {
        self.scheduled
            .lock()
            .iter()
            .filter(|timer| timer.tick.kind == kind)
            .count()
    }
}

impl TimerScheduler for ManualTimerScheduler {
    fn schedule(&self, tick: TimerTick, schedule: TimerSchedule) -> TimerHandle {
        let token = CancellationToken::new();
        self.scheduled.lock().push(ScheduledTimer {
            tick,
            schedule,
            token: token.clone(),
        });
        TimerHandle::new(token)
    }
}
