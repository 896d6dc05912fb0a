//! Default timings and sizes used across the core.
//!
//! These mirror the behaviour users expect from the reference receiver
//! integration. Most are overridable through [`crate::state::CoreConfig`].

// ─────────────────────────────────────────────────────────────────────────────
// Playback
// ─────────────────────────────────────────────────────────────────────────────

/// Delay before the first position-poll tick (milliseconds).
pub const POSITION_POLL_INITIAL_DELAY_MS: u64 = 100;

/// Interval between position-poll ticks (milliseconds).
pub const POSITION_POLL_INTERVAL_MS: u64 = 1000;

/// Delay after which on-screen controls are hidden during local playback
/// (milliseconds).
pub const CONTROLS_AUTO_HIDE_MS: u64 = 5000;

// ─────────────────────────────────────────────────────────────────────────────
// Queue
// ─────────────────────────────────────────────────────────────────────────────

/// Number of full queue items kept in memory by the mirror.
///
/// Independent of the queue length; the receiver keeps the full queue.
pub const QUEUE_CACHE_CAPACITY: usize = 30;

/// Maximum number of items requested from the receiver in one fetch.
pub const QUEUE_FETCH_BATCH_SIZE: usize = 20;

/// Preload lead time given to items the core enqueues (seconds).
pub const QUEUE_PRELOAD_TIME_SECS: f64 = 20.0;

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;
