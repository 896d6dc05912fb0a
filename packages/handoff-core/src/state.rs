//! Core configuration and playback session state types.
//!
//! [`CoreConfig`] groups every tunable the core reads. [`PlaybackSession`]
//! is the coordinator's view of what is playing and where; it is owned by the
//! coordinator and only ever handed out as a snapshot.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ConfigError;
use crate::media::MediaDescriptor;
use crate::protocol_constants::{
    CONTROLS_AUTO_HIDE_MS, EVENT_CHANNEL_CAPACITY, POSITION_POLL_INITIAL_DELAY_MS,
    POSITION_POLL_INTERVAL_MS, QUEUE_CACHE_CAPACITY, QUEUE_FETCH_BATCH_SIZE,
    QUEUE_PRELOAD_TIME_SECS,
};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Timing configuration for the playback coordinator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Interval between position-poll ticks (milliseconds).
    pub position_poll_interval_ms: u64,

    /// Delay before the first position-poll tick (milliseconds).
    pub position_poll_initial_delay_ms: u64,

    /// Delay before on-screen controls are hidden during local playback
    /// (milliseconds).
    pub controls_auto_hide_ms: u64,
}

impl PlaybackConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.position_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "playback.position_poll_interval_ms must be >= 1".to_string(),
            ));
        }
        if self.controls_auto_hide_ms == 0 {
            return Err(ConfigError::Invalid(
                "playback.controls_auto_hide_ms must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn position_poll_interval(&self) -> Duration {
        Duration::from_millis(self.position_poll_interval_ms)
    }

    pub fn position_poll_initial_delay(&self) -> Duration {
        Duration::from_millis(self.position_poll_initial_delay_ms)
    }

    pub fn controls_auto_hide(&self) -> Duration {
        Duration::from_millis(self.controls_auto_hide_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            position_poll_interval_ms: POSITION_POLL_INTERVAL_MS,
            position_poll_initial_delay_ms: POSITION_POLL_INITIAL_DELAY_MS,
            controls_auto_hide_ms: CONTROLS_AUTO_HIDE_MS,
        }
    }
}

/// What the queue mirror does with its contents when the remote session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetachPolicy {
    /// Keep the last-seen queue visible (read-only) so it can be rebuilt and
    /// reloaded into the next session.
    #[default]
    Freeze,
    /// Clear the mirror immediately.
    Discard,
}

/// Configuration for the queue mirror.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Number of full items kept in memory.
    pub cache_capacity: usize,

    /// Maximum number of items requested from the receiver in one fetch.
    /// Must not exceed `cache_capacity`.
    pub fetch_batch_size: usize,

    /// Preload lead time given to enqueued items (seconds).
    pub preload_time_secs: f64,

    /// Behaviour on remote session end.
    pub detach_policy: DetachPolicy,
}

impl QueueConfig {
    /// Creates a new `QueueConfig` with validated values.
    ///
    /// # Errors
    ///
    /// Returns an error if any value would cause runtime issues.
    pub fn new(
        cache_capacity: usize,
        fetch_batch_size: usize,
        preload_time_secs: f64,
        detach_policy: DetachPolicy,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            cache_capacity,
            fetch_batch_size,
            preload_time_secs,
            detach_policy,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue.cache_capacity must be >= 1".to_string(),
            ));
        }
        if self.fetch_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "queue.fetch_batch_size must be >= 1".to_string(),
            ));
        }
        if self.fetch_batch_size > self.cache_capacity {
            return Err(ConfigError::Invalid(format!(
                "queue.fetch_batch_size ({}) must not exceed queue.cache_capacity ({}) \
                 or fetched items evict each other",
                self.fetch_batch_size, self.cache_capacity
            )));
        }
        if !self.preload_time_secs.is_finite() || self.preload_time_secs < 0.0 {
            return Err(ConfigError::Invalid(
                "queue.preload_time_secs must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            cache_capacity: QUEUE_CACHE_CAPACITY,
            fetch_batch_size: QUEUE_FETCH_BATCH_SIZE,
            preload_time_secs: QUEUE_PRELOAD_TIME_SECS,
            detach_policy: DetachPolicy::Freeze,
        }
    }
}

/// Configuration for the hand-off core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// Coordinator timings.
    pub playback: PlaybackConfig,

    /// Queue mirror sizing and policy.
    pub queue: QueueConfig,

    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            queue: QueueConfig::default(),
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl CoreConfig {
    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.playback.validate()?;
        self.queue.validate()?;
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback Session
// ─────────────────────────────────────────────────────────────────────────────

/// Where playback is (or would be) rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackLocation {
    /// On-device engine.
    #[default]
    Local,
    /// Connected receiver.
    Remote,
}

impl fmt::Display for PlaybackLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Coarse playback state shared by both locations.
///
/// `Stopped` is transient: it is always followed by `None` within the same
/// dispatcher step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    #[default]
    None,
    Preparing,
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    /// Whether a session in this state has something to hand off.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Preparing | Self::Playing | Self::Paused)
    }
}

/// Monotonic counter bumped on every location change.
///
/// Remote callbacks are stamped with the generation current when their sink
/// was registered; a callback carrying an older generation is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// The generation a fresh coordinator starts at.
    pub const INITIAL: Self = Self(1);

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// The coordinator's playback session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    pub location: PlaybackLocation,
    pub state: PlaybackState,
    /// Media being played. `None` only while `state` is `None`.
    pub media: Option<Arc<MediaDescriptor>>,
    /// Last known position in milliseconds.
    pub position_ms: u64,
    pub generation: Generation,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            location: PlaybackLocation::Local,
            state: PlaybackState::None,
            media: None,
            position_ms: 0,
            generation: Generation::INITIAL,
        }
    }
}

impl PlaybackSession {
    /// Serializes a compact summary for logs and the demo binary.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "location": self.location,
            "state": self.state,
            "title": self.media.as_ref().map(|m| m.title.as_str()),
            "positionMs": self.position_ms,
            "generation": self.generation,
        })
    }
}
