//! Local playback engine abstraction.
//!
//! The engine renders media on the device. Its commands return synchronously;
//! asynchronous outcomes (playback actually started, reached the end,
//! failed) come back as [`EngineEvent`]s through the [`EngineEventSink`]
//! installed by the coordinator.

use crate::dispatch::EngineEventSink;
use crate::error::EngineResult;
use crate::media::MediaDescriptor;

/// Asynchronous notifications from the local engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Rendering actually began after a load + play.
    Started,
    /// The media played to its end.
    Completed,
    /// Playback failed after it had been accepted.
    Failed { reason: String },
}

/// On-device media playback engine.
///
/// Owned exclusively by the coordinator and only called from the dispatcher.
pub trait LocalPlaybackEngine: Send {
    /// Installs the sink the engine reports [`EngineEvent`]s through.
    fn set_event_sink(&mut self, sink: EngineEventSink);

    /// Loads media and positions it at `start_position_ms`, paused.
    ///
    /// # Arguments
    ///
    /// * `media` - Media to load
    /// * `start_position_ms` - Initial position in milliseconds
    fn load(&mut self, media: &MediaDescriptor, start_position_ms: u64) -> EngineResult<()>;

    fn play(&mut self) -> EngineResult<()>;

    fn pause(&mut self) -> EngineResult<()>;

    fn seek(&mut self, position_ms: u64) -> EngineResult<()>;

    /// Stops rendering and unloads the media.
    fn stop(&mut self) -> EngineResult<()>;

    /// Current position in milliseconds.
    fn position(&self) -> u64;

    /// Duration of the loaded media, if known.
    fn duration(&self) -> Option<u64>;
}
