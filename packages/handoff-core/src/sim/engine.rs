//! In-memory local playback engine.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatch::EngineEventSink;
use crate::engine::{EngineEvent, LocalPlaybackEngine};
use crate::error::{EngineError, EngineResult};
use crate::media::MediaDescriptor;

/// Engine command as recorded by [`SimulatedEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    /// Media title and start position.
    Load(String, u64),
    Play,
    Pause,
    Seek(u64),
    Stop,
}

#[derive(Default)]
struct EngineInner {
    sink: Option<EngineEventSink>,
    loaded: Option<Arc<MediaDescriptor>>,
    playing: bool,
    position_ms: u64,
    calls: Vec<EngineCall>,
    fail_next: Option<EngineError>,
    manual_start: bool,
}

/// Engine double that records every call.
///
/// Clones share state, so a test keeps one clone as a probe after handing
/// another to the coordinator. By default `play` reports
/// [`EngineEvent::Started`] straight away; position only changes through
/// [`SimulatedEngine::set_position`].
#[derive(Clone, Default)]
pub struct SimulatedEngine {
    inner: Arc<Mutex<EngineInner>>,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops `play` from reporting `Started` on its own.
    pub fn with_manual_start(self) -> Self {
        self.inner.lock().manual_start = true;
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.inner.lock().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<EngineCall> {
        std::mem::take(&mut self.inner.lock().calls)
    }

    pub fn set_position(&self, position_ms: u64) {
        self.inner.lock().position_ms = position_ms;
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().playing
    }

    /// Makes the next engine command fail with `error`.
    pub fn fail_next(&self, error: EngineError) {
        self.inner.lock().fail_next = Some(error);
    }

    /// Reports that the loaded media played to its end.
    pub fn finish(&self) -> bool {
        let sink = {
            let mut inner = self.inner.lock();
            inner.playing = false;
            inner.sink.clone()
        };
        sink.is_some_and(|sink| sink.send(EngineEvent::Completed))
    }

    /// Reports an asynchronous playback failure.
    pub fn fail(&self, reason: &str) -> bool {
        let sink = {
            let mut inner = self.inner.lock();
            inner.playing = false;
            inner.sink.clone()
        };
        sink.is_some_and(|sink| {
            sink.send(EngineEvent::Failed {
                reason: reason.to_string(),
            })
        })
    }

    fn record(&self, call: EngineCall) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        match inner.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl LocalPlaybackEngine for SimulatedEngine {
    fn set_event_sink(&mut self, sink: EngineEventSink) {
        self.inner.lock().sink = Some(sink);
    }

    fn load(&mut self, media: &MediaDescriptor, start_position_ms: u64) -> EngineResult<()> {
        self.record(EngineCall::Load(media.title.clone(), start_position_ms))?;
        let mut inner = self.inner.lock();
        inner.loaded = Some(Arc::new(media.clone()));
        inner.playing = false;
        inner.position_ms = start_position_ms;
        Ok(())
    }

    fn play(&mut self) -> EngineResult<()> {
        self.record(EngineCall::Play)?;
        let sink = {
            let mut inner = self.inner.lock();
            if inner.loaded.is_none() {
                return Err(EngineError::NotLoaded);
            }
            inner.playing = true;
            if inner.manual_start {
                None
            } else {
                inner.sink.clone()
            }
        };
        if let Some(sink) = sink {
            sink.send(EngineEvent::Started);
        }
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.record(EngineCall::Pause)?;
        self.inner.lock().playing = false;
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> EngineResult<()> {
        self.record(EngineCall::Seek(position_ms))?;
        self.inner.lock().position_ms = position_ms;
        Ok(())
    }

    fn stop(&mut self) -> EngineResult<()> {
        self.record(EngineCall::Stop)?;
        let mut inner = self.inner.lock();
        inner.loaded = None;
        inner.playing = false;
        inner.position_ms = 0;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.inner.lock().position_ms
    }

    fn duration(&self) -> Option<u64> {
        self.inner
            .lock()
            .loaded
            .as_ref()
            .map(|media| media.duration_ms)
            .filter(|duration| *duration > 0)
    }
}
