//! Notification proxy double.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatch::{ControlAction, ControlHandle};
use crate::media::MediaDescriptor;
use crate::proxy::NotificationProxy;
use crate::state::{PlaybackLocation, PlaybackState};

/// One observed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub location: PlaybackLocation,
    pub state: PlaybackState,
}

#[derive(Default)]
struct ProxyInner {
    transitions: Vec<Transition>,
    controls: Option<ControlHandle>,
}

/// Proxy that records every state change it is shown.
#[derive(Clone, Default)]
pub struct RecordingProxy {
    inner: Arc<Mutex<ProxyInner>>,
}

impl RecordingProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.inner.lock().transitions.clone()
    }

    pub fn clear(&self) {
        self.inner.lock().transitions.clear();
    }

    /// Simulates a tap on the rendered control.
    pub fn press(&self, action: ControlAction) -> bool {
        let inner = self.inner.lock();
        let rendered_for = inner
            .transitions
            .last()
            .map(|t| t.location)
            .unwrap_or_default();
        match &inner.controls {
            Some(controls) => controls.send(action, rendered_for),
            None => false,
        }
    }
}

impl NotificationProxy for RecordingProxy {
    fn on_state_changed(
        &mut self,
        location: PlaybackLocation,
        state: PlaybackState,
        _media: Option<&MediaDescriptor>,
    ) {
        self.inner
            .lock()
            .transitions
            .push(Transition { location, state });
    }

    fn bind_controls(&mut self, controls: ControlHandle) {
        self.inner.lock().controls = Some(controls);
    }
}
