//! System notification / lock-screen controls.
//!
//! The proxy renders the current playback state outside the app and turns
//! taps on its controls into [`ControlAction`]s sent back through the
//! [`ControlHandle`] it was given.

use crate::dispatch::{ControlAction, ControlHandle};
use crate::media::MediaDescriptor;
use crate::state::{PlaybackLocation, PlaybackState};

/// Receives every coordinator state transition.
pub trait NotificationProxy: Send {
    /// Called once per state change, after the change is applied.
    ///
    /// # Arguments
    ///
    /// * `location` - Where playback now happens
    /// * `state` - The new playback state
    /// * `media` - Media being played, if any
    fn on_state_changed(
        &mut self,
        location: PlaybackLocation,
        state: PlaybackState,
        media: Option<&MediaDescriptor>,
    );

    /// Hands the proxy its channel for control actions.
    fn bind_controls(&mut self, _controls: ControlHandle) {}
}

/// Proxy that only logs, for headless use.
///
/// It still keeps the control handle so embedders can trigger control
/// actions through [`LoggingNotificationProxy::press`].
#[derive(Default)]
pub struct LoggingNotificationProxy {
    controls: Option<ControlHandle>,
    rendered_for: PlaybackLocation,
}

impl LoggingNotificationProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a tap on a rendered control. Returns `false` if no control
    /// channel is bound or the dispatcher is gone.
    pub fn press(&self, action: ControlAction) -> bool {
        match &self.controls {
            Some(controls) => controls.send(action, self.rendered_for),
            None => false,
        }
    }
}

impl NotificationProxy for LoggingNotificationProxy {
    fn on_state_changed(
        &mut self,
        location: PlaybackLocation,
        state: PlaybackState,
        media: Option<&MediaDescriptor>,
    ) {
        self.rendered_for = location;
        match media {
            Some(media) => log::info!(
                "[Notification] {} {:?}: {}",
                location,
                state,
                media.title
            ),
            None => log::info!("[Notification] {} {:?}", location, state),
        }
    }

    fn bind_controls(&mut self, controls: ControlHandle) {
        self.controls = Some(controls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchMessage, Dispatcher};

    #[test]
    fn press_without_binding_returns_false() {
        let proxy = LoggingNotificationProxy::new();
        assert!(!proxy.press(ControlAction::Pause));
    }

    #[test]
    fn press_tags_request_with_last_rendered_location() {
        let (dispatcher, mut rx) = Dispatcher::channel();
        let mut proxy = LoggingNotificationProxy::new();
        proxy.bind_controls(dispatcher.control_handle());
        proxy.on_state_changed(PlaybackLocation::Remote, PlaybackState::Playing, None);

        assert!(proxy.press(ControlAction::Pause));
        match rx.try_recv().unwrap() {
            DispatchMessage::Control(request) => {
                assert_eq!(request.action, ControlAction::Pause);
                assert_eq!(request.rendered_for, PlaybackLocation::Remote);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
