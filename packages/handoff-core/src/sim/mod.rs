//! In-memory collaborators for tests, demos and headless runs.
//!
//! - [`SimulatedEngine`] - local engine double
//! - [`SimulatedReceiver`] - remote session backed by an in-memory receiver
//! - [`RecordingProxy`] - notification proxy that records transitions
//! - [`ManualTimerScheduler`] - timers fired explicitly by the caller

mod engine;
mod proxy;
mod receiver;
mod timers;

pub use engine::{EngineCall, SimulatedEngine};
pub use proxy::{RecordingProxy, Transition};
pub use receiver::{RemoteCall, SimulatedReceiver};
pub use timers::ManualTimerScheduler;
