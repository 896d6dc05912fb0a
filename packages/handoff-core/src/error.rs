//! Centralized error types for the hand-off core.
//!
//! Nothing in this crate is fatal: collaborator failures are reported as
//! values, logged by the dispatcher, and leave the playback session untouched.
//! Connection loss and stale callbacks are not errors at all; they are
//! handled by the hand-off protocol and the generation check respectively.

use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Codes are stable strings carried by `CommandFailed` events so observers
/// can react without parsing messages.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

/// Failure reported synchronously by the local playback engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The engine cannot accept the command right now.
    #[error("engine busy: {0}")]
    Busy(String),

    /// A transport command was issued before any media was loaded.
    #[error("no media loaded")]
    NotLoaded,

    /// The engine failed to carry out the command.
    #[error("engine failure: {0}")]
    Failed(String),
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Busy(_) => "engine_busy",
            Self::NotLoaded => "engine_not_loaded",
            Self::Failed(_) => "engine_failed",
        }
    }
}

/// Failure reported synchronously by the remote session service when it
/// refuses to send a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// No receiver session is connected.
    #[error("no remote session is connected")]
    NotConnected,

    /// The receiver (or the session layer) rejected the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The transport failed while sending the request.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ErrorCode for RemoteError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotConnected => "remote_not_connected",
            Self::Rejected(_) => "remote_rejected",
            Self::Transport(_) => "remote_transport",
        }
    }
}

/// Error returned by coordinator and queue mirror commands.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The descriptor has no usable locator. Raised before any collaborator
    /// is contacted.
    #[error("media has no playable locator: {0}")]
    InvalidDescriptor(String),

    /// The local engine refused the command.
    #[error("local engine: {0}")]
    Engine(#[from] EngineError),

    /// The remote session refused the command.
    #[error("remote session: {0}")]
    Remote(#[from] RemoteError),
}

impl ErrorCode for CommandError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidDescriptor(_) => "invalid_descriptor",
            Self::Engine(err) => err.code(),
            Self::Remote(err) => err.code(),
        }
    }
}

/// Configuration validation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid_configuration",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

pub type EngineResult<T> = Result<T, EngineError>;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Result of a user-facing command. No-op cases return `Ok(())`.
pub type CommandResult<T> = Result<T, CommandError>;
