//! Error types for the reconciler crate.

use adomsync_jsonrpc::{Error as TransportError, ErrorKind};
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading remote state failed.
    #[error("failed to read {what}: {source}")]
    StateFailed {
        what: String,
        #[source]
        source: TransportError,
    },

    /// Remote state was readable but not understood.
    #[error("unexpected {what} data: {reason}")]
    InvalidState { what: String, reason: String },

    /// A write action failed.
    #[error("{action} failed: {source}")]
    ActionFailed {
        action: String,
        #[source]
        source: TransportError,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a state read error.
    pub fn state_failed(what: impl Into<String>, source: TransportError) -> Self {
        Self::StateFailed {
            what: what.into(),
            source,
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Create an action failed error.
    pub fn action_failed(action: impl Into<String>, source: TransportError) -> Self {
        Self::ActionFailed {
            action: action.into(),
            source,
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Underlying transport error, if any.
    pub const fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::StateFailed { source, .. } | Self::ActionFailed { source, .. } => Some(source),
            Self::InvalidState { .. } | Self::InvalidConfig { .. } => None,
        }
    }

    /// Failure class of the underlying transport error.
    ///
    /// Unreadable remote data counts as a transport failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StateFailed { source, .. } | Self::ActionFailed { source, .. } => source.kind(),
            Self::InvalidState { .. } => ErrorKind::Transport,
            Self::InvalidConfig { .. } => ErrorKind::Config,
        }
    }
}
