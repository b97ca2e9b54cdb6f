//! Top-level error type of the command.

use adomsync_jsonrpc::ErrorKind;
use serde_json::{Value, json};
use thiserror::Error;

use crate::json::ErrorCode;

/// Result type alias for command operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can end a run.
#[derive(Debug, Error)]
pub enum Error {
    /// The document could not be loaded or failed validation.
    #[error(transparent)]
    Document(#[from] adomsync_core::Error),

    /// Connection settings, login or logout failed.
    #[error(transparent)]
    Connection(#[from] adomsync_jsonrpc::Error),

    /// Reconciliation stopped.
    #[error(transparent)]
    Reconcile(#[from] adomsync_reconciler::Error),
}

impl Error {
    /// Failure class, `None` for document errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Document(_) => None,
            Self::Connection(e) => Some(e.kind()),
            Self::Reconcile(e) => Some(e.kind()),
        }
    }

    /// Process exit status.
    ///
    /// - 1: unusable input (document, validation, settings)
    /// - 2: authentication
    /// - 3: transport or API failure
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            None | Some(ErrorKind::Config) => 1,
            Some(ErrorKind::Auth) => 2,
            Some(ErrorKind::Transport | ErrorKind::Api) => 3,
        }
    }

    /// Machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Document(adomsync_core::Error::ValidationFailed { .. }) => {
                ErrorCode::ValidationFailed
            }
            Self::Document(_) => ErrorCode::InvalidDocument,
            Self::Connection(_) | Self::Reconcile(_) => match self.kind() {
                Some(ErrorKind::Config) | None => ErrorCode::ConfigError,
                Some(ErrorKind::Auth) => ErrorCode::AuthFailed,
                Some(ErrorKind::Transport) => ErrorCode::TransportError,
                Some(ErrorKind::Api) => ErrorCode::ApiError,
            },
        }
    }

    /// Structured context for JSON output.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Document(adomsync_core::Error::ValidationFailed { errors }) => {
                Some(json!({ "errors": errors }))
            }
            Self::Reconcile(e) => e
                .transport()
                .and_then(adomsync_jsonrpc::Error::api_code)
                .map(|code| json!({ "api_code": code })),
            Self::Connection(e) => e.api_code().map(|code| json!({ "api_code": code })),
            Self::Document(_) => None,
        }
    }

    /// Hint for fixing the problem, when there is an obvious one.
    pub fn suggestion(&self) -> Option<String> {
        match self.kind() {
            None => Some("Run with --check to list every problem in the document".to_string()),
            Some(ErrorKind::Config) => Some(
                "Set url, username and password in .adomsync.toml, ADOMSYNC_* variables or flags"
                    .to_string(),
            ),
            Some(ErrorKind::Auth) => Some("Check the username and password".to_string()),
            Some(ErrorKind::Transport) => {
                Some("Check the URL and that the server is reachable; --timeout raises the limit".to_string())
            }
            Some(ErrorKind::Api) => Some(
                "Changes made before the failure remain applied; fix the cause and re-run".to_string(),
            ),
        }
    }
}
