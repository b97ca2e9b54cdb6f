//! Error types for the JSON-RPC transport.

use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure classes, used to pick an exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid connection settings.
    Config,
    /// No session, or the credentials were rejected.
    Auth,
    /// HTTP-level failure or an unreadable response.
    Transport,
    /// The API answered with a non-zero status code.
    Api,
}

/// Errors that can occur while talking to the management API.
#[derive(Error, Debug)]
pub enum Error {
    /// Login was rejected or returned no session.
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    /// A call was attempted before `login`.
    #[error("not authenticated: call login first")]
    NotAuthenticated,

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}: {message}")]
    HttpStatus {
        status: u16,
        url: String,
        message: String,
    },

    /// The response body could not be interpreted.
    #[error("malformed response for '{url}': {reason}")]
    MalformedResponse { url: String, reason: String },

    /// The API reported a non-zero status code.
    #[error("API error {code} on '{url}': {message}")]
    Api {
        code: i64,
        url: String,
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an authentication error.
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    /// Create an HTTP status error.
    pub fn http_status(status: u16, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed_response(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an API status error.
    pub fn api(code: i64, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
        }
    }

    /// Classify the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthFailed { .. }
            | Self::NotAuthenticated
            | Self::HttpStatus {
                status: 401 | 403, ..
            } => ErrorKind::Auth,
            Self::Api { .. } => ErrorKind::Api,
            Self::ConfigError { .. } | Self::UrlParse(_) => ErrorKind::Config,
            Self::HttpStatus { .. }
            | Self::MalformedResponse { .. }
            | Self::Http(_)
            | Self::Json(_)
            | Self::Io(_) => ErrorKind::Transport,
        }
    }

    /// API status code, when the API reported one.
    pub const fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
