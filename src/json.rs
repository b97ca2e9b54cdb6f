//! JSON output structures for `--json`.
//!
//! Success prints the run outcome; failure prints an error object carrying the
//! exit code and the steps completed before the failure.

use adomsync_reconciler::RunReport;
use serde::{Deserialize, Serialize};

/// Standard JSON success response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSuccess<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> JsonSuccess<T> {
    /// Create a new success response
    pub const fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Standard JSON error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonError {
    pub success: bool,
    pub error: ErrorDetail,
    /// Steps completed before the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (`SCREAMING_SNAKE_CASE`)
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Semantic exit code (1-3)
    pub exit_code: u8,
    /// Optional additional context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Optional suggestion for resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ErrorDetail {
    /// Construct an `ErrorDetail` from an Error.
    #[must_use]
    pub fn from_error(error: &crate::Error) -> Self {
        Self {
            code: error.code().into(),
            message: error.to_string(),
            exit_code: error.exit_code(),
            details: error.details(),
            suggestion: error.suggestion(),
        }
    }
}

impl JsonError {
    /// Attach the partial run report, unless it is empty.
    #[must_use]
    pub fn with_report(mut self, report: &RunReport) -> Self {
        if !report.steps.is_empty() {
            self.report = Some(report.clone());
        }
        self
    }
}

/// Exit code for failures outside the typed error chain.
pub const UNKNOWN_EXIT_CODE: u8 = 4;

/// Error codes for machine-readable errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Document errors
    InvalidDocument,
    ValidationFailed,

    // Connection errors
    ConfigError,
    AuthFailed,

    // Remote errors
    TransportError,
    ApiError,
}

impl ErrorCode {
    /// Get the string representation of the error code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidDocument => "INVALID_DOCUMENT",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::AuthFailed => "AUTH_FAILED",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::ApiError => "API_ERROR",
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl From<&crate::Error> for JsonError {
    fn from(err: &crate::Error) -> Self {
        Self {
            success: false,
            error: ErrorDetail::from_error(err),
            report: None,
        }
    }
}

/// Trait for types that can be serialized to JSON
pub trait JsonSerializable: Serialize {
    /// Convert to pretty-printed JSON string
    ///
    /// # Errors
    ///
    /// Fails if the value cannot be represented as JSON.
    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// Implement for all Serialize types
impl<T: Serialize> JsonSerializable for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Outcome;
    use adomsync_jsonrpc::Error as TransportError;

    #[test]
    fn test_error_codes_are_screaming_snake_case() {
        assert_eq!(String::from(ErrorCode::ValidationFailed), "VALIDATION_FAILED");
        assert_eq!(ErrorCode::TransportError.as_str(), "TRANSPORT_ERROR");
    }

    #[test]
    fn test_error_detail_from_validation_error() {
        let err = crate::Error::from(adomsync_core::Error::validation_failed(vec![
            "duplicate adom 'a'".to_string(),
        ]));
        let detail = ErrorDetail::from_error(&err);

        assert_eq!(detail.code, "VALIDATION_FAILED");
        assert_eq!(detail.exit_code, 1);
        assert_eq!(
            detail.details,
            Some(serde_json::json!({"errors": ["duplicate adom 'a'"]}))
        );
    }

    #[test]
    fn test_error_detail_from_auth_error() {
        let err = crate::Error::from(TransportError::auth_failed("Login fail"));
        let detail = ErrorDetail::from_error(&err);

        assert_eq!(detail.code, "AUTH_FAILED");
        assert!(detail.message.contains("Login fail"));
        assert_eq!(detail.exit_code, 2);
        assert!(detail.suggestion.is_some());
    }

    #[test]
    fn test_error_skips_empty_report() -> serde_json::Result<()> {
        let err = crate::Error::from(TransportError::auth_failed("Login fail"));
        let json = JsonError::from(&err).with_report(&RunReport::new(false)).to_json()?;

        assert!(json.contains("\"success\": false"));
        assert!(!json.contains("\"report\""));
        assert!(!json.contains("\"details\""));
        Ok(())
    }

    #[test]
    fn test_success_flattens_outcome() -> serde_json::Result<()> {
        let outcome = Outcome::Reconciled {
            report: RunReport::new(true),
        };
        let value = serde_json::to_value(JsonSuccess::new(outcome))?;

        assert_eq!(value.get("success"), Some(&serde_json::json!(true)));
        assert_eq!(value.get("mode"), Some(&serde_json::json!("reconciled")));
        assert_eq!(value.pointer("/report/dry_run"), Some(&serde_json::json!(true)));
        Ok(())
    }
}
