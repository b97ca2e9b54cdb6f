//! Connection settings for the management API.
//!
//! Settings come from three layers, applied in order so that later layers
//! override earlier ones:
//!
//! 1. a local dotfile (`.adomsync.toml`, or JSON when the file ends in `.json`)
//! 2. `ADOMSYNC_*` environment variables
//! 3. command-line flags
//!
//! Each layer is a partial [`ConnectionSettings`]; [`ConnectionSettings::resolve`]
//! turns the merged result into a complete [`ConnectionConfig`].

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default dotfile name, looked up in the working directory.
pub const DEFAULT_DOTFILE: &str = ".adomsync.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ADOMSYNC_";

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// One partial layer of connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSettings {
    /// Base URL of the management API.
    #[serde(default)]
    pub url: Option<String>,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Login password.
    #[serde(default)]
    pub password: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: Option<bool>,
}

impl ConnectionSettings {
    /// Load a layer from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config_error(format!("failed to read {}: {e}", path.display()))
        })?;

        if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|e| {
                Error::config_error(format!("failed to parse {}: {e}", path.display()))
            })
        } else {
            toml::from_str(&content).map_err(|e| {
                Error::config_error(format!("failed to parse {}: {e}", path.display()))
            })
        }
    }

    /// Load a layer from a file if it exists.
    ///
    /// A missing file is an empty layer; a file that exists but cannot be
    /// parsed is an error.
    pub fn from_optional_file(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load a layer from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when `ADOMSYNC_TIMEOUT` or `ADOMSYNC_INSECURE` cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load a layer from an environment lookup function. Empty values count
    /// as unset.
    ///
    /// # Errors
    ///
    /// Fails when `ADOMSYNC_TIMEOUT` or `ADOMSYNC_INSECURE` cannot be parsed.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

        let timeout = var("TIMEOUT")
            .map(|v| {
                v.trim().parse::<u64>().map_err(|e| {
                    Error::config_error(format!("{ENV_PREFIX}TIMEOUT: '{v}' is not a number of seconds: {e}"))
                })
            })
            .transpose()?;
        let insecure = var("INSECURE").map(|v| parse_flag(&v)).transpose()?;

        Ok(Self {
            url: var("URL"),
            username: var("USERNAME"),
            password: var("PASSWORD"),
            timeout,
            insecure,
        })
    }

    /// Overlay `other` on top of `self`; values present in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            url: other.url.or(self.url),
            username: other.username.or(self.username),
            password: other.password.or(self.password),
            timeout: other.timeout.or(self.timeout),
            insecure: other.insecure.or(self.insecure),
        }
    }

    /// Build a complete configuration, failing on missing values.
    pub fn resolve(self) -> Result<ConnectionConfig> {
        let missing: Vec<&str> = [
            ("url", self.url.is_none()),
            ("username", self.username.is_none()),
            ("password", self.password.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        match (self.url, self.username, self.password) {
            (Some(url), Some(username), Some(password)) => {
                let url = Url::parse(&url)?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(Error::config_error(format!(
                        "unsupported URL scheme '{}'",
                        url.scheme()
                    )));
                }
                Ok(ConnectionConfig {
                    url,
                    username,
                    password,
                    timeout: self.timeout.map_or_else(default_timeout, Duration::from_secs),
                    verify_tls: !self.insecure.unwrap_or(false),
                })
            }
            _ => Err(Error::config_error(format!(
                "missing connection setting(s): {} (set them in {DEFAULT_DOTFILE}, {ENV_PREFIX}* variables or flags)",
                missing.join(", ")
            ))),
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(Error::config_error(format!(
            "{ENV_PREFIX}INSECURE: '{value}' is not one of 1/true/yes or 0/false/no"
        ))),
    }
}

/// Complete connection configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Base URL of the management API.
    pub url: Url,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Verify TLS certificates.
    pub verify_tls: bool,
}

impl ConnectionConfig {
    /// Create a config with the default timeout and TLS verification on.
    pub fn new(url: Url, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url,
            username: username.into(),
            password: password.into(),
            timeout: default_timeout(),
            verify_tls: true,
        }
    }

    /// Set the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disable TLS certificate verification.
    #[must_use]
    pub const fn insecure(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    /// JSON-RPC endpoint derived from the base URL.
    pub fn endpoint(&self) -> Result<Url> {
        Ok(self.url.join("jsonrpc")?)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}
