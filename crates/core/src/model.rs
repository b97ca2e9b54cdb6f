//! Desired-state document model.
//!
//! The document is JSON:
//!
//! ```json
//! {
//!   "adoms": [
//!     {
//!       "name": "tenant_001",
//!       "description": "Branch offices",
//!       "version": [7, 2],
//!       "variables": {"dns": {"primary": "8.8.8.8"}},
//!       "devices": [
//!         {"name": "hub", "serial": "FGT60F0000000001", "version": [7, 2],
//!          "variables": {"loopback": "1.1.1.0"}}
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::flatten::{FlatVariables, flatten};
use crate::value::VarValue;

/// Scope name used for device overrides when none is given.
pub const DEFAULT_VDOM: &str = "global";

/// Platform version as a `(major, minor)` pair, written `[7, 2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformVersion(pub u32, pub u32);

impl PlatformVersion {
    /// Create a version pair.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self(major, minor)
    }

    /// Major release.
    pub const fn major(self) -> u32 {
        self.0
    }

    /// Minor release.
    pub const fn minor(self) -> u32 {
        self.1
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0, self.1)
    }
}

/// The whole desired-state document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredConfig {
    /// Tenants, in the order they are reconciled.
    #[serde(alias = "tenants")]
    pub adoms: Vec<Tenant>,
}

/// An administrative domain (ADOM).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tenant {
    /// Unique, stable key.
    pub name: String,
    /// Human description.
    #[serde(default, alias = "desc")]
    pub description: Option<String>,
    /// Target platform version.
    #[serde(default)]
    pub version: Option<PlatformVersion>,
    /// ADOM-level variable defaults.
    #[serde(default)]
    pub variables: VarValue,
    /// Model devices registered in this ADOM.
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Tenant {
    /// Create a tenant with no description, version, variables or devices.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            version: None,
            variables: VarValue::empty(),
            devices: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the platform version.
    #[must_use]
    pub const fn with_version(mut self, version: PlatformVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the variable tree.
    #[must_use]
    pub fn with_variables(mut self, variables: VarValue) -> Self {
        self.variables = variables;
        self
    }

    /// Add a device.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    /// Flattened ADOM-level variables.
    pub fn flat_variables(&self) -> FlatVariables {
        flatten(&self.variables)
    }
}

/// A pre-provisioned (model) device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Device {
    /// Unique within its tenant.
    pub name: String,
    /// Hardware serial number.
    #[serde(alias = "sn")]
    pub serial: String,
    /// Target platform version.
    pub version: PlatformVersion,
    /// Requested override scope. Accepted by the document format, but device
    /// overrides are currently always written to [`DEFAULT_VDOM`].
    #[serde(default)]
    pub vdom: Option<String>,
    /// Device-level variable overrides.
    #[serde(default)]
    pub variables: VarValue,
}

impl Device {
    /// Create a device with no variables.
    pub fn new(name: impl Into<String>, serial: impl Into<String>, version: PlatformVersion) -> Self {
        Self {
            name: name.into(),
            serial: serial.into(),
            version,
            vdom: None,
            variables: VarValue::empty(),
        }
    }

    /// Set the variable tree.
    #[must_use]
    pub fn with_variables(mut self, variables: VarValue) -> Self {
        self.variables = variables;
        self
    }

    /// Flattened device-level variables.
    pub fn flat_variables(&self) -> FlatVariables {
        flatten(&self.variables)
    }
}

impl DesiredConfig {
    /// Create a config from tenants.
    pub const fn new(adoms: Vec<Tenant>) -> Self {
        Self { adoms }
    }

    /// Parse a JSON document.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::json_parse_failed(e.to_string()))
    }

    /// Read and parse a JSON document from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_read_failed(path, e.to_string()))?;
        Self::from_json(&content)
    }

    /// Total number of devices across all tenants.
    pub fn device_count(&self) -> usize {
        self.adoms.iter().map(|t| t.devices.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "adoms": [{
            "name": "tenant_001",
            "description": "Branch offices",
            "version": [7, 2],
            "variables": {"dns": {"primary": "8.8.8.8"}},
            "devices": [{
                "name": "hub",
                "serial": "S1",
                "version": [7, 2],
                "variables": {"loopback": "1.1.1.0"}
            }]
        }]
    }"#;

    #[test]
    fn test_parse_full_document() -> Result<()> {
        let config = DesiredConfig::from_json(SAMPLE)?;
        assert_eq!(config.adoms.len(), 1);
        let tenant = config.adoms.first();
        assert_eq!(tenant.map(|t| t.name.as_str()), Some("tenant_001"));
        assert_eq!(tenant.and_then(|t| t.version), Some(PlatformVersion::new(7, 2)));
        assert_eq!(
            tenant.map(|t| t.flat_variables().get("dns.primary").map(str::to_string)),
            Some(Some("8.8.8.8".to_string()))
        );
        assert_eq!(config.device_count(), 1);
        Ok(())
    }

    #[test]
    fn test_optional_fields_default() -> Result<()> {
        let config = DesiredConfig::from_json(r#"{"adoms": [{"name": "a"}]}"#)?;
        let tenant = config.adoms.first();
        assert_eq!(tenant.and_then(|t| t.description.clone()), None);
        assert!(tenant.is_some_and(|t| t.devices.is_empty() && t.variables.is_empty()));
        Ok(())
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = DesiredConfig::from_json(r#"{"adoms": [{"name": "a", "colour": "red"}]}"#);
        assert!(matches!(result, Err(Error::JsonParseFailed { .. })));
    }

    #[test]
    fn test_device_requires_serial() {
        let result = DesiredConfig::from_json(
            r#"{"adoms": [{"name": "a", "devices": [{"name": "d", "version": [7, 0]}]}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_version_display() {
        assert_eq!(PlatformVersion::new(7, 4).to_string(), "7.4");
    }
}
