//! Reading current state from the management API.
//!
//! Each reader issues one `get` and normalizes the answer into a lookup keyed
//! by name. Any failure aborts the run: nothing is reconciled without a
//! baseline.

use adomsync_core::PlatformVersion;
use adomsync_jsonrpc::RemoteApi;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::paths;
use crate::types::{DeviceLookup, Scope, TenantLookup, TenantRecord, VariableLookup, VariableRecord};

/// Reads remote state through a [`RemoteApi`].
pub struct StateReader<'a> {
    api: &'a dyn RemoteApi,
    default_adom: &'a str,
}

impl<'a> StateReader<'a> {
    /// Create a reader. `default_adom` is the built-in ADOM that always exists.
    pub const fn new(api: &'a dyn RemoteApi, default_adom: &'a str) -> Self {
        Self { api, default_adom }
    }

    /// User-created ADOMs plus the default ADOM.
    pub async fn list_tenants(&self) -> Result<TenantLookup> {
        let data = self
            .api
            .get(paths::ADOMS, Value::Null)
            .await
            .map_err(|e| Error::state_failed("adoms", e))?;
        let lookup = parse_tenants(&data, self.default_adom)?;
        debug!(count = lookup.len(), "Read adoms");
        Ok(lookup)
    }

    /// Devices registered in `adom`.
    pub async fn list_devices(&self, adom: &str) -> Result<DeviceLookup> {
        let data = self
            .api
            .get(&paths::devices(adom), Value::Null)
            .await
            .map_err(|e| Error::state_failed(format!("devices of adom '{adom}'"), e))?;
        let lookup = parse_devices(&data)?;
        debug!(adom, count = lookup.len(), "Read devices");
        Ok(lookup)
    }

    /// Metavariables of `adom`, with their per-device overrides.
    pub async fn list_variables(&self, adom: &str) -> Result<VariableLookup> {
        let data = self
            .api
            .get(&paths::variables(adom), Value::Null)
            .await
            .map_err(|e| Error::state_failed(format!("variables of adom '{adom}'"), e))?;
        let lookup = parse_variables(&data)?;
        debug!(adom, count = lookup.len(), "Read variables");
        Ok(lookup)
    }
}

/// Normalize an ADOM listing.
///
/// Built-in ADOMs report a zero `create_time` and are dropped; the default
/// ADOM is always added back as implicit.
pub fn parse_tenants(data: &Value, default_adom: &str) -> Result<TenantLookup> {
    let mut lookup = TenantLookup::new();

    for entry in records(data, "adom")? {
        let name = required_name(entry, "adom")?;
        let created = entry
            .get("create_time")
            .and_then(as_u64)
            .is_some_and(|t| t != 0);
        if !created || name == default_adom {
            continue;
        }

        lookup.insert(
            name,
            TenantRecord {
                description: entry.get("desc").map(as_text).unwrap_or_default(),
                version: parse_version(entry.get("os_ver"), entry.get("mr")),
                implicit: false,
            },
        );
    }

    lookup.insert_implicit(default_adom);
    Ok(lookup)
}

/// Normalize a device listing.
pub fn parse_devices(data: &Value) -> Result<DeviceLookup> {
    records(data, "device")?
        .map(|entry| required_name(entry, "device"))
        .collect()
}

/// Normalize a metavariable listing, inverting each record's
/// `dynamic_mapping[]._scope[]` lists into `(device, vdom) -> value`.
pub fn parse_variables(data: &Value) -> Result<VariableLookup> {
    let mut lookup = VariableLookup::new();

    for entry in records(data, "variable")? {
        let name = required_name(entry, "variable")?;
        let mut record = VariableRecord::with_default(entry.get("value").map(as_text).unwrap_or_default());

        let mappings = entry
            .get("dynamic_mapping")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for mapping in mappings {
            let value = mapping.get("value").map(as_text).unwrap_or_default();
            let scopes = mapping
                .get("_scope")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for scope in scopes {
                let device = scope.get("name").and_then(Value::as_str).ok_or_else(|| {
                    Error::invalid_state("variable", format!("mapping of '{name}' has a scope without a device name"))
                })?;
                let vdom = scope
                    .get("vdom")
                    .and_then(Value::as_str)
                    .unwrap_or(adomsync_core::DEFAULT_VDOM);
                record.mappings.insert(Scope::new(device, vdom), value.clone());
            }
        }

        lookup.insert(name, record);
    }

    Ok(lookup)
}

fn records<'v>(data: &'v Value, what: &str) -> Result<std::slice::Iter<'v, Value>> {
    const EMPTY: &[Value] = &[];
    match data {
        Value::Null => Ok(EMPTY.iter()),
        Value::Array(items) => Ok(items.iter()),
        _ => Err(Error::invalid_state(what, "data is not a list")),
    }
}

fn required_name<'v>(entry: &'v Value, what: &str) -> Result<&'v str> {
    entry
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_state(what, "record without a name"))
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read `(os_ver, mr)`. `os_ver` comes back either as a number (`7`) or as a
/// release string (`"7.0"`).
fn parse_version(os_ver: Option<&Value>, mr: Option<&Value>) -> Option<PlatformVersion> {
    let major = match os_ver? {
        Value::String(s) => s.split('.').next()?.trim().parse().ok()?,
        other => u32::try_from(as_u64(other)?).ok()?,
    };
    let minor = u32::try_from(as_u64(mr?)?).ok()?;
    Some(PlatformVersion::new(major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_adoms_filtered_and_default_added() -> Result<()> {
        let data = json!([
            {"name": "root", "create_time": 0, "desc": ""},
            {"name": "FortiCarrier", "create_time": 0},
            {"name": "tenant_001", "create_time": 1_700_000_000, "desc": "Branches", "os_ver": 7, "mr": 2},
            {"name": "tenant_002", "create_time": "1700000001", "os_ver": "7.0", "mr": "4"}
        ]);

        let lookup = parse_tenants(&data, "root")?;

        assert_eq!(lookup.names().collect::<Vec<_>>(), vec!["root", "tenant_001", "tenant_002"]);
        assert!(lookup.get("root").is_some_and(|r| r.implicit));
        assert_eq!(
            lookup.get("tenant_001"),
            Some(&TenantRecord {
                description: "Branches".to_string(),
                version: Some(PlatformVersion::new(7, 2)),
                implicit: false,
            })
        );
        assert_eq!(
            lookup.get("tenant_002").and_then(|r| r.version),
            Some(PlatformVersion::new(7, 4))
        );
        Ok(())
    }

    #[test]
    fn test_empty_listing_still_has_default() -> Result<()> {
        let lookup = parse_tenants(&Value::Null, "root")?;
        assert_eq!(lookup.len(), 1);
        assert!(lookup.contains("root"));
        Ok(())
    }

    #[test]
    fn test_non_list_is_invalid() {
        let result = parse_tenants(&json!({"name": "x"}), "root");
        assert!(matches!(result, Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_parse_devices() -> Result<()> {
        let lookup = parse_devices(&json!([{"name": "hub", "sn": "S1"}, {"name": "spoke1"}]))?;
        assert!(lookup.contains("hub"));
        assert!(lookup.contains("spoke1"));
        assert!(!lookup.contains("spoke2"));
        Ok(())
    }

    #[test]
    fn test_parse_variables_inverts_scopes() -> Result<()> {
        let data = json!([
            {
                "name": "loopback",
                "value": "",
                "dynamic_mapping": [
                    {"_scope": [{"name": "hub", "vdom": "global"}, {"name": "spoke", "vdom": "root"}], "value": "1.1.1.0"},
                    {"_scope": [{"name": "edge"}], "value": "1.1.1.9"}
                ]
            },
            {"name": "dns.primary", "value": "8.8.8.8", "dynamic_mapping": null},
            {"name": "asn", "value": 65001}
        ]);

        let lookup = parse_variables(&data)?;

        assert_eq!(lookup.default_value("loopback"), Some(""));
        assert_eq!(lookup.mapping("loopback", &Scope::new("hub", "global")), Some("1.1.1.0"));
        assert_eq!(lookup.mapping("loopback", &Scope::new("spoke", "root")), Some("1.1.1.0"));
        assert_eq!(lookup.mapping("loopback", &Scope::new("edge", "global")), Some("1.1.1.9"));
        assert_eq!(lookup.default_value("dns.primary"), Some("8.8.8.8"));
        assert_eq!(lookup.default_value("asn"), Some("65001"));
        Ok(())
    }

    #[test]
    fn test_scope_without_device_is_invalid() {
        let data = json!([{"name": "x", "dynamic_mapping": [{"_scope": [{"vdom": "root"}], "value": "1"}]}]);
        assert!(matches!(parse_variables(&data), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!(
            parse_version(Some(&json!(6)), Some(&json!(4))),
            Some(PlatformVersion::new(6, 4))
        );
        assert_eq!(parse_version(Some(&json!("7.0")), None), None);
        assert_eq!(parse_version(None, Some(&json!(2))), None);
    }
}
