//! Resource paths on the management API.

/// ADOM collection.
pub const ADOMS: &str = "/dvmdb/adom";

/// Command that registers a device.
pub const ADD_DEVICE: &str = "/dvm/cmd/add/device";

/// One ADOM.
pub fn adom(name: &str) -> String {
    format!("{ADOMS}/{name}")
}

/// Devices of an ADOM.
pub fn devices(adom: &str) -> String {
    format!("{ADOMS}/{adom}/device")
}

/// Metavariables of an ADOM.
pub fn variables(adom: &str) -> String {
    format!("/pm/config/adom/{adom}/obj/fmg/variable")
}

/// One metavariable.
pub fn variable(adom: &str, name: &str) -> String {
    format!("{}/{name}", variables(adom))
}

/// Per-device overrides of one metavariable.
pub fn dynamic_mappings(adom: &str, name: &str) -> String {
    format!("{}/dynamic_mapping", variable(adom, name))
}
