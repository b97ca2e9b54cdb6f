//! Create/update/skip decisions and the API calls they produce.
//!
//! The rule is the same for every entity: absent means create, equal means
//! skip, different means update. Only the comparison key and the endpoint
//! change between ADOMs, ADOM variables and device overrides.

use adomsync_core::{Device, FlatEntry, Tenant};
use adomsync_jsonrpc::ApiRequest;
use serde_json::{Map, Value, json};

use crate::paths;
use crate::types::{ReconcileAction, Scope, TenantAttrs, TenantLookup, VariableLookup};

/// Outcome of comparing a desired value with what is observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<T> {
    /// Already matches.
    Skip,
    /// Missing remotely.
    Create { desired: T },
    /// Present with a different value.
    Update { previous: T, desired: T },
}

impl<T> Decision<T> {
    /// Whether the decision leads to a call.
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::Skip)
    }
}

/// Compare a desired value against the current one, if any.
pub fn decide<T: PartialEq + Clone>(desired: &T, current: Option<&T>) -> Decision<T> {
    match current {
        None => Decision::Create {
            desired: desired.clone(),
        },
        Some(current) if current == desired => Decision::Skip,
        Some(current) => Decision::Update {
            previous: current.clone(),
            desired: desired.clone(),
        },
    }
}

/// Decision for one ADOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantPlan {
    /// The built-in default ADOM: left alone.
    Implicit,
    /// Create, update or skip.
    Reconcile(Decision<TenantAttrs>),
}

/// Decide what to do with an ADOM.
///
/// Only attributes the document declares are compared, so an ADOM without a
/// `description` keeps whatever description it has remotely.
pub fn plan_tenant(tenant: &Tenant, current: &TenantLookup) -> TenantPlan {
    let desired = TenantAttrs {
        description: tenant.description.clone(),
        version: tenant.version,
    };

    match current.get(&tenant.name) {
        Some(record) if record.implicit => TenantPlan::Implicit,
        Some(record) => {
            let observed = TenantAttrs {
                description: desired
                    .description
                    .as_ref()
                    .map(|_| record.description.clone()),
                version: desired.version.and(record.version),
            };
            TenantPlan::Reconcile(decide(&desired, Some(&observed)))
        }
        None => TenantPlan::Reconcile(decide(&desired, None)),
    }
}

/// Decide what to do with one ADOM-level variable.
pub fn plan_tenant_variable(entry: &FlatEntry, current: &VariableLookup) -> Decision<String> {
    let observed = current.default_value(&entry.path).map(str::to_string);
    decide(&entry.value, observed.as_ref())
}

/// Decide what to do with one device override.
///
/// The caller must make sure the ADOM-level variable exists first; see
/// [`needs_parent_default`].
pub fn plan_device_variable(
    entry: &FlatEntry,
    scope: &Scope,
    current: &VariableLookup,
) -> Decision<String> {
    let observed = current.mapping(&entry.path, scope).map(str::to_string);
    decide(&entry.value, observed.as_ref())
}

/// Whether a device override at `path` needs an empty ADOM-level default
/// created first. The API rejects overrides of unknown variables.
pub fn needs_parent_default(path: &str, current: &VariableLookup) -> bool {
    !current.contains(path)
}

/// Action for an ADOM decision, `None` for skips.
pub fn tenant_action(adom: &str, decision: &Decision<TenantAttrs>) -> Option<ReconcileAction> {
    match decision {
        Decision::Skip => None,
        Decision::Create { desired } => Some(ReconcileAction::CreateAdom {
            adom: adom.to_string(),
            attrs: desired.clone(),
        }),
        Decision::Update { desired, .. } => Some(ReconcileAction::UpdateAdom {
            adom: adom.to_string(),
            attrs: desired.clone(),
        }),
    }
}

/// Action for an ADOM-level variable decision, `None` for skips.
pub fn variable_action(adom: &str, name: &str, decision: &Decision<String>) -> Option<ReconcileAction> {
    match decision {
        Decision::Skip => None,
        Decision::Create { desired } => Some(ReconcileAction::CreateVariable {
            adom: adom.to_string(),
            name: name.to_string(),
            value: desired.clone(),
        }),
        Decision::Update { desired, .. } => Some(ReconcileAction::UpdateVariable {
            adom: adom.to_string(),
            name: name.to_string(),
            value: desired.clone(),
        }),
    }
}

/// Action for a device override decision, `None` for skips.
pub fn mapping_action(
    adom: &str,
    name: &str,
    scope: &Scope,
    decision: &Decision<String>,
) -> Option<ReconcileAction> {
    match decision {
        Decision::Skip => None,
        Decision::Create { desired } => Some(ReconcileAction::CreateMapping {
            adom: adom.to_string(),
            name: name.to_string(),
            scope: scope.clone(),
            value: desired.clone(),
        }),
        Decision::Update { desired, .. } => Some(ReconcileAction::UpdateMapping {
            adom: adom.to_string(),
            name: name.to_string(),
            scope: scope.clone(),
            value: desired.clone(),
        }),
    }
}

/// Action registering a model device.
pub fn device_action(adom: &str, device: &Device) -> ReconcileAction {
    ReconcileAction::CreateDevice {
        adom: adom.to_string(),
        name: device.name.clone(),
        serial: device.serial.clone(),
        version: device.version,
    }
}

impl ReconcileAction {
    /// The API call that carries out this action.
    pub fn request(&self) -> ApiRequest {
        match self {
            Self::CreateAdom { adom, attrs } => {
                let mut data = adom_data(attrs);
                data.insert("name".to_string(), Value::String(adom.clone()));
                ApiRequest::add(paths::ADOMS, Value::Object(data))
            }
            Self::UpdateAdom { adom, attrs } => {
                ApiRequest::update(paths::adom(adom), Value::Object(adom_data(attrs)))
            }
            Self::CreateVariable { adom, name, value } => ApiRequest::add(
                paths::variables(adom),
                json!({"name": name, "value": value}),
            ),
            Self::UpdateVariable { adom, name, value } => {
                ApiRequest::update(paths::variable(adom, name), json!({"value": value}))
            }
            Self::CreateDevice {
                adom,
                name,
                serial,
                version,
            } => ApiRequest::exec(
                paths::ADD_DEVICE,
                json!({
                    "adom": adom,
                    "device": {
                        "name": name,
                        "sn": serial,
                        "os_type": "fos",
                        "os_ver": version.major(),
                        "mr": version.minor(),
                        "mgmt_mode": "fmg",
                        "device action": "add_model",
                    },
                    "flags": ["create_task"],
                }),
            ),
            Self::CreateMapping {
                adom,
                name,
                scope,
                value,
            } => ApiRequest::add(paths::dynamic_mappings(adom, name), mapping_data(scope, value)),
            Self::UpdateMapping {
                adom,
                name,
                scope,
                value,
            } => ApiRequest::update(paths::dynamic_mappings(adom, name), mapping_data(scope, value)),
        }
    }
}

fn adom_data(attrs: &TenantAttrs) -> Map<String, Value> {
    let mut data = Map::new();
    if let Some(description) = &attrs.description {
        data.insert("desc".to_string(), Value::String(description.clone()));
    }
    if let Some(version) = attrs.version {
        data.insert("os_ver".to_string(), json!(version.major()));
        data.insert("mr".to_string(), json!(version.minor()));
    }
    data
}

fn mapping_data(scope: &Scope, value: &str) -> Value {
    json!({
        "_scope": [{"name": scope.device, "vdom": scope.vdom}],
        "value": value,
    })
}
