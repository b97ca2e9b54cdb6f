//! Core types for the reconciler.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use adomsync_core::PlatformVersion;
use serde::{Deserialize, Serialize};

/// Observed attributes of one ADOM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Remote description.
    pub description: String,
    /// Remote platform version, when reported.
    pub version: Option<PlatformVersion>,
    /// The built-in default ADOM: never created, never updated.
    pub implicit: bool,
}

/// ADOMs known to the management API, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantLookup {
    tenants: BTreeMap<String, TenantRecord>,
}

impl TenantLookup {
    /// Create an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user-created ADOM.
    pub fn insert(&mut self, name: impl Into<String>, record: TenantRecord) {
        self.tenants.insert(name.into(), record);
    }

    /// Record the implicit default ADOM.
    pub fn insert_implicit(&mut self, name: impl Into<String>) {
        self.tenants.insert(
            name.into(),
            TenantRecord {
                implicit: true,
                ..TenantRecord::default()
            },
        );
    }

    /// Get a record.
    pub fn get(&self, name: &str) -> Option<&TenantRecord> {
        self.tenants.get(name)
    }

    /// Whether the ADOM exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tenants.contains_key(name)
    }

    /// Known names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tenants.keys().map(String::as_str)
    }

    /// Number of known ADOMs, the implicit one included.
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    /// Whether nothing is known.
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

/// Devices registered in one ADOM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceLookup {
    names: BTreeSet<String>,
}

impl DeviceLookup {
    /// Create an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a device.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// Whether a device is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no devices are registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for DeviceLookup {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Key of a per-device override.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Device name.
    pub device: String,
    /// Virtual domain inside the device.
    pub vdom: String,
}

impl Scope {
    /// Create a scope.
    pub fn new(device: impl Into<String>, vdom: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            vdom: vdom.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device, self.vdom)
    }
}

/// One metavariable as read back from the API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableRecord {
    /// ADOM-level default value.
    pub default: String,
    /// Per-device overrides.
    pub mappings: BTreeMap<Scope, String>,
}

impl VariableRecord {
    /// Create a record with no overrides.
    pub fn with_default(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            mappings: BTreeMap::new(),
        }
    }
}

/// Metavariables of one ADOM, keyed by flat path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableLookup {
    variables: BTreeMap<String, VariableRecord>,
}

impl VariableLookup {
    /// Create an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn insert(&mut self, name: impl Into<String>, record: VariableRecord) {
        self.variables.insert(name.into(), record);
    }

    /// Get a record.
    pub fn get(&self, name: &str) -> Option<&VariableRecord> {
        self.variables.get(name)
    }

    /// Whether a variable exists at ADOM level.
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// ADOM-level default of a variable.
    pub fn default_value(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|r| r.default.as_str())
    }

    /// Override of a variable for one scope.
    pub fn mapping(&self, name: &str, scope: &Scope) -> Option<&str> {
        self.variables
            .get(name)
            .and_then(|r| r.mappings.get(scope))
            .map(String::as_str)
    }

    /// Set the default, creating the record if needed.
    pub fn set_default(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.variables
            .entry(name.to_string())
            .and_modify(|r| r.default.clone_from(&value))
            .or_insert_with(|| VariableRecord::with_default(value.clone()));
    }

    /// Set an override, creating the record with an empty default if needed.
    pub fn set_mapping(&mut self, name: &str, scope: Scope, value: impl Into<String>) {
        self.variables
            .entry(name.to_string())
            .or_default()
            .mappings
            .insert(scope, value.into());
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether no variables exist.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Declared ADOM attributes compared during reconciliation.
///
/// Only attributes present in the document take part; `None` means "not
/// managed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAttrs {
    /// Description.
    pub description: Option<String>,
    /// Platform version.
    pub version: Option<PlatformVersion>,
}

impl fmt::Display for TenantAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = self.description.as_deref().unwrap_or("-");
        match self.version {
            Some(version) => write!(f, "desc={description:?} version={version}"),
            None => write!(f, "desc={description:?}"),
        }
    }
}

/// Write actions the reconciler can take. There is no delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileAction {
    /// Create an ADOM.
    CreateAdom { adom: String, attrs: TenantAttrs },
    /// Update an ADOM's description and version.
    UpdateAdom { adom: String, attrs: TenantAttrs },
    /// Create an ADOM-level metavariable.
    CreateVariable {
        adom: String,
        name: String,
        value: String,
    },
    /// Change an ADOM-level default.
    UpdateVariable {
        adom: String,
        name: String,
        value: String,
    },
    /// Register a model device.
    CreateDevice {
        adom: String,
        name: String,
        serial: String,
        version: PlatformVersion,
    },
    /// Attach a per-device override.
    CreateMapping {
        adom: String,
        name: String,
        scope: Scope,
        value: String,
    },
    /// Change a per-device override.
    UpdateMapping {
        adom: String,
        name: String,
        scope: Scope,
        value: String,
    },
}

impl ReconcileAction {
    /// Get a description of the action.
    pub fn description(&self) -> String {
        match self {
            Self::CreateAdom { adom, attrs } => format!("create adom {adom} ({attrs})"),
            Self::UpdateAdom { adom, attrs } => format!("update adom {adom} ({attrs})"),
            Self::CreateVariable { adom, name, value } => {
                format!("create variable {name}={value:?} in adom {adom}")
            }
            Self::UpdateVariable { adom, name, value } => {
                format!("update variable {name}={value:?} in adom {adom}")
            }
            Self::CreateDevice {
                adom, name, serial, ..
            } => format!("create device {name} (sn {serial}) in adom {adom}"),
            Self::CreateMapping {
                adom,
                name,
                scope,
                value,
            } => format!("create override {name}={value:?} for {scope} in adom {adom}"),
            Self::UpdateMapping {
                adom,
                name,
                scope,
                value,
            } => format!("update override {name}={value:?} for {scope} in adom {adom}"),
        }
    }
}

/// Kind of entity a step reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// An ADOM.
    Adom,
    /// An ADOM-level metavariable default.
    AdomVariable,
    /// A model device.
    Device,
    /// A per-device metavariable override.
    DeviceVariable,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Adom => "adom",
            Self::AdomVariable => "adom variable",
            Self::Device => "device",
            Self::DeviceVariable => "device variable",
        })
    }
}

/// What a step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Already matched the desired state.
    Unchanged,
    /// Exists already and has no update path.
    AlreadyExists,
    /// Created.
    Created,
    /// Updated.
    Updated,
}

impl StepOutcome {
    /// Whether the step wrote (or, in a dry run, would write) something.
    pub const fn is_change(self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }
}

/// Result of reconciling one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Kind of entity.
    pub entity: EntityKind,
    /// ADOM the entity lives in.
    pub adom: String,
    /// Entity key: ADOM name, device name, flat path, or `path@device/vdom`.
    pub key: String,
    /// What happened.
    pub outcome: StepOutcome,
    /// Value before an update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    /// Action issued, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ReconcileAction>,
    /// Whether the action was sent. False for skips and dry runs.
    pub applied: bool,
}

/// Aggregated result of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Whether writes were suppressed.
    pub dry_run: bool,
    /// Steps in execution order.
    pub steps: Vec<StepResult>,
}

impl RunReport {
    /// Create an empty report.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            steps: Vec::new(),
        }
    }

    /// Append a step.
    pub fn push(&mut self, step: StepResult) {
        self.steps.push(step);
    }

    /// Number of steps with the given outcome.
    pub fn count(&self, outcome: StepOutcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }

    /// Number of creates.
    pub fn created(&self) -> usize {
        self.count(StepOutcome::Created)
    }

    /// Number of updates.
    pub fn updated(&self) -> usize {
        self.count(StepOutcome::Updated)
    }

    /// Number of skips of either kind.
    pub fn skipped(&self) -> usize {
        self.count(StepOutcome::Unchanged)
            .saturating_add(self.count(StepOutcome::AlreadyExists))
    }

    /// Actions in the order they were issued.
    pub fn actions(&self) -> impl Iterator<Item = &ReconcileAction> {
        self.steps.iter().filter_map(|s| s.action.as_ref())
    }

    /// Whether the remote side already matched: nothing was created or updated.
    pub fn converged(&self) -> bool {
        !self.steps.iter().any(|s| s.outcome.is_change())
    }
}
