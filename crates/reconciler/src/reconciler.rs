//! Reconciler implementation.

use std::fmt::Display;
use std::sync::Arc;

use adomsync_core::{DEFAULT_VDOM, DesiredConfig, Device, Tenant};
use adomsync_jsonrpc::RemoteApi;
use tracing::{debug, info, warn};

use crate::decision::{
    Decision, TenantPlan, device_action, mapping_action, needs_parent_default,
    plan_device_variable, plan_tenant, plan_tenant_variable, tenant_action, variable_action,
};
use crate::error::{Error, Result};
use crate::state::StateReader;
use crate::types::{
    DeviceLookup, EntityKind, ReconcileAction, RunReport, Scope, StepOutcome, StepResult,
    TenantLookup, TenantRecord, VariableLookup,
};

/// Name of the built-in ADOM present on every management server.
pub const DEFAULT_ADOM: &str = "root";

/// Configuration for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Decide and report, but issue only reads.
    pub dry_run: bool,
    /// Built-in ADOM that is never created or updated.
    pub default_adom: String,
    /// VDOM every device override is scoped to.
    pub default_vdom: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            default_adom: DEFAULT_ADOM.to_string(),
            default_vdom: DEFAULT_VDOM.to_string(),
        }
    }
}

/// Remote state of one ADOM, kept current while its steps run.
struct AdomState {
    devices: DeviceLookup,
    variables: VariableLookup,
}

impl AdomState {
    fn empty() -> Self {
        Self {
            devices: DeviceLookup::new(),
            variables: VariableLookup::new(),
        }
    }
}

/// One decision ready to be recorded and, unless skipped, applied.
struct Step {
    entity: EntityKind,
    adom: String,
    key: String,
    outcome: StepOutcome,
    previous: Option<String>,
    action: Option<ReconcileAction>,
}

impl Step {
    fn from_decision<T: Display>(
        entity: EntityKind,
        adom: &str,
        key: impl Into<String>,
        decision: &Decision<T>,
        action: Option<ReconcileAction>,
    ) -> Self {
        let (outcome, previous) = match decision {
            Decision::Skip => (StepOutcome::Unchanged, None),
            Decision::Create { .. } => (StepOutcome::Created, None),
            Decision::Update { previous, .. } => (StepOutcome::Updated, Some(previous.to_string())),
        };
        Self {
            entity,
            adom: adom.to_string(),
            key: key.into(),
            outcome,
            previous,
            action,
        }
    }

    fn existing(entity: EntityKind, adom: &str, key: impl Into<String>) -> Self {
        Self {
            entity,
            adom: adom.to_string(),
            key: key.into(),
            outcome: StepOutcome::AlreadyExists,
            previous: None,
            action: None,
        }
    }
}

/// Drives ADOMs, variables, devices and device overrides toward a desired
/// document, one call at a time.
pub struct Reconciler {
    /// Management API.
    api: Arc<dyn RemoteApi>,
    /// Configuration.
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a new reconciler. The API client must already be logged in.
    pub fn new(api: Arc<dyn RemoteApi>, config: ReconcilerConfig) -> Self {
        Self { api, config }
    }

    /// Reconcile every ADOM of `desired`, in document order.
    ///
    /// # Errors
    ///
    /// Returns the first read or write failure. Earlier writes stay applied.
    pub async fn reconcile(&self, desired: &DesiredConfig) -> Result<RunReport> {
        let mut report = RunReport::new(self.config.dry_run);
        self.reconcile_into(desired, &mut report).await?;
        Ok(report)
    }

    /// Like [`reconcile`](Self::reconcile), but records steps into a caller
    /// owned report so the steps taken before a failure remain visible.
    ///
    /// # Errors
    ///
    /// Returns the first read or write failure.
    pub async fn reconcile_into(&self, desired: &DesiredConfig, report: &mut RunReport) -> Result<()> {
        info!(
            adoms = desired.adoms.len(),
            devices = desired.device_count(),
            dry_run = self.config.dry_run,
            "Starting reconciliation"
        );

        let reader = StateReader::new(self.api.as_ref(), &self.config.default_adom);
        let mut tenants = reader.list_tenants().await?;

        for tenant in &desired.adoms {
            self.reconcile_tenant(&reader, tenant, &mut tenants, report)
                .await?;
        }

        if report.converged() {
            info!(steps = report.steps.len(), "System converged");
        } else {
            info!(
                created = report.created(),
                updated = report.updated(),
                skipped = report.skipped(),
                dry_run = self.config.dry_run,
                "Reconciliation complete"
            );
        }
        Ok(())
    }

    async fn reconcile_tenant(
        &self,
        reader: &StateReader<'_>,
        tenant: &Tenant,
        tenants: &mut TenantLookup,
        report: &mut RunReport,
    ) -> Result<()> {
        let adom = tenant.name.as_str();
        let created = self.reconcile_adom(tenant, tenants, report).await?;

        // A new ADOM has nothing in it yet, and in a dry run it cannot be read.
        let mut state = if created {
            AdomState::empty()
        } else {
            AdomState {
                devices: reader.list_devices(adom).await?,
                variables: reader.list_variables(adom).await?,
            }
        };

        self.reconcile_adom_variables(tenant, &mut state.variables, report)
            .await?;
        for device in &tenant.devices {
            self.reconcile_device(adom, device, &mut state.devices, report)
                .await?;
        }
        for device in &tenant.devices {
            self.reconcile_device_variables(adom, device, &mut state.variables, report)
                .await?;
        }
        Ok(())
    }

    /// Returns whether the ADOM was (or would be) created.
    async fn reconcile_adom(
        &self,
        tenant: &Tenant,
        tenants: &mut TenantLookup,
        report: &mut RunReport,
    ) -> Result<bool> {
        let adom = tenant.name.as_str();

        let decision = match plan_tenant(tenant, tenants) {
            TenantPlan::Implicit => {
                if tenant.description.is_some() || tenant.version.is_some() {
                    warn!(adom, "Attributes of the default adom are not reconciled");
                }
                self.run(Step::existing(EntityKind::Adom, adom, adom), report)
                    .await?;
                return Ok(false);
            }
            TenantPlan::Reconcile(decision) => decision,
        };

        let created = matches!(decision, Decision::Create { .. });
        let action = tenant_action(adom, &decision);
        self.run(
            Step::from_decision(EntityKind::Adom, adom, adom, &decision, action),
            report,
        )
        .await?;

        if let Decision::Create { desired } | Decision::Update { desired, .. } = decision {
            let current = tenants.get(adom).cloned().unwrap_or_default();
            tenants.insert(
                adom,
                TenantRecord {
                    description: desired.description.unwrap_or(current.description),
                    version: desired.version.or(current.version),
                    implicit: false,
                },
            );
        }
        Ok(created)
    }

    async fn reconcile_adom_variables(
        &self,
        tenant: &Tenant,
        variables: &mut VariableLookup,
        report: &mut RunReport,
    ) -> Result<()> {
        let adom = tenant.name.as_str();

        for entry in &tenant.flat_variables() {
            let decision = plan_tenant_variable(entry, variables);
            let action = variable_action(adom, &entry.path, &decision);
            self.run(
                Step::from_decision(EntityKind::AdomVariable, adom, &entry.path, &decision, action),
                report,
            )
            .await?;
            if decision.is_change() {
                variables.set_default(&entry.path, entry.value.clone());
            }
        }
        Ok(())
    }

    async fn reconcile_device(
        &self,
        adom: &str,
        device: &Device,
        devices: &mut DeviceLookup,
        report: &mut RunReport,
    ) -> Result<()> {
        if devices.contains(&device.name) {
            // No update path for registered devices.
            return self
                .run(Step::existing(EntityKind::Device, adom, &device.name), report)
                .await;
        }

        let decision = Decision::Create {
            desired: device.serial.clone(),
        };
        self.run(
            Step::from_decision(
                EntityKind::Device,
                adom,
                &device.name,
                &decision,
                Some(device_action(adom, device)),
            ),
            report,
        )
        .await?;
        devices.insert(device.name.clone());
        Ok(())
    }

    async fn reconcile_device_variables(
        &self,
        adom: &str,
        device: &Device,
        variables: &mut VariableLookup,
        report: &mut RunReport,
    ) -> Result<()> {
        if let Some(vdom) = device
            .vdom
            .as_deref()
            .filter(|vdom| *vdom != self.config.default_vdom)
        {
            warn!(
                adom,
                device = %device.name,
                vdom,
                using = %self.config.default_vdom,
                "Per-device vdom is not honoured for overrides"
            );
        }
        let scope = Scope::new(device.name.as_str(), self.config.default_vdom.as_str());

        for entry in &device.flat_variables() {
            if needs_parent_default(&entry.path, variables) {
                let decision = Decision::Create {
                    desired: String::new(),
                };
                let action = variable_action(adom, &entry.path, &decision);
                self.run(
                    Step::from_decision(EntityKind::AdomVariable, adom, &entry.path, &decision, action),
                    report,
                )
                .await?;
                variables.set_default(&entry.path, String::new());
            }

            let decision = plan_device_variable(entry, &scope, variables);
            let action = mapping_action(adom, &entry.path, &scope, &decision);
            self.run(
                Step::from_decision(
                    EntityKind::DeviceVariable,
                    adom,
                    format!("{}@{scope}", entry.path),
                    &decision,
                    action,
                ),
                report,
            )
            .await?;
            if decision.is_change() {
                variables.set_mapping(&entry.path, scope.clone(), entry.value.clone());
            }
        }
        Ok(())
    }

    /// Log a step, apply its action unless this is a dry run, and record it.
    async fn run(&self, step: Step, report: &mut RunReport) -> Result<()> {
        let applied = match &step.action {
            Some(action) if !self.config.dry_run => {
                self.apply(action).await?;
                true
            }
            Some(_) | None => false,
        };

        let entity = step.entity;
        let adom = step.adom.as_str();
        let key = step.key.as_str();
        match step.outcome {
            StepOutcome::Unchanged => info!(%entity, adom, key, "Unchanged, skipping"),
            StepOutcome::AlreadyExists => {
                info!(%entity, adom, key, "Already exists, skipping");
            }
            StepOutcome::Created if applied => info!(%entity, adom, key, "Created"),
            StepOutcome::Updated if applied => info!(
                %entity,
                adom,
                key,
                previous = step.previous.as_deref().unwrap_or_default(),
                "Updated"
            ),
            StepOutcome::Created | StepOutcome::Updated => info!(
                %entity,
                adom,
                key,
                outcome = ?step.outcome,
                "Dry run, not applied"
            ),
        }

        report.push(StepResult {
            entity: step.entity,
            adom: step.adom,
            key: step.key,
            outcome: step.outcome,
            previous: step.previous,
            action: step.action,
            applied,
        });
        Ok(())
    }

    async fn apply(&self, action: &ReconcileAction) -> Result<()> {
        let request = action.request();
        debug!(request = %request, "Applying action");
        self.api
            .dispatch(&request)
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!(action = %action.description(), error = %e, "Action failed");
                Error::action_failed(action.description(), e)
            })
    }

    /// Get the configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder {
    api: Option<Arc<dyn RemoteApi>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            api: None,
            config: ReconcilerConfig::default(),
        }
    }

    /// Set the management API.
    pub fn with_api(mut self, api: Arc<dyn RemoteApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable/disable dry run.
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.config.dry_run = enabled;
        self
    }

    /// Set the built-in ADOM name.
    pub fn default_adom(mut self, name: impl Into<String>) -> Self {
        self.config.default_adom = name.into();
        self
    }

    /// Set the VDOM used for device overrides.
    pub fn default_vdom(mut self, vdom: impl Into<String>) -> Self {
        self.config.default_vdom = vdom.into();
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Fails without an API or with an empty default ADOM or VDOM.
    pub fn build(self) -> Result<Reconciler> {
        let api = self
            .api
            .ok_or_else(|| Error::invalid_config("Management API is required"))?;

        if self.config.default_adom.trim().is_empty() {
            return Err(Error::invalid_config("default adom must not be empty"));
        }
        if self.config.default_vdom.trim().is_empty() {
            return Err(Error::invalid_config("default vdom must not be empty"));
        }

        Ok(Reconciler::new(api, self.config))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
