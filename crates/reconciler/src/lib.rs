//! Create/update reconciliation of ADOMs, model devices and metavariables.
//!
//! The reconciler brings a management server in line with a desired-state
//! document without ever deleting anything:
//!
//! - **Read**: list ADOMs, then the devices and metavariables of each ADOM
//! - **Decide**: absent means create, equal means skip, different means update
//! - **Apply**: issue the calls one at a time, stopping at the first failure
//!
//! # Ordering
//!
//! For each ADOM, in document order:
//! 1. The ADOM itself
//! 2. ADOM-level metavariables
//! 3. Model devices (registered devices are left alone)
//! 4. Per-device overrides, creating an empty ADOM-level default first when
//!    the variable does not exist yet
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use adomsync_core::DesiredConfig;
//! use adomsync_jsonrpc::{ConnectionSettings, JsonRpcClient};
//! use adomsync_reconciler::ReconcilerBuilder;
//!
//! let client = Arc::new(JsonRpcClient::new(ConnectionSettings::from_env()?.resolve()?)?);
//! client.login().await?;
//!
//! let reconciler = ReconcilerBuilder::new().with_api(client.clone()).build()?;
//! let report = reconciler.reconcile(&DesiredConfig::from_file("adoms.json")?).await?;
//! println!("{} created, {} updated", report.created(), report.updated());
//!
//! client.logout().await?;
//! ```

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod decision;
pub mod error;
pub mod paths;
pub mod reconciler;
pub mod state;
pub mod types;

// Re-export main types
pub use decision::{Decision, TenantPlan, decide};
pub use error::{Error, Result};
pub use reconciler::{DEFAULT_ADOM, Reconciler, ReconcilerBuilder, ReconcilerConfig};
pub use state::StateReader;
pub use types::{
    DeviceLookup, EntityKind, ReconcileAction, RunReport, Scope, StepOutcome, StepResult,
    TenantAttrs, TenantLookup, TenantRecord, VariableLookup, VariableRecord,
};
