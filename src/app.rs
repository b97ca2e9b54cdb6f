//! One invocation: load, check, connect, reconcile, disconnect.

use std::path::Path;
use std::sync::Arc;

use adomsync_core::{DesiredConfig, validate};
use adomsync_jsonrpc::{ConnectionConfig, ConnectionSettings, DEFAULT_DOTFILE, JsonRpcClient};
use adomsync_reconciler::{ReconcilerBuilder, ReconcilerConfig, RunReport};
use itertools::Itertools;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::Result;

/// What a successful invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Outcome {
    /// `--check`: the document is valid.
    Checked { adoms: usize, devices: usize },
    /// The server was reconciled (or, in a dry run, planned).
    Reconciled { report: RunReport },
}

impl Outcome {
    /// Human-readable summary for the terminal.
    pub fn summary(&self) -> String {
        match self {
            Self::Checked { adoms, devices } => {
                format!("Document is valid: {adoms} adom(s), {devices} device(s)")
            }
            Self::Reconciled { report } => summarize(report),
        }
    }
}

fn summarize(report: &RunReport) -> String {
    let prefix = if report.dry_run { "would " } else { "" };
    let verb = if report.dry_run { "Planned" } else { "Applied" };

    report
        .steps
        .iter()
        .filter(|s| s.outcome.is_change())
        .filter_map(|s| s.action.as_ref())
        .map(|action| format!("  {prefix}{}", action.description()))
        .chain(std::iter::once(format!(
            "{verb}: {} created, {} updated, {} unchanged",
            report.created(),
            report.updated(),
            report.skipped()
        )))
        .join("\n")
}

/// Load a document and run static validation on it.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed, or when validation finds
/// problems.
pub fn load_document(path: &Path) -> Result<DesiredConfig> {
    let document = DesiredConfig::from_file(path)?;
    validate(&document)?;
    info!(
        path = %path.display(),
        adoms = document.adoms.len(),
        devices = document.device_count(),
        "Loaded desired state"
    );
    Ok(document)
}

/// Layer dotfile, environment and flags into a connection configuration.
///
/// An explicit `--credentials-file` must exist; the default dotfile is
/// optional.
///
/// # Errors
///
/// Fails on an unreadable dotfile or incomplete settings.
pub fn resolve_connection(cli: &Cli, environment: ConnectionSettings) -> Result<ConnectionConfig> {
    let dotfile = match &cli.credentials_file {
        Some(path) => ConnectionSettings::from_file(path)?,
        None => ConnectionSettings::from_optional_file(Path::new(DEFAULT_DOTFILE))?,
    };

    Ok(dotfile
        .merge(environment)
        .merge(cli.connection_overrides())
        .resolve()?)
}

/// Log in, reconcile into `report`, and log out again.
///
/// Logout runs whether or not reconciliation succeeded; a failed logout is
/// only a warning.
///
/// # Errors
///
/// Returns the login failure or the first reconciliation failure.
pub async fn reconcile_with(
    client: Arc<JsonRpcClient>,
    config: ReconcilerConfig,
    document: &DesiredConfig,
    report: &mut RunReport,
) -> Result<()> {
    client.login().await?;

    let result = match ReconcilerBuilder::new()
        .with_api(client.clone())
        .with_config(config)
        .build()
    {
        Ok(reconciler) => reconciler.reconcile_into(document, report).await,
        Err(e) => Err(e),
    };

    if let Err(e) = client.logout().await {
        warn!(error = %e, "Logout failed");
    }

    Ok(result?)
}

/// Run one invocation. Steps taken before a failure are left in `report`.
///
/// # Errors
///
/// Returns the first failure; see [`crate::Error::exit_code`].
pub async fn run(cli: &Cli, report: &mut RunReport) -> Result<Outcome> {
    let document = load_document(&cli.file)?;

    if cli.check {
        return Ok(Outcome::Checked {
            adoms: document.adoms.len(),
            devices: document.device_count(),
        });
    }

    let connection = resolve_connection(cli, ConnectionSettings::from_env()?)?;
    let client = Arc::new(JsonRpcClient::new(connection)?);

    *report = RunReport::new(cli.dry_run);
    reconcile_with(client, cli.reconciler_config(), &document, report).await?;

    Ok(Outcome::Reconciled {
        report: report.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use adomsync_reconciler::{EntityKind, ReconcileAction, StepOutcome, StepResult};
    use clap::Parser;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn created(adom: &str) -> StepResult {
        StepResult {
            entity: EntityKind::Adom,
            adom: adom.to_string(),
            key: adom.to_string(),
            outcome: StepOutcome::Created,
            previous: None,
            action: Some(ReconcileAction::CreateAdom {
                adom: adom.to_string(),
                attrs: adomsync_reconciler::TenantAttrs::default(),
            }),
            applied: false,
        }
    }

    #[test]
    fn test_dry_run_summary_lists_planned_actions() {
        let mut report = RunReport::new(true);
        report.push(created("tenant_001"));

        let summary = Outcome::Reconciled { report }.summary();

        assert!(summary.contains("would create adom tenant_001"));
        assert!(summary.contains("Planned: 1 created, 0 updated, 0 unchanged"));
    }

    #[test]
    fn test_applied_summary_one_line_per_change() {
        let mut report = RunReport::new(false);
        report.push(created("tenant_001"));
        report.push(created("tenant_002"));

        let summary = Outcome::Reconciled { report }.summary();
        let lines: Vec<&str> = summary.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines.first().is_some_and(|l| l.starts_with("  create adom tenant_001")));
        assert_eq!(lines.last(), Some(&"Applied: 2 created, 0 updated, 0 unchanged"));
    }

    #[test]
    fn test_converged_summary_is_totals_only() {
        let summary = Outcome::Reconciled {
            report: RunReport::new(false),
        }
        .summary();
        assert_eq!(summary, "Applied: 0 created, 0 updated, 0 unchanged");
    }

    #[test]
    fn test_check_summary() {
        let outcome = Outcome::Checked { adoms: 2, devices: 3 };
        assert_eq!(outcome.summary(), "Document is valid: 2 adom(s), 3 device(s)");
    }

    #[test]
    fn test_credentials_file_overridden_by_env_and_flags() -> TestResult {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            "url = \"https://file.example.net\"\nusername = \"file-user\"\npassword = \"file-pass\"\ntimeout = 10"
        )?;

        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from([
            "adomsync",
            "--credentials-file",
            path.as_str(),
            "--username",
            "flag-user",
            "adoms.json",
        ])?;
        let environment = ConnectionSettings {
            username: Some("env-user".to_string()),
            password: Some("env-pass".to_string()),
            ..ConnectionSettings::default()
        };

        let config = resolve_connection(&cli, environment)?;

        assert_eq!(config.url.as_str(), "https://file.example.net/");
        assert_eq!(config.username, "flag-user");
        assert_eq!(config.password, "env-pass");
        assert_eq!(config.timeout.as_secs(), 10);
        Ok(())
    }

    #[test]
    fn test_missing_credentials_file_is_config_error() -> TestResult {
        let cli = Cli::try_parse_from([
            "adomsync",
            "--credentials-file",
            "/nonexistent/adomsync.toml",
            "adoms.json",
        ])?;

        let result = resolve_connection(&cli, ConnectionSettings::default());

        match result {
            Err(err) => assert_eq!(err.exit_code(), 1),
            Ok(_) => return Err("expected a configuration error".into()),
        }
        Ok(())
    }

    #[test]
    fn test_load_document_reports_validation_errors() -> TestResult {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"{{"adoms": [{{"name": "a", "devices": [
                {{"name": "hub", "serial": "S1", "version": [7, 2]}},
                {{"name": "hub", "serial": "S1", "version": [7, 2]}}
            ]}}]}}"#
        )?;

        match load_document(file.path()) {
            Err(err) => {
                assert_eq!(err.code(), crate::json::ErrorCode::ValidationFailed);
                assert_eq!(err.exit_code(), 1);
            }
            Ok(_) => return Err("expected validation to fail".into()),
        }
        Ok(())
    }
}
