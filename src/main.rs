//! # adomsync - command entry point
//!
//! ## Sequence
//!
//! 1. **Load** - read the desired-state document and validate it
//! 2. **Connect** - resolve credentials and log in
//! 3. **Reconcile** - create and update ADOMs, variables, devices and overrides
//! 4. **Disconnect** - log out, even after a failure
//!
//! ## Exit codes
//!
//! - 0: success
//! - 1: invalid document or connection settings
//! - 2: authentication failed
//! - 3: transport or API failure
//! - 4: anything else

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use std::process::ExitCode;

use adomsync::app::{self, Outcome};
use adomsync::cli::Cli;
use adomsync::json::{JsonError, JsonSerializable, JsonSuccess, UNKNOWN_EXIT_CODE};
use adomsync_reconciler::RunReport;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut report = RunReport::new(cli.dry_run);
    match app::run(&cli, &mut report).await {
        Ok(outcome) => match print_outcome(&cli, &outcome) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!(error = %format!("{err:#}"), "Failed to write output");
                ExitCode::from(UNKNOWN_EXIT_CODE)
            }
        },
        Err(err) => {
            error!(error = %err, "adomsync failed");
            if cli.json {
                let payload = JsonError::from(&err).with_report(&report);
                if let Err(output_err) = print_json(&payload) {
                    error!(error = %format!("{output_err:#}"), "Failed to write output");
                }
            }
            ExitCode::from(err.exit_code())
        }
    }
}

/// Initialize tracing subscriber with environment filter.
///
/// `RUST_LOG` wins over the verbosity flags. Logs go to stderr so stdout only
/// carries the summary or the JSON report.
fn init_tracing(cli: &Cli) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .init();
}

fn print_outcome(cli: &Cli, outcome: &Outcome) -> Result<()> {
    if cli.json {
        print_json(&JsonSuccess::new(outcome))
    } else {
        println!("{}", outcome.summary());
        if let Outcome::Reconciled { report } = outcome {
            info!(converged = report.converged(), "Done");
        }
        Ok(())
    }
}

fn print_json<T: JsonSerializable>(value: &T) -> Result<()> {
    let json = value.to_json().context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
