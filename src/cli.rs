//! CLI definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use adomsync_jsonrpc::ConnectionSettings;
use adomsync_reconciler::{DEFAULT_ADOM, ReconcilerConfig};
use clap::{ArgAction, Parser};

/// adomsync - declarative ADOM provisioning
#[derive(Parser, Debug, Clone)]
#[command(name = "adomsync")]
#[command(version)]
#[command(about = "Create and update ADOMs, model devices and metavariables from a JSON document")]
#[command(
    long_about = "adomsync reads a desired-state document and brings a management server in line with it. \
                  Missing objects are created and differing ones updated; nothing is ever deleted."
)]
pub struct Cli {
    /// Desired-state document (JSON)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Management API base URL, e.g. https://fmg.example.net
    #[arg(long)]
    pub url: Option<String>,

    /// Login name
    #[arg(short, long)]
    pub username: Option<String>,

    /// Login password
    #[arg(long)]
    pub password: Option<String>,

    /// Credentials dotfile (TOML, or JSON with a .json extension)
    #[arg(long, value_name = "PATH")]
    pub credentials_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long, default_value_t = false)]
    pub insecure: bool,

    /// Decide and report, but issue only reads
    #[arg(short = 'n', long, default_value_t = false)]
    pub dry_run: bool,

    /// Validate the document and exit without contacting the server
    #[arg(long, default_value_t = false, conflicts_with = "dry_run")]
    pub check: bool,

    /// Print the run report as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Built-in ADOM that is never created or updated
    #[arg(long, value_name = "NAME", default_value = DEFAULT_ADOM)]
    pub default_adom: String,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long, default_value_t = false)]
    pub no_color: bool,
}

impl Cli {
    /// Connection settings given on the command line, the top layer.
    pub fn connection_overrides(&self) -> ConnectionSettings {
        ConnectionSettings {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: self.timeout,
            insecure: self.insecure.then_some(true),
        }
    }

    /// Reconciler settings selected by the flags.
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            dry_run: self.dry_run,
            default_adom: self.default_adom.clone(),
            ..ReconcilerConfig::default()
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub const fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}
