#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # adomsync
//!
//! Declarative provisioning of ADOMs, model devices and metavariables on a
//! management server.
//!
//! This library backs the `adomsync` binary and re-exports the workspace
//! crates for convenience.

pub mod app;
pub mod cli;
pub mod error;
pub mod json;

pub use error::{Error, Result};

// Re-export all crates
pub use adomsync_core;
pub use adomsync_jsonrpc;
pub use adomsync_reconciler;
