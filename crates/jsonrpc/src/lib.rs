#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # adomsync-jsonrpc
//!
//! Session-based JSON-RPC transport for the management API.
//!
//! ## Features
//!
//! - [`RemoteApi`]: the four verbs (`get`, `add`, `update`, `exec`) the
//!   reconciler needs, as a trait so tests can swap in a double
//! - [`JsonRpcClient`]: the HTTP implementation, with login/logout
//! - [`ConnectionSettings`]: layered credentials from dotfile, environment
//!   and flags
//! - Error classification into config, auth, transport and API failures
//!
//! ## Example
//!
//! ```ignore
//! use adomsync_jsonrpc::{ConnectionSettings, JsonRpcClient, RemoteApi};
//!
//! let config = ConnectionSettings::from_env()?.resolve()?;
//! let client = JsonRpcClient::new(config)?;
//! client.login().await?;
//! let adoms = client.get("/dvmdb/adom", serde_json::Value::Null).await?;
//! client.logout().await?;
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;

pub use api::{ApiRequest, RemoteApi, Verb};
pub use client::JsonRpcClient;
pub use config::{ConnectionConfig, ConnectionSettings, DEFAULT_DOTFILE};
pub use error::{Error, ErrorKind, Result};
