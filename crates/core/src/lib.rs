#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # adomsync-core
//!
//! Desired-state model for adomsync: the JSON document format, variable
//! trees and their flattening into dot-delimited metavariable names, and the
//! static checks run before anything talks to the management API.

pub mod error;
pub mod flatten;
pub mod model;
pub mod validate;
pub mod value;

pub use error::{Error, Result};
pub use flatten::{FlatEntry, FlatVariables, PATH_SEPARATOR, flatten, unflatten};
pub use model::{DEFAULT_VDOM, DesiredConfig, Device, PlatformVersion, Tenant};
pub use validate::validate;
pub use value::VarValue;
