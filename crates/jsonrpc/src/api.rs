//! The narrow API surface the reconciler depends on.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// JSON-RPC method verbs understood by the management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    /// Read objects.
    Get,
    /// Create an object.
    Add,
    /// Modify an existing object.
    Update,
    /// Run a command.
    Exec,
}

impl Verb {
    /// Wire name of the verb.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Add => "add",
            Self::Update => "update",
            Self::Exec => "exec",
        }
    }

    /// Whether the verb can change remote state.
    pub const fn is_write(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single call against the management API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Method verb.
    pub verb: Verb,
    /// Resource path, e.g. `/dvmdb/adom`.
    pub url: String,
    /// Call payload: `data` for writes, extra parameters for `get`.
    pub payload: Value,
}

impl ApiRequest {
    /// Create a request.
    pub fn new(verb: Verb, url: impl Into<String>, payload: Value) -> Self {
        Self {
            verb,
            url: url.into(),
            payload,
        }
    }

    /// A `get` with no extra parameters.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Verb::Get, url, Value::Null)
    }

    /// An `add` carrying `data`.
    pub fn add(url: impl Into<String>, data: Value) -> Self {
        Self::new(Verb::Add, url, data)
    }

    /// An `update` carrying `data`.
    pub fn update(url: impl Into<String>, data: Value) -> Self {
        Self::new(Verb::Update, url, data)
    }

    /// An `exec` carrying `data`.
    pub fn exec(url: impl Into<String>, data: Value) -> Self {
        Self::new(Verb::Exec, url, data)
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.url)
    }
}

/// Session-scoped access to the management API.
///
/// Every method returns the `data` member of a successful result. A non-zero
/// status code, an HTTP failure or an unreadable body is an error.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Read objects at `url`. `params` are merged into the request parameters
    /// (`fields`, `filter`, `option`, ...); pass `Value::Null` for none.
    async fn get(&self, url: &str, params: Value) -> Result<Value>;

    /// Create an object at `url`.
    async fn add(&self, url: &str, data: Value) -> Result<Value>;

    /// Modify the object at `url`.
    async fn update(&self, url: &str, data: Value) -> Result<Value>;

    /// Run the command at `url`.
    async fn exec(&self, url: &str, data: Value) -> Result<Value>;

    /// Send a prepared request through the matching verb.
    async fn dispatch(&self, request: &ApiRequest) -> Result<Value> {
        let payload = request.payload.clone();
        match request.verb {
            Verb::Get => self.get(&request.url, payload).await,
            Verb::Add => self.add(&request.url, payload).await,
            Verb::Update => self.update(&request.url, payload).await,
            Verb::Exec => self.exec(&request.url, payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verb_wire_names() {
        assert_eq!(Verb::Update.to_string(), "update");
        assert_eq!(
            serde_json::to_value(Verb::Exec).ok(),
            Some(json!("exec"))
        );
        assert!(!Verb::Get.is_write());
        assert!(Verb::Add.is_write());
    }

    #[test]
    fn test_request_display() {
        let request = ApiRequest::add("/dvmdb/adom", json!({"name": "a"}));
        assert_eq!(request.to_string(), "add /dvmdb/adom");
    }
}
