//! Variable trees.
//!
//! A variable tree is what a user writes under `variables` for an ADOM or a
//! device. Leaves are opaque strings; internal nodes are keyed maps (kept in
//! document order) or ordered lists.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A node of a variable tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarValue {
    /// A leaf. Numbers and booleans are kept in their textual form.
    Scalar(String),
    /// An ordered list of nodes.
    List(Vec<VarValue>),
    /// A keyed map, in document order.
    Map(Vec<(String, VarValue)>),
}

impl VarValue {
    /// Create a scalar leaf.
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    /// An empty map, the tree of an entity that declares no variables.
    pub const fn empty() -> Self {
        Self::Map(Vec::new())
    }

    /// Whether the tree holds no leaves at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(_) => false,
            Self::List(items) => items.iter().all(Self::is_empty),
            Self::Map(entries) => entries.iter().all(|(_, v)| v.is_empty()),
        }
    }
}

impl Default for VarValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for VarValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Scalar(String::new()),
            Value::Bool(b) => Self::Scalar(b.to_string()),
            Value::Number(n) => Self::Scalar(n.to_string()),
            Value::String(s) => Self::Scalar(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl From<&VarValue> for Value {
    fn from(value: &VarValue) -> Self {
        match value {
            VarValue::Scalar(s) => Self::String(s.clone()),
            VarValue::List(items) => Self::Array(items.iter().map(Self::from).collect()),
            VarValue::Map(entries) => Self::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for VarValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl Serialize for VarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::from(self).serialize(serializer)
    }
}
