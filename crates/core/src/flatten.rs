//! Flattening of variable trees into dot-delimited paths.
//!
//! The management API only knows flat metavariable names, so a tree such as
//!
//! ```text
//! {"dns": {"primary": "8.8.8.8"}, "overlay": [{"id": "1"}, {"id": "2"}]}
//! ```
//!
//! is reconciled as `dns.primary`, `overlay.0.id` and `overlay.1.id`.
//! Output order follows document order, so repeated runs over the same input
//! see the same sequence of paths.

use itertools::Itertools;
use serde::Serialize;

use crate::value::VarValue;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// One leaf of a flattened tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatEntry {
    /// Dot-delimited position of the leaf.
    pub path: String,
    /// Leaf value.
    pub value: String,
}

impl FlatEntry {
    /// Create a flat entry.
    pub fn new(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

/// Ordered set of flat entries produced by [`flatten`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlatVariables {
    entries: Vec<FlatEntry>,
}

impl FlatVariables {
    /// Build from entries, keeping their order.
    pub const fn from_entries(entries: Vec<FlatEntry>) -> Self {
        Self { entries }
    }

    /// Iterate entries in flattening order.
    pub fn iter(&self) -> std::slice::Iter<'_, FlatEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value stored at `path`, if any.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.value.as_str())
    }

    /// Paths that occur more than once, e.g. a literal `"a.b"` key next to a
    /// nested `{"a": {"b": ..}}`.
    pub fn duplicate_paths(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.path.as_str())
            .duplicates()
            .collect_vec()
    }
}

impl<'a> IntoIterator for &'a FlatVariables {
    type Item = &'a FlatEntry;
    type IntoIter = std::slice::Iter<'a, FlatEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Flatten a variable tree.
///
/// Map keys and list indices become path segments. Empty maps and lists
/// contribute nothing.
pub fn flatten(tree: &VarValue) -> FlatVariables {
    let mut entries = Vec::new();
    walk(tree, "", &mut entries);
    FlatVariables::from_entries(entries)
}

fn walk(node: &VarValue, prefix: &str, out: &mut Vec<FlatEntry>) {
    match node {
        VarValue::Scalar(value) => out.push(FlatEntry::new(prefix, value.clone())),
        VarValue::List(items) => {
            for (index, item) in items.iter().enumerate() {
                walk(item, &join(prefix, &index.to_string()), out);
            }
        }
        VarValue::Map(entries) => {
            for (key, item) in entries {
                walk(item, &join(prefix, key), out);
            }
        }
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{segment}")
    }
}

/// Rebuild a tree from flat entries.
///
/// A branch whose children are named exactly `0..n`, in that order, becomes a
/// list; every other branch becomes a map. When two entries disagree about the
/// shape at a path, the later one wins.
pub fn unflatten(flat: &FlatVariables) -> VarValue {
    let mut root = Node::Branch(Vec::new());
    for entry in flat {
        let segments = if entry.path.is_empty() {
            Vec::new()
        } else {
            entry.path.split(PATH_SEPARATOR).collect_vec()
        };
        insert(&mut root, &segments, entry.value.clone());
    }
    root.into_value()
}

#[derive(Debug)]
enum Node {
    Leaf(String),
    Branch(Vec<(String, Node)>),
}

impl Node {
    fn into_value(self) -> VarValue {
        match self {
            Self::Leaf(value) => VarValue::Scalar(value),
            Self::Branch(children) => {
                let is_list = !children.is_empty()
                    && children
                        .iter()
                        .enumerate()
                        .all(|(index, (key, _))| *key == index.to_string());
                if is_list {
                    VarValue::List(children.into_iter().map(|(_, c)| c.into_value()).collect())
                } else {
                    VarValue::Map(
                        children
                            .into_iter()
                            .map(|(k, c)| (k, c.into_value()))
                            .collect(),
                    )
                }
            }
        }
    }
}

fn insert(node: &mut Node, segments: &[&str], value: String) {
    let Some((head, rest)) = segments.split_first() else {
        *node = Node::Leaf(value);
        return;
    };

    if matches!(node, Node::Leaf(_)) {
        *node = Node::Branch(Vec::new());
    }

    if let Node::Branch(children) = node {
        let child = match children.iter().position(|(key, _)| key == head) {
            Some(index) => children.get_mut(index).map(|(_, c)| c),
            None => {
                children.push(((*head).to_string(), Node::Branch(Vec::new())));
                children.last_mut().map(|(_, c)| c)
            }
        };
        if let Some(child) = child {
            insert(child, rest, value);
        }
    }
}
