use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use serde_json::{Map, Value as JsonValue, json};

use super::DataError;
use crate::paths;

static NULL_NODE: LazyLock<Arc<DataNode>> = LazyLock::new(|| {
    Arc::new(DataNode {
        value: NodeValue::Null,
        priority: None,
    })
});

/// Ordering priority attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Priority {
    String(String),
    Number(f64),
}

impl Priority {
    /// Convert a JSON priority. `null` means "no priority".
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidPriority`] for booleans, objects and arrays.
    pub fn from_json(value: &JsonValue) -> Result<Option<Self>, DataError> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::String(s) => Ok(Some(Priority::String(s.clone()))),
            JsonValue::Number(n) => n
                .as_f64()
                .map(|n| Some(Priority::Number(n)))
                .ok_or_else(|| DataError::InvalidPriority {
                    found: value.to_string(),
                }),
            other => Err(DataError::InvalidPriority {
                found: other.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Priority::String(s) => JsonValue::String(s.clone()),
            Priority::Number(n) => number_to_json(*n),
        }
    }
}

impl From<&str> for Priority {
    fn from(v: &str) -> Self {
        Priority::String(v.to_owned())
    }
}

impl From<f64> for Priority {
    fn from(v: f64) -> Self {
        Priority::Number(v)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Returned by a [`DataNode::walk`] visitor to control descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Descend into the node just visited.
    Continue,
    /// Skip the node's descendants; its siblings are still visited.
    SkipBranch,
}

/// An immutable node of the data tree.
///
/// A node is either a primitive (or null) or a branch with at least one
/// non-null child. Null children are never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DataNode {
    value: NodeValue,
    priority: Option<Priority>,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Children(BTreeMap<String, Arc<DataNode>>),
}

impl DataNode {
    /// The shared null node.
    #[must_use]
    pub fn null() -> Arc<DataNode> {
        Arc::clone(&NULL_NODE)
    }

    /// Build a tree from plain JSON or the export format.
    ///
    /// `{".sv": "timestamp"}` markers resolve to `now`. Objects whose
    /// children are all null collapse to the null node.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] for invalid keys, priorities, `.value` payloads
    /// or server values.
    pub fn from_json(
        value: &JsonValue,
        priority: Option<Priority>,
        now: u64,
    ) -> Result<Arc<DataNode>, DataError> {
        match value {
            JsonValue::Null => Ok(Self::null()),
            JsonValue::Bool(b) => Ok(Self::leaf(NodeValue::Bool(*b), priority)),
            JsonValue::Number(n) => {
                let n = n.as_f64().ok_or_else(|| DataError::InvalidValue {
                    found: value.to_string(),
                })?;
                Ok(Self::leaf(NodeValue::Number(n), priority))
            }
            JsonValue::String(s) => Ok(Self::leaf(NodeValue::String(s.clone()), priority)),
            JsonValue::Array(items) => {
                let mut children = BTreeMap::new();
                for (i, item) in items.iter().enumerate() {
                    let node = Self::from_json(item, None, now)?;
                    if !node.is_null() {
                        children.insert(i.to_string(), node);
                    }
                }
                Ok(Self::branch(children, priority))
            }
            JsonValue::Object(map) => Self::from_object(map, priority, now),
        }
    }

    /// Parse JSON text and build a tree from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error`](crate::Error) on malformed JSON or invalid data.
    pub fn from_source(source: &str, now: u64) -> Result<Arc<DataNode>, crate::Error> {
        let json: JsonValue = serde_json::from_str(source)?;
        Ok(Self::from_json(&json, None, now)?)
    }

    fn from_object(
        map: &Map<String, JsonValue>,
        priority: Option<Priority>,
        now: u64,
    ) -> Result<Arc<DataNode>, DataError> {
        let priority = match map.get(".priority") {
            Some(p) => Priority::from_json(p)?,
            None => priority,
        };

        if let Some(kind) = map.get(".sv") {
            return match kind.as_str() {
                Some("timestamp") => {
                    #[allow(clippy::cast_precision_loss)]
                    let now = now as f64;
                    Ok(Self::leaf(NodeValue::Number(now), priority))
                }
                _ => Err(DataError::UnknownServerValue {
                    kind: kind.to_string(),
                }),
            };
        }

        if let Some(value) = map.get(".value") {
            if map.keys().any(|key| key != ".value" && key != ".priority") {
                return Err(DataError::InvalidValue {
                    found: JsonValue::Object(map.clone()).to_string(),
                });
            }
            if value.is_object() || value.is_array() {
                return Err(DataError::InvalidValue {
                    found: value.to_string(),
                });
            }
            return Self::from_json(value, priority, now);
        }

        let mut children = BTreeMap::new();
        for (key, child) in map {
            if key == ".priority" {
                continue;
            }
            if !paths::is_valid_key(key) {
                return Err(DataError::InvalidKey { key: key.clone() });
            }
            let node = Self::from_json(child, None, now)?;
            if !node.is_null() {
                children.insert(key.clone(), node);
            }
        }
        Ok(Self::branch(children, priority))
    }

    fn leaf(value: NodeValue, priority: Option<Priority>) -> Arc<DataNode> {
        Arc::new(DataNode { value, priority })
    }

    fn branch(
        children: BTreeMap<String, Arc<DataNode>>,
        priority: Option<Priority>,
    ) -> Arc<DataNode> {
        if children.is_empty() {
            return Self::null();
        }
        Arc::new(DataNode {
            value: NodeValue::Children(children),
            priority,
        })
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.value, NodeValue::Null)
    }

    /// True for null and scalar nodes.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        !matches!(self.value, NodeValue::Children(_))
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        matches!(self.value, NodeValue::Children(_))
    }

    #[must_use]
    pub fn priority(&self) -> Option<&Priority> {
        self.priority.as_ref()
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            NodeValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            NodeValue::Number(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            NodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Direct child by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<DataNode>> {
        match &self.value {
            NodeValue::Children(children) => children.get(key),
            _ => None,
        }
    }

    /// Direct children in key order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Arc<DataNode>)> {
        let map = match &self.value {
            NodeValue::Children(children) => Some(children),
            _ => None,
        };
        map.into_iter()
            .flat_map(|children| children.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// The plain value: a scalar, null, or a nested object.
    #[must_use]
    pub fn value(&self) -> JsonValue {
        match &self.value {
            NodeValue::Null => JsonValue::Null,
            NodeValue::Bool(b) => JsonValue::Bool(*b),
            NodeValue::Number(n) => number_to_json(*n),
            NodeValue::String(s) => JsonValue::String(s.clone()),
            NodeValue::Children(children) => JsonValue::Object(
                children
                    .iter()
                    .map(|(k, v)| (k.clone(), v.value()))
                    .collect(),
            ),
        }
    }

    /// The value in export format, keeping priorities.
    #[must_use]
    pub fn export(&self) -> JsonValue {
        match (&self.value, &self.priority) {
            (NodeValue::Children(children), priority) => {
                let mut map: Map<String, JsonValue> = children
                    .iter()
                    .map(|(k, v)| (k.clone(), v.export()))
                    .collect();
                if let Some(p) = priority {
                    map.insert(".priority".to_owned(), p.to_json());
                }
                JsonValue::Object(map)
            }
            (_, Some(p)) => json!({ ".value": self.value(), ".priority": p.to_json() }),
            (_, None) => self.value(),
        }
    }

    /// Look up a descendant. Missing segments resolve to the null node.
    #[must_use]
    pub fn child(self: &Arc<Self>, path: &str) -> Arc<DataNode> {
        let mut node = Arc::clone(self);
        for segment in paths::split(path) {
            let next = match node.get(segment) {
                Some(next) => Arc::clone(next),
                None => return Self::null(),
            };
            node = next;
        }
        node
    }

    /// Replace the subtree at `path` with `value`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if `value` cannot be converted.
    pub fn set(
        self: &Arc<Self>,
        path: &str,
        value: &JsonValue,
        priority: Option<Priority>,
        now: u64,
    ) -> Result<Arc<DataNode>, DataError> {
        let node = Self::from_json(value, priority, now)?;
        Ok(self.replace(path, node))
    }

    /// Replace the subtree at `path` with an already built node, pruning
    /// branches left empty.
    #[must_use]
    pub fn replace(self: &Arc<Self>, path: &str, node: Arc<DataNode>) -> Arc<DataNode> {
        Self::replace_at(self, &paths::split(path), node)
    }

    /// Remove the subtree at `path`, pruning branches left empty.
    #[must_use]
    pub fn remove(self: &Arc<Self>, path: &str) -> Arc<DataNode> {
        self.replace(path, Self::null())
    }

    fn replace_at(current: &Arc<Self>, segments: &[&str], node: Arc<DataNode>) -> Arc<DataNode> {
        let Some((head, rest)) = segments.split_first() else {
            return node;
        };
        let existing = current.get(head).cloned().unwrap_or_else(Self::null);
        if node.is_null() && existing.is_null() {
            return Arc::clone(current);
        }

        let updated = Self::replace_at(&existing, rest, node);
        if Arc::ptr_eq(&updated, &existing) {
            return Arc::clone(current);
        }

        let mut children = match &current.value {
            NodeValue::Children(children) => children.clone(),
            _ => BTreeMap::new(),
        };
        if updated.is_null() {
            children.remove(*head);
        } else {
            children.insert((*head).to_owned(), updated);
        }
        Self::branch(children, current.priority.clone())
    }

    /// Apply each patch entry with [`set`](Self::set), relative to `path`,
    /// in key order.
    ///
    /// # Errors
    ///
    /// Returns the first [`DataError`] raised by a patch value.
    pub fn merge(
        self: &Arc<Self>,
        path: &str,
        patch: &Map<String, JsonValue>,
        now: u64,
    ) -> Result<Arc<DataNode>, DataError> {
        patch.iter().try_fold(Arc::clone(self), |tree, (key, value)| {
            tree.set(&paths::join(path, key), value, None, now)
        })
    }

    /// Pre-order walk over the descendants of `path`, passing each one's
    /// absolute path to `visitor`.
    pub fn walk<F>(self: &Arc<Self>, path: &str, mut visitor: F)
    where
        F: FnMut(&str, &Arc<DataNode>) -> Walk,
    {
        let start = self.child(path);
        walk_children(&start, &paths::normalize(path), &mut visitor);
    }
}

fn walk_children<F>(node: &Arc<DataNode>, path: &str, visitor: &mut F)
where
    F: FnMut(&str, &Arc<DataNode>) -> Walk,
{
    for (key, child) in node.children() {
        let child_path = paths::join(path, key);
        if visitor(&child_path, child) == Walk::Continue {
            walk_children(child, &child_path, visitor);
        }
    }
}

/// Integral numbers come back as JSON integers so round trips compare equal.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn number_to_json(n: f64) -> JsonValue {
    const MAX_SAFE: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() < MAX_SAFE {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}
