use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{DataNode, Priority};
use crate::paths;

/// A read-only view of the data tree at a path.
///
/// A snapshot owns no data: it pairs a shared root with a normalized path and
/// resolves every read against that root.
#[derive(Debug, Clone)]
pub struct Snapshot {
    root: Arc<DataNode>,
    path: String,
}

impl Snapshot {
    #[must_use]
    pub fn new(root: Arc<DataNode>, path: &str) -> Self {
        Self {
            root,
            path: paths::normalize(path),
        }
    }

    /// The normalized path, empty for the root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The last path segment, or `None` at the root.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        paths::basename(&self.path)
    }

    #[must_use]
    pub fn root(&self) -> &Arc<DataNode> {
        &self.root
    }

    /// The node this snapshot points at.
    #[must_use]
    pub fn node(&self) -> Arc<DataNode> {
        self.root.child(&self.path)
    }

    #[must_use]
    pub fn val(&self) -> JsonValue {
        self.node().value()
    }

    #[must_use]
    pub fn child(&self, path: &str) -> Snapshot {
        Snapshot {
            root: Arc::clone(&self.root),
            path: paths::join(&self.path, path),
        }
    }

    /// The parent snapshot, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Snapshot> {
        paths::parent(&self.path).map(|path| Snapshot {
            root: Arc::clone(&self.root),
            path,
        })
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        !self.node().is_null()
    }

    #[must_use]
    pub fn has_child(&self, path: &str) -> bool {
        !self.node().child(path).is_null()
    }

    /// With no names, whether the node has any children; otherwise whether
    /// it has every named child.
    #[must_use]
    pub fn has_children<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let node = self.node();
        if names.is_empty() {
            return node.has_children();
        }
        names.iter().all(|name| !node.child(name.as_ref()).is_null())
    }

    #[must_use]
    pub fn is_number(&self) -> bool {
        self.node().as_f64().is_some()
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        self.node().as_str().is_some()
    }

    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.node().as_bool().is_some()
    }

    #[must_use]
    pub fn get_priority(&self) -> Option<Priority> {
        self.node().priority().cloned()
    }

    /// Whether both snapshots view the same root at the same path.
    #[must_use]
    pub fn same_view(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.root, &other.root) && self.path == other.path
    }
}
