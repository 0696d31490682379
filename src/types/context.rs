use std::collections::BTreeMap;
use std::sync::Arc;

use super::value::Value;
use crate::store::{DataNode, Snapshot};

/// The variables a rule sees while it is evaluated.
///
/// `root` and `data` view the current tree; `newData` views the tree as it
/// would be after a write and is absent for reads.
#[derive(Debug, Clone)]
pub struct State {
    auth: Value,
    root: Snapshot,
    data: Snapshot,
    new_data: Option<Snapshot>,
    now: u64,
    wildcards: BTreeMap<String, String>,
}

impl State {
    /// A read state positioned at `path` of `root`.
    #[must_use]
    pub fn new(auth: Value, root: &Arc<DataNode>, path: &str, now: u64) -> Self {
        Self {
            auth,
            root: Snapshot::new(Arc::clone(root), ""),
            data: Snapshot::new(Arc::clone(root), path),
            new_data: None,
            now,
            wildcards: BTreeMap::new(),
        }
    }

    /// Expose `newData` at the same path of `new_root`.
    #[must_use]
    pub fn with_new_data(mut self, new_root: &Arc<DataNode>) -> Self {
        self.new_data = Some(Snapshot::new(Arc::clone(new_root), self.data.path()));
        self
    }

    /// Bind wildcard names (including the `$`) to the keys they matched.
    #[must_use]
    pub fn with_wildcards(mut self, wildcards: BTreeMap<String, String>) -> Self {
        self.wildcards = wildcards;
        self
    }

    #[must_use]
    pub fn data(&self) -> &Snapshot {
        &self.data
    }

    #[must_use]
    pub fn new_data(&self) -> Option<&Snapshot> {
        self.new_data.as_ref()
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Resolve an identifier to its runtime value.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match name {
            "auth" => Some(self.auth.clone()),
            "root" => Some(Value::Snapshot(self.root.clone())),
            "data" => Some(Value::Snapshot(self.data.clone())),
            "newData" => self.new_data.clone().map(Value::Snapshot),
            #[allow(clippy::cast_precision_loss)]
            "now" => Some(Value::Number(self.now as f64)),
            _ => self.wildcards.get(name).cloned().map(Value::String),
        }
    }
}
