use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value as JsonValue;

use crate::query::Query;
use crate::store::{DataNode, Priority, Snapshot};
use crate::traverse::{self, Env};
use crate::{Error, EvaluationReport, Operation, Ruleset, UsageError, Value, paths};

/// Create a database from a rule definition and initial data.
///
/// # Example
///
/// ```
/// use pathguard::create_database;
/// use serde_json::json;
///
/// let db = create_database(
///     &json!({ "rules": { "users": { "$uid": { ".read": "auth.uid == $uid" } } } }),
///     &json!({ "users": { "alice": { "name": "Alice" } } }),
///     None,
///     Some(0),
/// )
/// .unwrap();
///
/// assert!(!db.read("users/alice").unwrap().allowed());
/// let alice = db.as_auth(Some(json!({ "uid": "alice" })));
/// assert!(alice.read("users/alice").unwrap().allowed());
/// ```
///
/// # Errors
///
/// Returns [`Error::Rule`] if the rule definition is invalid and
/// [`Error::Data`] if the data cannot be stored.
pub fn create_database(
    rules: &JsonValue,
    data: &JsonValue,
    auth: Option<JsonValue>,
    now: Option<u64>,
) -> Result<Database, Error> {
    let ruleset = Ruleset::from_json(rules)?;
    let root = DataNode::from_json(data, None, now.unwrap_or_else(wall_clock))?;
    let mut builder = Database::builder().rules(ruleset).data(root);
    if let Some(auth) = auth {
        builder = builder.auth(auth);
    }
    if let Some(now) = now {
        builder = builder.timestamp(now);
    }
    Ok(builder.build()?)
}

fn wall_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Builder for a [`Database`]. Rules and data are required.
#[derive(Debug, Default)]
#[must_use]
pub struct DatabaseBuilder {
    rules: Option<Arc<Ruleset>>,
    data: Option<Arc<DataNode>>,
    auth: Option<JsonValue>,
    timestamp: Option<u64>,
    debug: bool,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(mut self, rules: impl Into<Arc<Ruleset>>) -> Self {
        self.rules = Some(rules.into());
        self
    }

    pub fn data(mut self, root: Arc<DataNode>) -> Self {
        self.data = Some(root);
        self
    }

    /// Authentication payload exposed to rules as `auth`. Omitted means
    /// unauthenticated (`auth == null`).
    pub fn auth(mut self, auth: JsonValue) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Fixed time in milliseconds used for `now` and server timestamps.
    pub fn timestamp(mut self, now: u64) -> Self {
        self.timestamp = Some(now);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// # Errors
    ///
    /// Returns [`UsageError::NotConfigured`] if rules or data were not set.
    pub fn build(self) -> Result<Database, UsageError> {
        let ruleset = self.rules.ok_or(UsageError::NotConfigured { missing: "rules" })?;
        let root = self.data.ok_or(UsageError::NotConfigured { missing: "data" })?;
        Ok(Database {
            ruleset,
            root,
            auth: self.auth.filter(|auth| !auth.is_null()),
            timestamp: self.timestamp,
            debug: self.debug,
        })
    }
}

/// Per-call options for [`Database::read_with`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ReadOptions {
    now: Option<u64>,
    query: Option<Query>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(mut self, now: u64) -> Self {
        self.now = Some(now);
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }
}

/// Per-call options for [`Database::write_with`] and [`Database::update_with`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct WriteOptions {
    now: Option<u64>,
    priority: Option<Priority>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(mut self, now: u64) -> Self {
        self.now = Some(now);
        self
    }

    /// Priority stored on the written node. Ignored by updates.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// A ruleset paired with a data tree and an authentication context.
///
/// Every operation is a pure simulation: the database itself never changes.
/// Writes and updates return the tree they would produce on
/// [`EvaluationReport::new_root`], which [`with_root`](Self::with_root)
/// turns into the next database. Clones share the ruleset and tree, so a
/// `Database` can be handed to many threads.
#[derive(Debug, Clone)]
pub struct Database {
    ruleset: Arc<Ruleset>,
    root: Arc<DataNode>,
    auth: Option<JsonValue>,
    timestamp: Option<u64>,
    debug: bool,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// The same database seen by another user. `None` or JSON `null` means
    /// unauthenticated.
    #[must_use]
    pub fn as_auth(&self, auth: Option<JsonValue>) -> Database {
        Database {
            auth: auth.filter(|auth| !auth.is_null()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_timestamp(&self, now: u64) -> Database {
        Database {
            timestamp: Some(now),
            ..self.clone()
        }
    }

    /// Evaluate rules with annotations attached to every log entry.
    #[must_use]
    pub fn with_debug(&self, debug: bool) -> Database {
        Database {
            debug,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_root(&self, root: Arc<DataNode>) -> Database {
        Database {
            root,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    #[must_use]
    pub fn root(&self) -> &Arc<DataNode> {
        &self.root
    }

    #[must_use]
    pub fn auth(&self) -> Option<&JsonValue> {
        self.auth.as_ref()
    }

    #[must_use]
    pub fn snapshot(&self, path: &str) -> Snapshot {
        Snapshot::new(Arc::clone(&self.root), path)
    }

    /// Simulate reading `path`.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidPath`] for malformed paths. A denied read
    /// is not an error; check [`EvaluationReport::allowed`].
    pub fn read(&self, path: &str) -> Result<EvaluationReport, Error> {
        self.read_with(path, ReadOptions::new())
    }

    /// Simulate reading `path` with a query and/or explicit time.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError`] for malformed paths and invalid queries.
    pub fn read_with(&self, path: &str, options: ReadOptions) -> Result<EvaluationReport, Error> {
        let path = checked_path(path)?;
        if let Some(query) = &options.query {
            query.validate()?;
        }

        let env = self.env(options.now);
        let mut report = EvaluationReport::new(Operation::Read, &path, self.auth.clone());
        traverse::try_read(&env, &path, &mut report);
        let report = report
            .with_query(options.query)
            .with_value(self.root.child(&path).value());
        finish(&report);
        Ok(report)
    }

    /// Simulate replacing the value at `path`. Writing `null` deletes.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidPath`] for malformed paths and
    /// [`Error::Data`] if `value` cannot be stored.
    pub fn write(&self, path: &str, value: &JsonValue) -> Result<EvaluationReport, Error> {
        self.write_with(path, value, WriteOptions::new())
    }

    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub fn write_with(
        &self,
        path: &str,
        value: &JsonValue,
        options: WriteOptions,
    ) -> Result<EvaluationReport, Error> {
        let path = checked_path(path)?;
        let env = self.env(options.now);
        let new_root = self.root.set(&path, value, options.priority, env.now)?;

        let mut report = EvaluationReport::new(Operation::Write, &path, self.auth.clone());
        traverse::try_write(&env, &path, &new_root, &mut report);
        let report = report.with_new_root(new_root).with_value(value.clone());
        finish(&report);
        Ok(report)
    }

    /// Simulate a multi-location update: each key of `patch` is a path
    /// relative to `path`, written as if by [`write`](Self::write), and the
    /// update is allowed only if every one of those writes is.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError`] if `patch` is not a non-empty object, has
    /// invalid or overlapping keys, and [`Error::Data`] if a value cannot be
    /// stored.
    pub fn update(&self, path: &str, patch: &JsonValue) -> Result<EvaluationReport, Error> {
        self.update_with(path, patch, WriteOptions::new())
    }

    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub fn update_with(
        &self,
        path: &str,
        patch: &JsonValue,
        options: WriteOptions,
    ) -> Result<EvaluationReport, Error> {
        let path = checked_path(path)?;
        let entries = patch.as_object().ok_or_else(|| UsageError::InvalidPatch {
            path: path.clone(),
            found: patch.to_string(),
        })?;
        if entries.is_empty() {
            return Err(UsageError::EmptyPatch { path }.into());
        }

        let mut keys: Vec<String> = Vec::with_capacity(entries.len());
        for key in entries.keys() {
            let normalized = checked_path(key)?;
            if let Some(other) = keys.iter().find(|other| overlaps(other, &normalized)) {
                return Err(UsageError::OverlappingPatch {
                    path,
                    first: other.clone(),
                    second: normalized,
                }
                .into());
            }
            keys.push(normalized);
        }

        let env = self.env(options.now);
        let new_root = self.root.merge(&path, entries, env.now)?;
        let report = traverse::try_patch(
            &env,
            &path,
            keys.iter().map(String::as_str),
            &new_root,
            self.auth.as_ref(),
        )
        .with_new_root(new_root)
        .with_value(patch.clone());
        finish(&report);
        Ok(report)
    }

    fn env(&self, now: Option<u64>) -> Env<'_> {
        Env {
            ruleset: &self.ruleset,
            root: &self.root,
            auth: self.auth.as_ref().map_or(Value::Null, Value::from_json),
            now: now.or(self.timestamp).unwrap_or_else(wall_clock),
            debug: self.debug,
        }
    }
}

fn checked_path(path: &str) -> Result<String, UsageError> {
    if paths::is_valid_path(path) {
        Ok(paths::normalize(path))
    } else {
        Err(UsageError::InvalidPath {
            path: path.to_owned(),
        })
    }
}

fn overlaps(a: &str, b: &str) -> bool {
    a == b || paths::is_ancestor(a, b) || paths::is_ancestor(b, a)
}

fn finish(report: &EvaluationReport) {
    tracing::debug!(
        operation = %report.operation(),
        path = report.path(),
        allowed = report.allowed(),
        "simulated operation"
    );
}
