use std::fmt::{self, Write as _};
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use super::error::EvalError;
use super::rule::{Rule, RuleKind};
use super::verdict::Verdict;
use crate::query::Query;
use crate::store::DataNode;

/// The kind of simulated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
    /// A multi-path update.
    Patch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Write => write!(f, "write"),
            Operation::Patch => write!(f, "patch"),
        }
    }
}

/// What happened to one rule visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOutcome {
    Value(bool),
    Error(#[serde(serialize_with = "serialize_display")] EvalError),
    /// The node was visited but carries no rule of this kind.
    Missing,
}

impl RuleOutcome {
    /// Errors count as `false`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, RuleOutcome::Value(true))
    }
}

/// One entry of an [`EvaluationReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleLog {
    pub path: String,
    pub kind: RuleKind,
    pub source: Option<String>,
    pub outcome: RuleOutcome,
    /// Debug annotations, empty unless the database runs in debug mode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detail: Vec<String>,
}

fn serialize_display<S: Serializer>(error: &EvalError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Outcome of a simulated read, write or update.
///
/// `read`/`write` outcomes are OR-ed into [`permitted`](Self::permitted) and
/// `validate` outcomes are AND-ed into [`validated`](Self::validated); the
/// operation is allowed when both hold.
#[derive(Debug, Clone)]
#[must_use]
pub struct EvaluationReport {
    operation: Operation,
    path: String,
    auth: Option<JsonValue>,
    permitted: bool,
    validated: bool,
    logs: Vec<RuleLog>,
    new_root: Option<Arc<DataNode>>,
    query: Option<Query>,
    value: Option<JsonValue>,
}

impl EvaluationReport {
    pub(crate) fn new(operation: Operation, path: &str, auth: Option<JsonValue>) -> Self {
        Self {
            operation,
            path: path.to_owned(),
            auth,
            permitted: false,
            validated: true,
            logs: Vec::new(),
            new_root: None,
            query: None,
            value: None,
        }
    }

    /// Merge the reports of the writes making up an update: the update is
    /// permitted and validated only if every part is.
    pub(crate) fn combine(
        path: &str,
        auth: Option<JsonValue>,
        parts: Vec<EvaluationReport>,
    ) -> Self {
        let mut report = Self::new(Operation::Patch, path, auth);
        report.permitted = !parts.is_empty();
        for part in parts {
            report.permitted &= part.permitted;
            report.validated &= part.validated;
            report.logs.extend(part.logs);
        }
        report
    }

    pub(crate) fn with_new_root(mut self, new_root: Arc<DataNode>) -> Self {
        self.new_root = Some(new_root);
        self
    }

    pub(crate) fn with_query(mut self, query: Option<Query>) -> Self {
        self.query = query;
        self
    }

    pub(crate) fn with_value(mut self, value: JsonValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Record a rule evaluation.
    pub(crate) fn add(
        &mut self,
        path: &str,
        kind: RuleKind,
        rule: &Rule,
        result: Result<bool, EvalError>,
        detail: Vec<String>,
    ) {
        let outcome = match result {
            Ok(value) => RuleOutcome::Value(value),
            Err(e) => RuleOutcome::Error(e),
        };
        match kind {
            RuleKind::Read | RuleKind::Write => self.permitted |= outcome.is_true(),
            RuleKind::Validate => self.validated &= outcome.is_true(),
        }
        self.logs.push(RuleLog {
            path: path.to_owned(),
            kind,
            source: Some(rule.source().to_owned()),
            outcome,
            detail,
        });
    }

    /// Record a visited node without a rule of `kind`.
    pub(crate) fn missing(&mut self, path: &str, kind: RuleKind) {
        self.logs.push(RuleLog {
            path: path.to_owned(),
            kind,
            source: None,
            outcome: RuleOutcome::Missing,
            detail: Vec::new(),
        });
    }

    #[must_use]
    pub fn allowed(&self) -> bool {
        self.permitted && self.validated
    }

    #[must_use]
    pub fn permitted(&self) -> bool {
        self.permitted
    }

    #[must_use]
    pub fn validated(&self) -> bool {
        self.validated
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::new(self.permitted, self.validated)
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The normalized target path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn auth(&self) -> Option<&JsonValue> {
        self.auth.as_ref()
    }

    #[must_use]
    pub fn logs(&self) -> &[RuleLog] {
        &self.logs
    }

    /// The tree as it would be after a write or update.
    #[must_use]
    pub fn new_root(&self) -> Option<&Arc<DataNode>> {
        self.new_root.as_ref()
    }

    #[must_use]
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// The value written, or the patch applied.
    #[must_use]
    pub fn value(&self) -> Option<&JsonValue> {
        self.value.as_ref()
    }

    /// Human-readable trace of every rule visited and the final verdict.
    #[must_use]
    pub fn info(&self) -> String {
        let mut out = String::new();
        let auth = self
            .auth
            .as_ref()
            .map_or_else(|| "null".to_owned(), JsonValue::to_string);
        let _ = writeln!(
            out,
            "Attempt to {} /{} as {auth}.",
            self.operation, self.path
        );
        out.push('\n');

        if self.logs.is_empty() {
            out.push_str("No rules were evaluated.\n");
        }
        for log in &self.logs {
            match (&log.source, &log.outcome) {
                (_, RuleOutcome::Missing) | (None, _) => {
                    let _ = writeln!(out, "/{}: no {} rule", log.path, log.kind);
                }
                (Some(source), RuleOutcome::Value(value)) => {
                    let _ = writeln!(out, "/{}: {} \"{source}\" => {value}", log.path, log.kind);
                }
                (Some(source), RuleOutcome::Error(e)) => {
                    let _ = writeln!(
                        out,
                        "/{}: {} \"{source}\" => error: {e}",
                        log.path, log.kind
                    );
                }
            }
            for line in &log.detail {
                let _ = writeln!(out, "    {line}");
            }
        }

        out.push('\n');
        let _ = write!(out, "{} was {}.", capitalize(self.operation), self.verdict());
        out
    }
}

fn capitalize(operation: Operation) -> &'static str {
    match operation {
        Operation::Read => "Read",
        Operation::Write => "Write",
        Operation::Patch => "Patch",
    }
}

/// The resulting tree is left out; serialize
/// [`new_root`](EvaluationReport::new_root) separately if needed.
impl Serialize for EvaluationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut report = serializer.serialize_struct("EvaluationReport", 9)?;
        report.serialize_field("operation", &self.operation)?;
        report.serialize_field("path", &self.path)?;
        report.serialize_field("auth", &self.auth)?;
        report.serialize_field("allowed", &self.allowed())?;
        report.serialize_field("verdict", &self.verdict())?;
        report.serialize_field("permitted", &self.permitted)?;
        report.serialize_field("validated", &self.validated)?;
        report.serialize_field("logs", &self.logs)?;
        match &self.query {
            Some(query) => report.serialize_field("query", query)?,
            None => report.skip_field("query")?,
        }
        match &self.value {
            Some(value) => report.serialize_field("value", value)?,
            None => report.skip_field("value")?,
        }
        report.end()
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Scope;

    fn rule(source: &str) -> Rule {
        Rule::new(source, &Scope::write(&[] as &[&str])).unwrap()
    }

    #[test]
    fn permission_is_or_validation_is_and() {
        let mut report = EvaluationReport::new(Operation::Write, "a", None);
        assert!(!report.permitted());
        assert!(report.validated());

        report.add("", RuleKind::Write, &rule("false"), Ok(false), vec![]);
        report.add("a", RuleKind::Write, &rule("true"), Ok(true), vec![]);
        report.add("a", RuleKind::Write, &rule("false"), Ok(false), vec![]);
        assert!(report.permitted());

        report.add("a", RuleKind::Validate, &rule("false"), Ok(false), vec![]);
        report.add("a", RuleKind::Validate, &rule("true"), Ok(true), vec![]);
        assert!(!report.validated());
        assert!(!report.allowed());
        assert_eq!(report.verdict(), Verdict::ValidationFailed);
        assert_eq!(report.logs().len(), 5);
    }

    #[test]
    fn errors_count_as_false() {
        let mut report = EvaluationReport::new(Operation::Read, "", None);
        let err = EvalError::NullMember {
            property: "uid".into(),
        };
        report.add("", RuleKind::Read, &rule("true"), Err(err.clone()), vec![]);
        assert!(!report.permitted());
        assert_eq!(report.logs()[0].outcome, RuleOutcome::Error(err));
    }

    #[test]
    fn missing_entries_do_not_change_flags() {
        let mut report = EvaluationReport::new(Operation::Read, "a", None);
        report.missing("", RuleKind::Read);
        assert!(!report.permitted());
        assert!(report.validated());
        assert_eq!(report.logs()[0].source, None);
    }

    #[test]
    fn combine_requires_every_part() {
        let mut a = EvaluationReport::new(Operation::Write, "a", None);
        a.add("a", RuleKind::Write, &rule("true"), Ok(true), vec![]);
        let b = EvaluationReport::new(Operation::Write, "b", None);
        let combined = EvaluationReport::combine("", None, vec![a.clone(), b]);
        assert_eq!(combined.operation(), Operation::Patch);
        assert!(!combined.permitted());
        assert_eq!(combined.logs().len(), 1);

        let combined = EvaluationReport::combine("", None, vec![a.clone(), a]);
        assert!(combined.allowed());
    }

    #[test]
    fn info_renders_trace_and_verdict() {
        let mut report = EvaluationReport::new(Operation::Read, "a/b", Some(json!({ "uid": "bob" })));
        report.missing("", RuleKind::Read);
        report.add(
            "a",
            RuleKind::Read,
            &rule("auth.uid == 'bob'"),
            Ok(true),
            vec!["auth.uid = \"bob\"".into()],
        );
        let info = report.info();
        assert_eq!(
            info,
            "Attempt to read /a/b as {\"uid\":\"bob\"}.\n\
             \n\
             /: no .read rule\n\
             /a: .read \"auth.uid == 'bob'\" => true\n    auth.uid = \"bob\"\n\
             \n\
             Read was allowed."
        );
        assert_eq!(report.to_string(), info);
    }

    #[test]
    fn serializes_summary_with_logs() {
        let mut report = EvaluationReport::new(Operation::Write, "a", Some(json!({ "uid": "bob" })));
        report.missing("", RuleKind::Write);
        report.add("a", RuleKind::Write, &rule("true"), Ok(true), vec![]);
        let err = EvalError::NullMember {
            property: "uid".into(),
        };
        report.add("a", RuleKind::Validate, &rule("false"), Err(err.clone()), vec![]);
        let report = report.with_value(json!(1));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            json!({
                "operation": "write",
                "path": "a",
                "auth": { "uid": "bob" },
                "allowed": false,
                "verdict": "validation_failed",
                "permitted": true,
                "validated": false,
                "logs": [
                    { "path": "", "kind": "write", "source": null, "outcome": "missing" },
                    { "path": "a", "kind": "write", "source": "true", "outcome": { "value": true } },
                    {
                        "path": "a",
                        "kind": "validate",
                        "source": "false",
                        "outcome": { "error": err.to_string() }
                    }
                ],
                "value": 1
            })
        );
    }

    #[test]
    fn info_names_failed_category() {
        let report = EvaluationReport::new(Operation::Write, "x", None);
        let info = report.info();
        assert!(info.starts_with("Attempt to write /x as null."));
        assert!(info.contains("No rules were evaluated."));
        assert!(info.ends_with("Write was denied: no rule granted permission."));
    }
}
