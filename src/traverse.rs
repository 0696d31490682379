use std::collections::BTreeMap;
use std::sync::Arc;

use crate::paths;
use crate::store::{DataNode, Walk};
use crate::{EvaluationReport, Rule, RuleKind, Ruleset, RulesetNode, State, Value};

/// Everything a traversal needs besides the target path.
pub(crate) struct Env<'a> {
    pub ruleset: &'a Ruleset,
    pub root: &'a Arc<DataNode>,
    pub auth: Value,
    pub now: u64,
    pub debug: bool,
}

impl Env<'_> {
    fn state(&self, path: &str, wildcards: &BTreeMap<String, String>) -> State {
        State::new(self.auth.clone(), self.root, path, self.now).with_wildcards(wildcards.clone())
    }

    fn run(&self, report: &mut EvaluationReport, path: &str, kind: RuleKind, rule: &Rule, state: &State) {
        let (result, detail) = if self.debug {
            let traced = rule.debug_evaluate(state);
            (traced.result, traced.annotations)
        } else {
            (rule.evaluate(state), Vec::new())
        };
        tracing::trace!(path, kind = %kind, rule = rule.source(), ?result, "evaluated rule");
        report.add(path, kind, rule, result, detail);
    }
}

/// Walk down to `path`, evaluating `.read` at every node until one grants
/// access.
pub(crate) fn try_read(env: &Env<'_>, path: &str, report: &mut EvaluationReport) {
    let segments = paths::split(path);
    let mut wildcards = BTreeMap::new();
    let mut node = Some(env.ruleset.root());
    let mut current = String::new();

    for depth in 0..=segments.len() {
        let Some(rules) = node else { break };
        match rules.rule(RuleKind::Read) {
            Some(rule) => {
                let state = env.state(&current, &wildcards);
                env.run(report, &current, RuleKind::Read, rule, &state);
            }
            None => report.missing(&current, RuleKind::Read),
        }
        if report.permitted() {
            break;
        }
        let Some(segment) = segments.get(depth) else { break };
        node = rules.child(segment, &mut wildcards);
        current = paths::join(&current, segment);
    }
}

/// Walk down to `path` evaluating `.write` until one grants access and
/// `.validate` wherever the new data exists, then validate every descendant
/// of the written value.
pub(crate) fn try_write(
    env: &Env<'_>,
    path: &str,
    new_root: &Arc<DataNode>,
    report: &mut EvaluationReport,
) {
    let segments = paths::split(path);
    let mut wildcards = BTreeMap::new();
    let mut node = Some(env.ruleset.root());
    let mut current = String::new();
    let mut reached = None;

    for depth in 0..=segments.len() {
        let Some(rules) = node else { break };
        let has_new_data = !new_root.child(&current).is_null();
        if report.permitted() && !has_new_data {
            break;
        }

        let state = env.state(&current, &wildcards).with_new_data(new_root);
        if !report.permitted() {
            match rules.rule(RuleKind::Write) {
                Some(rule) => env.run(report, &current, RuleKind::Write, rule, &state),
                None => report.missing(&current, RuleKind::Write),
            }
        }
        if has_new_data && let Some(rule) = rules.rule(RuleKind::Validate) {
            env.run(report, &current, RuleKind::Validate, rule, &state);
        }

        let Some(segment) = segments.get(depth) else {
            reached = Some(rules);
            break;
        };
        node = rules.child(segment, &mut wildcards);
        current = paths::join(&current, segment);
    }

    if let Some(target) = reached
        && !new_root.child(path).is_null()
    {
        validate_descendants(env, target, path, &wildcards, new_root, report);
    }
}

fn validate_descendants(
    env: &Env<'_>,
    target: &RulesetNode,
    path: &str,
    wildcards: &BTreeMap<String, String>,
    new_root: &Arc<DataNode>,
    report: &mut EvaluationReport,
) {
    let base = paths::split(path).len();
    new_root.walk(path, |child_path, _| {
        let segments = paths::split(child_path);
        let mut bound = wildcards.clone();
        let Some(rules) = target.descend(&segments[base..], &mut bound) else {
            return Walk::SkipBranch;
        };
        if let Some(rule) = rules.rule(RuleKind::Validate) {
            let state = env.state(child_path, &bound).with_new_data(new_root);
            env.run(report, child_path, RuleKind::Validate, rule, &state);
        }
        Walk::Continue
    });
}

/// Check each patch entry as its own write against the merged tree. The
/// update is allowed only if every part is.
pub(crate) fn try_patch<'k>(
    env: &Env<'_>,
    path: &str,
    keys: impl IntoIterator<Item = &'k str>,
    new_root: &Arc<DataNode>,
    auth: Option<&serde_json::Value>,
) -> EvaluationReport {
    let parts = keys
        .into_iter()
        .map(|key| {
            let target = paths::join(path, key);
            let mut part = EvaluationReport::new(crate::Operation::Write, &target, auth.cloned());
            try_write(env, &target, new_root, &mut part);
            part
        })
        .collect();
    EvaluationReport::combine(path, auth.cloned(), parts)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value as JsonValue, json};

    use super::*;
    use crate::{Operation, RuleOutcome};

    fn ruleset(rules: JsonValue) -> Ruleset {
        Ruleset::from_json(&json!({ "rules": rules })).unwrap()
    }

    fn tree(value: JsonValue) -> Arc<DataNode> {
        DataNode::from_json(&value, None, 0).unwrap()
    }

    fn env<'a>(ruleset: &'a Ruleset, root: &'a Arc<DataNode>, auth: JsonValue) -> Env<'a> {
        Env {
            ruleset,
            root,
            auth: Value::from_json(&auth),
            now: 0,
            debug: false,
        }
    }

    fn read(rules: &Ruleset, root: &Arc<DataNode>, path: &str) -> EvaluationReport {
        let mut report = EvaluationReport::new(Operation::Read, path, None);
        try_read(&env(rules, root, JsonValue::Null), path, &mut report);
        report
    }

    fn write(rules: &Ruleset, root: &Arc<DataNode>, path: &str, value: JsonValue) -> EvaluationReport {
        let new_root = root.set(path, &value, None, 0).unwrap();
        let mut report = EvaluationReport::new(Operation::Write, path, None);
        try_write(&env(rules, root, JsonValue::Null), path, &new_root, &mut report);
        report
    }

    fn logged(report: &EvaluationReport) -> Vec<(String, RuleKind)> {
        report
            .logs()
            .iter()
            .filter(|log| log.outcome != RuleOutcome::Missing)
            .map(|log| (log.path.clone(), log.kind))
            .collect()
    }

    #[test]
    fn read_stops_at_first_grant() {
        let rules = ruleset(json!({ ".read": false, "a": { ".read": true, "b": {} } }));
        let report = read(&rules, &tree(json!(null)), "a/b");
        assert!(report.allowed());
        assert_eq!(
            logged(&report),
            vec![("".to_owned(), RuleKind::Read), ("a".to_owned(), RuleKind::Read)]
        );
        assert_eq!(report.logs().len(), 2);
    }

    #[test]
    fn read_logs_nodes_without_rules() {
        let rules = ruleset(json!({ "a": { "b": { ".read": false } } }));
        let report = read(&rules, &tree(json!(null)), "a/b/c");
        assert!(!report.allowed());
        let outcomes: Vec<_> = report.logs().iter().map(|l| (l.path.as_str(), &l.outcome)).collect();
        assert_eq!(
            outcomes,
            vec![
                ("", &RuleOutcome::Missing),
                ("a", &RuleOutcome::Missing),
                ("a/b", &RuleOutcome::Value(false)),
            ]
        );
    }

    #[test]
    fn read_binds_wildcards() {
        let rules = ruleset(json!({ "foo": { "$x": { "bar": { "$y": { ".read": "$x == $y" } } } } }));
        let root = tree(json!(null));
        assert!(!read(&rules, &root, "foo/one/bar/two").allowed());
        assert!(read(&rules, &root, "foo/one/bar/one").allowed());
    }

    #[test]
    fn read_errors_deny_without_aborting() {
        let rules = ruleset(json!({ ".read": "auth.uid == 'x'", "a": { ".read": true } }));
        let report = read(&rules, &tree(json!(null)), "a");
        assert!(report.allowed());
        assert!(matches!(report.logs()[0].outcome, RuleOutcome::Error(_)));
    }

    #[test]
    fn validation_is_not_short_circuited() {
        let rules = ruleset(json!({
            ".write": true,
            ".validate": true,
            "a": { ".validate": false, "b": { ".validate": true } }
        }));
        let report = write(&rules, &tree(json!(null)), "a", json!({ "b": 1 }));
        assert!(report.permitted());
        assert!(!report.allowed());
        let validated: Vec<_> = logged(&report)
            .into_iter()
            .filter(|(_, kind)| *kind == RuleKind::Validate)
            .map(|(path, _)| path)
            .collect();
        assert_eq!(validated, vec!["", "a", "a/b"]);
    }

    #[test]
    fn write_stops_when_permitted_and_data_removed() {
        let rules = ruleset(json!({
            ".write": true,
            "a": { ".validate": false, "b": { ".validate": false } }
        }));
        let root = tree(json!({ "a": { "b": 1 } }));
        let report = write(&rules, &root, "a/b", JsonValue::Null);
        assert!(report.allowed());
        assert_eq!(logged(&report), vec![("".to_owned(), RuleKind::Write)]);
    }

    #[test]
    fn write_descendants_skip_branches_without_rules() {
        let rules = ruleset(json!({
            "a": {
                ".write": true,
                "$k": { ".validate": "newData.isNumber()" },
                "fixed": { "deep": { ".validate": false } }
            }
        }));
        let root = tree(json!(null));
        let report = write(&rules, &root, "a", json!({ "fixed": { "deep": 1 }, "x": 1, "y": "s" }));
        assert!(report.permitted());
        assert!(!report.validated());
        let validated: Vec<_> = report
            .logs()
            .iter()
            .filter(|l| l.kind == RuleKind::Validate)
            .map(|l| (l.path.as_str(), l.outcome.clone()))
            .collect();
        assert_eq!(
            validated,
            vec![
                ("a/fixed/deep", RuleOutcome::Value(false)),
                ("a/x", RuleOutcome::Value(true)),
                ("a/y", RuleOutcome::Value(false)),
            ]
        );
    }

    #[test]
    fn write_sees_old_and_new_data() {
        let rules = ruleset(json!({
            "count": { ".write": "newData.val() == data.val() + 1" }
        }));
        let root = tree(json!({ "count": 1 }));
        assert!(write(&rules, &root, "count", json!(2)).allowed());
        assert!(!write(&rules, &root, "count", json!(3)).allowed());
    }

    #[test]
    fn patch_requires_every_part() {
        let rules = ruleset(json!({
            "a": { ".write": true },
            "b": { ".write": false }
        }));
        let root = tree(json!(null));
        let patch = json!({ "a": 1, "b": 2 });
        let new_root = root.merge("", patch.as_object().unwrap(), 0).unwrap();
        let e = env(&rules, &root, JsonValue::Null);
        let report = try_patch(&e, "", ["a", "b"], &new_root, None);
        assert_eq!(report.operation(), Operation::Patch);
        assert!(!report.allowed());
        assert_eq!(
            logged(&report),
            vec![
                ("a".to_owned(), RuleKind::Write),
                ("b".to_owned(), RuleKind::Write),
            ]
        );

        let report = try_patch(&e, "", ["a"], &new_root, None);
        assert!(report.allowed());
    }
}
