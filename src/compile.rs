use serde_json::Value as JsonValue;

use crate::paths;
use crate::{Rule, RuleError, RuleKind, Ruleset, RulesetNode, Scope};

pub(crate) fn compile(definition: &JsonValue) -> Result<Ruleset, RuleError> {
    let top = definition.as_object().ok_or(RuleError::MissingRulesKey)?;
    if let Some(key) = top.keys().find(|key| *key != "rules") {
        return Err(RuleError::UnexpectedTopLevelKey { key: key.clone() });
    }
    let rules = top.get("rules").ok_or(RuleError::MissingRulesKey)?;

    let mut wildcards = Vec::new();
    let root = build_node("", rules, "", &mut wildcards)?;
    let ruleset = Ruleset { root };

    let (nodes, rules) = ruleset.size();
    tracing::debug!(nodes, rules, "compiled ruleset");
    Ok(ruleset)
}

fn build_node(
    name: &str,
    value: &JsonValue,
    path: &str,
    wildcards: &mut Vec<String>,
) -> Result<RulesetNode, RuleError> {
    let map = value.as_object().ok_or_else(|| RuleError::NotAnObject {
        path: path.to_owned(),
    })?;

    let mut node = RulesetNode {
        name: name.to_owned(),
        wildcard: name.starts_with('$'),
        ..RulesetNode::default()
    };

    for (key, child) in map {
        if key.starts_with('.') {
            add_rule(&mut node, key, child, path, wildcards)?;
        } else if key.starts_with('$') {
            add_wildchild(&mut node, key, child, path, wildcards)?;
        } else {
            if !paths::is_valid_key(key) {
                return Err(RuleError::InvalidKey {
                    path: path.to_owned(),
                    key: key.clone(),
                });
            }
            let child_node = build_node(key, child, &paths::join(path, key), wildcards)?;
            node.children.insert(key.clone(), child_node);
        }
    }
    Ok(node)
}

fn add_wildchild(
    node: &mut RulesetNode,
    key: &str,
    value: &JsonValue,
    path: &str,
    wildcards: &mut Vec<String>,
) -> Result<(), RuleError> {
    let child_path = paths::join(path, key);
    if let Some(existing) = &node.wildchild {
        return Err(RuleError::MultipleWildcards {
            path: path.to_owned(),
            first: existing.name.clone(),
            second: key.to_owned(),
        });
    }
    if key.len() < 2 || !paths::is_valid_key(&key[1..]) {
        return Err(RuleError::InvalidKey {
            path: path.to_owned(),
            key: key.to_owned(),
        });
    }
    if wildcards.iter().any(|w| w == key) {
        return Err(RuleError::DuplicateWildcard {
            path: child_path,
            name: key.to_owned(),
        });
    }

    wildcards.push(key.to_owned());
    let child = build_node(key, value, &child_path, wildcards);
    wildcards.pop();
    node.wildchild = Some(Box::new(child?));
    Ok(())
}

fn add_rule(
    node: &mut RulesetNode,
    key: &str,
    value: &JsonValue,
    path: &str,
    wildcards: &[String],
) -> Result<(), RuleError> {
    if key == ".indexOn" {
        node.index_on = Some(index_on(value, path)?);
        return Ok(());
    }
    let kind = RuleKind::from_key(key).ok_or_else(|| RuleError::UnknownRuleKind {
        path: path.to_owned(),
        kind: key.to_owned(),
    })?;

    let source = match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        other => {
            return Err(RuleError::InvalidRuleType {
                path: path.to_owned(),
                kind: key.to_owned(),
                found: json_type(other).to_owned(),
            });
        }
    };
    let rule = Rule::new(&source, &Scope::for_kind(kind, wildcards)).map_err(|err| {
        RuleError::Expression {
            path: path.to_owned(),
            kind: key.to_owned(),
            source: err,
        }
    })?;

    let slot = match kind {
        RuleKind::Read => &mut node.read,
        RuleKind::Write => &mut node.write,
        RuleKind::Validate => &mut node.validate,
    };
    *slot = Some(rule);
    Ok(())
}

fn index_on(value: &JsonValue, path: &str) -> Result<Vec<String>, RuleError> {
    let invalid = || RuleError::InvalidIndexOn {
        path: path.to_owned(),
        found: value.to_string(),
    };
    match value {
        JsonValue::String(s) => Ok(vec![s.clone()]),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned).ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
