use pathguard::{
    DataNode, Database, Error, EvalError, ExprError, RuleError, RuleKind, RuleOutcome, UsageError,
    Verdict, create_database,
};
use serde_json::{Value as JsonValue, json};

fn database(rules: JsonValue, data: JsonValue) -> Database {
    create_database(&json!({ "rules": rules }), &data, None, Some(0)).unwrap()
}

fn rule_error(rules: JsonValue) -> RuleError {
    match create_database(&json!({ "rules": rules }), &JsonValue::Null, None, Some(0)) {
        Err(Error::Rule(err)) => err,
        other => panic!("expected a rule error, got {other:?}"),
    }
}

#[test]
fn empty_ruleset_denies_everything() {
    let db = database(json!({}), json!({ "a": 1 }));
    let report = db.read("a").unwrap();
    assert_eq!(report.verdict(), Verdict::PermissionDenied);
    assert!(report.logs().iter().all(|log| log.outcome == RuleOutcome::Missing));
    assert!(report.info().contains("/: no .read rule"));

    let report = db.write("a", &json!(2)).unwrap();
    assert!(!report.allowed());
}

#[test]
fn boolean_rule_values() {
    let db = database(json!({ ".read": true, ".write": false }), JsonValue::Null);
    assert!(db.read("").unwrap().allowed());
    assert!(!db.write("x", &json!(1)).unwrap().allowed());
}

#[test]
fn evaluation_errors_are_logged_not_raised() {
    let db = database(
        json!({ ".read": "auth.uid == 'x'", "a": { ".read": "data.val().length > 2" } }),
        json!({ "a": 5 }),
    );
    let report = db.read("a").unwrap();
    assert!(!report.allowed());
    assert_eq!(
        report.logs()[0].outcome,
        RuleOutcome::Error(EvalError::NullMember { property: "uid".into() })
    );
    assert!(matches!(report.logs()[1].outcome, RuleOutcome::Error(_)));
    assert!(report.info().contains("=> error: cannot read property 'uid' of null"));
}

#[test]
fn reading_missing_data() {
    let db = database(json!({ "$any": { ".read": "!data.exists()" } }), json!({ "here": 1 }));
    assert!(db.read("nowhere").unwrap().allowed());
    assert!(!db.read("here").unwrap().allowed());
    assert_eq!(db.read("nowhere").unwrap().value(), Some(&JsonValue::Null));
}

#[test]
fn paths_are_normalized() {
    let db = database(json!({ "a": { "b": { ".read": true } } }), JsonValue::Null);
    for path in ["a/b", "/a/b", "a/b/", "//a//b//"] {
        let report = db.read(path).unwrap();
        assert!(report.allowed(), "{path}");
        assert_eq!(report.path(), "a/b");
    }
}

#[test]
fn arrays_are_stored_by_index() {
    let db = database(
        json!({ "list": { "$i": { ".read": "data.isNumber() && $i == '1'" } } }),
        json!({ "list": [10, 20, 30] }),
    );
    assert_eq!(db.snapshot("list/1").val(), json!(20));
    assert_eq!(db.snapshot("list").val(), json!({ "0": 10, "1": 20, "2": 30 }));
    assert!(db.read("list/1").unwrap().allowed());
    assert!(!db.read("list/0").unwrap().allowed());
}

#[test]
fn empty_objects_are_null() {
    let db = database(
        json!({ ".write": true, "a": { ".validate": "newData.exists()" } }),
        JsonValue::Null,
    );
    let report = db.write("a", &json!({ "b": {}, "c": [] })).unwrap();
    assert!(report.allowed());
    assert!(report.new_root().unwrap().is_null());
    assert!(report.logs().iter().all(|log| log.kind != RuleKind::Validate));
}

#[test]
fn unicode_length_counts_utf16_units() {
    let db = database(json!({ "$k": { ".read": "data.val().length == 3" } }), json!({ "s": "a😀" }));
    assert!(db.read("s").unwrap().allowed());
}

#[test]
fn regex_matching_with_flags() {
    let db = database(
        json!({ "$k": { ".read": "data.isString() && data.val().matches(/^ab+c$/i) == true" } }),
        json!({ "yes": "ABBC", "no": "abd" }),
    );
    assert!(db.read("yes").unwrap().allowed());
    assert!(!db.read("no").unwrap().allowed());
}

#[test]
fn division_by_zero_is_not_an_error() {
    let db = database(json!({ ".read": "1 / 0 > 1000000" }), JsonValue::Null);
    assert!(db.read("").unwrap().allowed());
}

#[test]
fn priority_is_visible_to_rules() {
    let db = database(
        json!({ "$k": { ".read": "data.getPriority() == 5" } }),
        json!({ "p": { ".value": "x", ".priority": 5 }, "q": "y" }),
    );
    assert!(db.read("p").unwrap().allowed());
    assert!(!db.read("q").unwrap().allowed());
}

#[test]
fn definition_errors() {
    assert!(matches!(
        rule_error(json!({ ".read": "auth.uid &&" })),
        RuleError::Expression { source: ExprError::Parse(_), .. }
    ));
    assert!(matches!(
        rule_error(json!({ ".read": "data.hasChildren([])" })),
        RuleError::Expression { source: ExprError::Type { .. }, .. }
    ));
    assert!(matches!(
        rule_error(json!({ ".read": "unknownName == 1" })),
        RuleError::Expression { source: ExprError::Type { .. }, .. }
    ));
    assert!(matches!(
        rule_error(json!({ ".read": "data.val()" })),
        RuleError::Expression { .. }
    ));
    assert!(matches!(
        rule_error(json!({ "$a": {}, "$b": {} })),
        RuleError::MultipleWildcards { .. }
    ));
    assert!(matches!(
        rule_error(json!({ ".read": ["true"] })),
        RuleError::InvalidRuleType { .. }
    ));
}

#[test]
fn invalid_data_is_rejected() {
    let err = create_database(&json!({ "rules": {} }), &json!({ "a.b": 1 }), None, Some(0)).unwrap_err();
    assert!(matches!(err, Error::Data(_)));

    let db = database(json!({ ".write": true }), JsonValue::Null);
    assert!(matches!(db.write("a", &json!({ "x#": 1 })), Err(Error::Data(_))));
    assert!(matches!(
        db.write("a", &json!({ ".sv": "increment" })),
        Err(Error::Data(_))
    ));
}

#[test]
fn usage_errors() {
    let db = database(json!({}), JsonValue::Null);
    assert!(matches!(
        db.read("a/.b"),
        Err(Error::Usage(UsageError::InvalidPath { .. }))
    ));
    assert!(matches!(
        db.update("a", &json!({})),
        Err(Error::Usage(UsageError::EmptyPatch { .. }))
    ));
    assert!(matches!(
        pathguard::Database::builder().data(DataNode::null()).build(),
        Err(UsageError::NotConfigured { missing: "rules" })
    ));
}

#[test]
fn write_at_root_validates_every_touched_node() {
    let db = database(
        json!({
            ".write": true,
            "$k": { ".validate": "newData.isNumber()" }
        }),
        JsonValue::Null,
    );
    let report = db.write("", &json!({ "a": 1, "b": "two", "c": 3 })).unwrap();
    assert_eq!(report.verdict(), Verdict::ValidationFailed);
    let failing: Vec<_> = report
        .logs()
        .iter()
        .filter(|log| log.outcome == RuleOutcome::Value(false))
        .map(|log| log.path.as_str())
        .collect();
    assert_eq!(failing, vec!["b"]);
}
