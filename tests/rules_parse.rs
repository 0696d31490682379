use pathguard::parse::{Literal, SyntaxKind, parse, strip_comments};
use pathguard::{Error, ExprError, Rule, RuleKind, Ruleset, Scope, Type};

fn read_scope() -> Scope {
    Scope::read(&[] as &[&str])
}

#[test]
fn parse_respects_precedence() {
    let syntax = parse("a || b && c == 1 + 2 * 3").unwrap();
    let SyntaxKind::Logical { .. } = syntax.kind else {
        panic!("expected || at the root, got {:?}", syntax.kind);
    };
    assert_eq!(syntax.span, 0..24);
}

#[test]
fn parse_literals() {
    assert!(matches!(
        parse("'single'").unwrap().kind,
        SyntaxKind::Literal(Literal::String(s)) if s == "single"
    ));
    assert!(matches!(
        parse("\"double\"").unwrap().kind,
        SyntaxKind::Literal(Literal::String(s)) if s == "double"
    ));
    assert!(matches!(
        parse("1.5e3").unwrap().kind,
        SyntaxKind::Literal(Literal::Number(n)) if n == 1500.0
    ));
    assert!(matches!(parse("null").unwrap().kind, SyntaxKind::Literal(Literal::Null)));
}

#[test]
fn parse_error_has_offset() {
    let err = parse("auth.uid == ").unwrap_err();
    assert_eq!(err.source_text(), "auth.uid == ");
    assert!(err.offset() >= 11, "offset {}", err.offset());
    assert!(err.to_string().contains("offset"), "{err}");

    assert!(parse("a b").is_err());
    assert!(parse("(a").is_err());
    assert!(parse("").is_err());
}

#[test]
fn rule_types_are_checked() {
    let rule = Rule::new("auth != null && data.child('x').val() == 1", &read_scope()).unwrap();
    assert_eq!(rule.expr().ty, Type::Boolean);
    assert_eq!(rule.to_string(), "auth != null && data.child('x').val() == 1");

    for source in [
        "auth.uid && auth.isAdmin",
        "data.val()",
        "1 + 'a' == 2",
        "data.exists(1)",
        "data.child(1).exists()",
        "'abc'.contains(1)",
        "data.foo()",
        "newData.exists()",
        "!1",
        "/a/ == /a/",
        "true ? 1 : 'a'",
    ] {
        let err = Rule::new(source, &read_scope()).unwrap_err();
        assert!(matches!(err, ExprError::Type { .. }), "{source}: {err}");
    }
}

#[test]
fn type_errors_point_at_fragment() {
    let err = Rule::new("data.exists() && data.child(true).exists()", &read_scope()).unwrap_err();
    let ExprError::Type { fragment, start, end, .. } = err else {
        panic!("expected type error");
    };
    assert_eq!(fragment, "true");
    assert_eq!((start, end), (28, 32));
}

#[test]
fn comments_are_stripped_outside_strings() {
    let stripped = strip_comments("{ // note\n \"a\": \"// kept\" /* gone */ }").unwrap();
    let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
    assert_eq!(value, serde_json::json!({ "a": "// kept" }));
    assert!(strip_comments("{ /* open").is_err());
}

#[test]
fn ruleset_from_file() {
    let ruleset = Ruleset::from_file("demos/chat.rules.json").unwrap();
    let (nodes, rules) = ruleset.size();
    assert!(nodes > 10, "{nodes}");
    assert_eq!(rules, 14);

    let mut wildcards = std::collections::BTreeMap::new();
    let msg = ruleset
        .root()
        .descend(&["rooms", "general", "messages", "m1"], &mut wildcards)
        .unwrap();
    assert!(msg.rule(RuleKind::Write).is_some());
    assert_eq!(wildcards.get("$room").map(String::as_str), Some("general"));
    assert_eq!(wildcards.get("$msg").map(String::as_str), Some("m1"));
}

#[test]
fn ruleset_file_errors() {
    assert!(matches!(Ruleset::from_file("demos/missing.json"), Err(Error::Io(_))));
    assert!(matches!(Ruleset::from_source("{ \"rules\": "), Err(Error::Json(_))));
    assert!(matches!(
        Ruleset::from_source("{ \"rules\": { \".read\": \"1 +\" } }"),
        Err(Error::Rule(_))
    ));
}
