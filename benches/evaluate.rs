use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use pathguard::{DataNode, Database, Rule, Scope, State, Value, create_database};
use serde_json::{Map, Value as JsonValue, json};

/// Rules nested `depth` levels deep under alternating literal and wildcard
/// keys, with a `.validate` at every level and the grant at the bottom.
fn nested_rules(depth: usize) -> JsonValue {
    let mut node = json!({
        ".read": "auth != null && auth.uid == $w0",
        ".write": "auth != null && auth.uid == $w0",
        ".validate": "newData.hasChildren() || newData.isString()",
    });
    for level in (0..depth).rev() {
        let mut parent = Map::new();
        parent.insert(format!("$w{level}"), node);
        parent.insert(
            ".validate".to_owned(),
            json!("newData.exists() && root.child('flags/open').val() == true"),
        );
        node = JsonValue::Object(parent);
    }
    json!({ "rules": node })
}

fn nested_path(depth: usize) -> String {
    (0..depth)
        .map(|level| if level == 0 { "alice".to_owned() } else { format!("k{level}") })
        .collect::<Vec<_>>()
        .join("/")
}

fn database(depth: usize) -> Database {
    create_database(
        &nested_rules(depth),
        &json!({ "flags": { "open": true } }),
        Some(json!({ "uid": "alice" })),
        Some(0),
    )
    .unwrap()
}

fn bench_rule(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_rule");
    let rule = Rule::new(
        "auth != null && data.child('owner').val() == auth.uid && data.child('title').val().length < 100",
        &Scope::read(&[] as &[&str]),
    )
    .unwrap();
    let root: Arc<DataNode> =
        DataNode::from_json(&json!({ "post": { "owner": "alice", "title": "hello" } }), None, 0).unwrap();
    let state = State::new(Value::from_json(&json!({ "uid": "alice" })), &root, "post", 0);

    group.bench_function("evaluate", |b| {
        b.iter(|| rule.evaluate(black_box(&state)));
    });
    group.bench_function("debug_evaluate", |b| {
        b.iter(|| rule.debug_evaluate(black_box(&state)));
    });
    group.finish();
}

fn bench_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("operations");

    for &depth in &[2, 8, 16] {
        let db = database(depth);
        let path = nested_path(depth);
        group.bench_function(format!("read_depth_{depth}"), |b| {
            b.iter(|| db.read(black_box(&path)).unwrap());
        });

        let value = json!({ "a": "x", "b": { "c": "y", "d": "z" } });
        group.bench_function(format!("write_depth_{depth}"), |b| {
            b.iter(|| db.write(black_box(&path), black_box(&value)).unwrap());
        });
    }

    group.finish();
}

fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation");

    for &depth in &[2, 8, 16] {
        let rules = nested_rules(depth);
        group.bench_function(format!("depth_{depth}"), |b| {
            b.iter(|| black_box(pathguard::Ruleset::from_json(&rules).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_rule, bench_operations, bench_compilation);
criterion_main!(benches);
