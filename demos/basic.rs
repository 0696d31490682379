use pathguard::create_database;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let db = create_database(
        &json!({
            "rules": {
                "users": {
                    "$uid": {
                        ".read": "auth != null",
                        ".write": "auth != null && auth.uid == $uid",
                        "name": { ".validate": "newData.isString()" }
                    }
                }
            }
        }),
        &json!({ "users": { "alice": { "name": "Alice" } } }),
        None,
        None,
    )
    .expect("failed to create database");

    // Anonymous reads are denied
    let report = db.read("users/alice").expect("invalid read");
    println!("anonymous read: {}", report.verdict());

    // Alice may edit her own profile but not Bob's
    let alice = db.as_auth(Some(json!({ "uid": "alice" })));
    for (path, value) in [
        ("users/alice/name", json!("Alice B.")),
        ("users/alice/name", json!(42)),
        ("users/bob/name", json!("Bob")),
    ] {
        let report = alice.write(path, &value).expect("invalid write");
        println!("write {value} to /{path}: {}", report.verdict());
    }
}
