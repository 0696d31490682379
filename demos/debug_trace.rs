use pathguard::{Database, Ruleset, store::DataNode};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("pathguard=debug".parse().expect("valid directive")),
        )
        .init();

    let ruleset = Ruleset::from_file("demos/chat.rules.json").expect("failed to load rules");
    let data = DataNode::from_json(
        &json!({
            "members": { "general": { "alice": true } },
            "rooms": { "general": { "messages": {} } }
        }),
        None,
        0,
    )
    .expect("invalid data");

    let db = Database::builder()
        .rules(ruleset)
        .data(data)
        .auth(json!({ "uid": "alice" }))
        .timestamp(1_000)
        .debug(true)
        .build()
        .expect("database not configured");

    let message = json!({ "from": "alice", "text": "hello", "sentAt": 2_000 });
    let report = db
        .write("rooms/general/messages/m1", &message)
        .expect("invalid write");
    println!("{report}\n");

    let report = db
        .as_auth(Some(json!({ "uid": "mallory" })))
        .read("rooms/general")
        .expect("invalid read");
    println!("{report}");
}
