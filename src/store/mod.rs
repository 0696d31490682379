//! Persistent, path-addressed tree of JSON-like values.
//!
//! Every update returns a new root. Only the nodes on the updated path are
//! rebuilt; untouched siblings are shared with the previous tree through
//! [`Arc`], so old roots stay valid and can be read from other threads.

mod error;
mod node;
pub mod snapshot;

pub use error::DataError;
pub use node::{DataNode, Priority, Walk};
pub(crate) use node::number_to_json;
pub use snapshot::Snapshot;
