use thiserror::Error;

/// Errors raised while converting JSON into a [`DataNode`](super::DataNode).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("invalid key '{key}': keys may not be empty or contain . $ # [ ] /")]
    InvalidKey { key: String },

    #[error("invalid priority {found}: priorities must be strings or numbers")]
    InvalidPriority { found: String },

    #[error("invalid value {found}: expected a string, number, boolean, null or object")]
    InvalidValue { found: String },

    #[error("unknown server value '{kind}'; only \"timestamp\" is supported")]
    UnknownServerValue { kind: String },
}
