use thiserror::Error;

use crate::parse::ParseError;
use crate::store::DataError;
use crate::{RuleError, UsageError};

/// Unified error type covering rule definitions, data, API misuse and I/O.
///
/// Returned by [`create_database`](crate::create_database), the
/// [`Database`](crate::Database) operations and the loading helpers such as
/// [`Ruleset::from_file()`](crate::Ruleset::from_file).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_each_family_transparently() {
        let err = Error::from(UsageError::EmptyPatch { path: "a".into() });
        assert_eq!(err.to_string(), "update at /a has an empty patch");
        assert!(matches!(err, Error::Usage(_)));

        let err = Error::from(RuleError::MissingRulesKey);
        assert_eq!(err.to_string(), RuleError::MissingRulesKey.to_string());
    }
}
