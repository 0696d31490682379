use std::fmt;

use serde::Serialize;

/// Final decision for a simulated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[must_use]
pub enum Verdict {
    Allowed,
    /// No `.read`/`.write` rule granted access.
    PermissionDenied,
    /// Access was granted but a `.validate` rule failed.
    ValidationFailed,
}

impl Verdict {
    pub fn new(permitted: bool, validated: bool) -> Self {
        match (permitted, validated) {
            (true, true) => Verdict::Allowed,
            (false, _) => Verdict::PermissionDenied,
            (true, false) => Verdict::ValidationFailed,
        }
    }

    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == Verdict::Allowed
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allowed => write!(f, "allowed"),
            Verdict::PermissionDenied => write!(f, "denied: no rule granted permission"),
            Verdict::ValidationFailed => write!(f, "denied: validation failed"),
        }
    }
}
