use std::collections::BTreeMap;

use super::rule::RuleKind;
use super::ty::Type;

/// Names visible to a rule expression and their static types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    names: BTreeMap<String, Type>,
}

impl Scope {
    /// Scope of a `.read` rule: `auth`, `root`, `data`, `now` and the
    /// wildcards bound on the way down.
    #[must_use]
    pub fn read<S: AsRef<str>>(wildcards: &[S]) -> Self {
        let mut names = BTreeMap::from([
            ("auth".to_owned(), Type::Any),
            ("root".to_owned(), Type::Snapshot),
            ("data".to_owned(), Type::Snapshot),
            ("now".to_owned(), Type::Number),
        ]);
        for name in wildcards {
            names.insert(name.as_ref().to_owned(), Type::String);
        }
        Self { names }
    }

    /// Scope of a `.write` or `.validate` rule: the read scope plus `newData`.
    #[must_use]
    pub fn write<S: AsRef<str>>(wildcards: &[S]) -> Self {
        let mut scope = Self::read(wildcards);
        scope.names.insert("newData".to_owned(), Type::Snapshot);
        scope
    }

    #[must_use]
    pub fn for_kind<S: AsRef<str>>(kind: RuleKind, wildcards: &[S]) -> Self {
        match kind {
            RuleKind::Read => Self::read(wildcards),
            RuleKind::Write | RuleKind::Validate => Self::write(wildcards),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Type> {
        self.names.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}
