use thiserror::Error;

use crate::parse::ParseError;

/// A rule expression that failed to parse or type-check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{message} in \"{fragment}\" (offset {start}..{end} of \"{rule}\")")]
    Type {
        rule: String,
        fragment: String,
        start: usize,
        end: usize,
        message: String,
    },
}

/// A malformed rule definition. Fatal for the whole ruleset.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule definition must be an object with a single \"rules\" key")]
    MissingRulesKey,

    #[error("unexpected top-level key '{key}' in rule definition")]
    UnexpectedTopLevelKey { key: String },

    #[error("rules at /{path} must be an object")]
    NotAnObject { path: String },

    #[error("{kind} at /{path} must be a string or a boolean, got {found}")]
    InvalidRuleType {
        path: String,
        kind: String,
        found: String,
    },

    #[error(".indexOn at /{path} must be a string or an array of strings, got {found}")]
    InvalidIndexOn { path: String, found: String },

    #[error("unknown rule kind '{kind}' at /{path}")]
    UnknownRuleKind { path: String, kind: String },

    #[error("/{path} has more than one wildcard child: {first} and {second}")]
    MultipleWildcards {
        path: String,
        first: String,
        second: String,
    },

    #[error("wildcard {name} at /{path} is already bound by an ancestor")]
    DuplicateWildcard { path: String, name: String },

    #[error("invalid key '{key}' at /{path}")]
    InvalidKey { path: String, key: String },

    #[error("invalid {kind} rule at /{path}: {source}")]
    Expression {
        path: String,
        kind: String,
        source: ExprError,
    },
}

/// A rule that failed while being evaluated. Recorded in the report, never
/// propagated out of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("{op} expected {expected}, got {found}")]
    Operand {
        op: String,
        expected: String,
        found: String,
    },

    #[error("cannot compare {left} with {right} using {op}")]
    Incomparable {
        op: String,
        left: String,
        right: String,
    },

    #[error("cannot read property '{property}' of null")]
    NullMember { property: String },

    #[error("{receiver} has no member '{property}'")]
    UnknownMember { receiver: String, property: String },

    #[error("{found} is not a function")]
    NotAFunction { found: String },

    #[error("{method}() expected {expected} arguments, got {found}")]
    Arity {
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {index} of {method}() must be {expected}, got {found}")]
    Argument {
        method: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },

    #[error("rule evaluated to {found}, not a boolean")]
    NotBoolean { found: String },
}

/// Misuse of the database API, raised at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("database is missing {missing}")]
    NotConfigured { missing: &'static str },

    #[error("invalid path '{path}': segments may not be empty or contain . $ # [ ]")]
    InvalidPath { path: String },

    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error("update at /{path} must be an object, got {found}")]
    InvalidPatch { path: String, found: String },

    #[error("update at /{path} has an empty patch")]
    EmptyPatch { path: String },

    #[error("update at /{path} has overlapping keys '{first}' and '{second}'")]
    OverlappingPatch {
        path: String,
        first: String,
        second: String,
    },
}
