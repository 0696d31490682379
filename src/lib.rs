mod check;
mod compile;
mod database;
mod error;
mod evaluate;
mod traverse;
mod types;

pub mod parse;
pub mod paths;
pub mod query;
pub mod store;

pub use database::{Database, DatabaseBuilder, ReadOptions, WriteOptions, create_database};
pub use error::Error;
pub use query::{OrderBy, Query};
pub use store::{DataError, DataNode, Priority, Snapshot, Walk};
pub use types::{
    ArithOp, BinaryOp, CompareOp, EvalError, EvaluationReport, Expr, ExprError, ExprKind, LogicalOp,
    MemberKey, Method, Operation, Rule, RuleError, RuleKind, RuleLog, RuleOutcome, Ruleset,
    RulesetNode, Scope, State, Traced, Type, UnaryOp, UsageError, Value, Verdict,
};
