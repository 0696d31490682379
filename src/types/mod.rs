mod context;
mod error;
mod evaluation_report;
mod expr;
mod rule;
mod ruleset;
mod scope;
mod ty;
mod value;
mod verdict;

pub use context::State;
pub use error::{EvalError, ExprError, RuleError, UsageError};
pub use evaluation_report::{EvaluationReport, Operation, RuleLog, RuleOutcome};
pub use expr::{ArithOp, BinaryOp, CompareOp, Expr, ExprKind, LogicalOp, MemberKey, UnaryOp};
pub use rule::{Rule, RuleKind, Traced};
pub use ruleset::{Ruleset, RulesetNode};
pub use scope::Scope;
pub use ty::{Method, Type};
pub use value::Value;
pub(crate) use value::format_number;
pub use verdict::Verdict;
