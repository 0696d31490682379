use std::fmt;

use serde::Serialize;

use super::context::State;
use super::error::{EvalError, ExprError};
use super::expr::Expr;
use super::scope::Scope;
use super::ty::Type;

/// Which rule of a ruleset node is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Read,
    Write,
    Validate,
}

impl RuleKind {
    /// The key used in rule definitions.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            RuleKind::Read => ".read",
            RuleKind::Write => ".write",
            RuleKind::Validate => ".validate",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            ".read" => Some(RuleKind::Read),
            ".write" => Some(RuleKind::Write),
            ".validate" => Some(RuleKind::Validate),
            _ => None,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A compiled security rule: a type-checked boolean expression together with
/// the source it was compiled from.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    source: String,
    expr: Expr,
}

/// Result of [`Rule::debug_evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traced {
    pub result: Result<bool, EvalError>,
    /// Sorted, deduplicated `"<source> = <value>"` lines.
    pub annotations: Vec<String>,
}

impl Rule {
    /// Parse and type-check `source` against `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError`] if the source does not parse, fails type
    /// checking, or is not a boolean expression.
    pub fn new(source: &str, scope: &Scope) -> Result<Self, ExprError> {
        let syntax = crate::parse::parse(source)?;
        let expr = crate::check::check(&syntax, scope, source)?;
        if expr.ty != Type::Boolean {
            return Err(ExprError::Type {
                rule: source.to_owned(),
                fragment: source.to_owned(),
                start: 0,
                end: source.len(),
                message: format!("rule must be boolean, got {}", expr.ty),
            });
        }
        Ok(Self {
            source: source.to_owned(),
            expr,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate the rule.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] if a check deferred to run time fails.
    pub fn evaluate(&self, state: &State) -> Result<bool, EvalError> {
        crate::evaluate::evaluate(&self.expr, &self.source, state)
    }

    /// Evaluate the rule, also recording the value of every identifier,
    /// member and call in it.
    #[must_use]
    pub fn debug_evaluate(&self, state: &State) -> Traced {
        crate::evaluate::debug_evaluate(&self.expr, &self.source, state)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
