use std::cmp::Ordering;
use std::fmt;

use regex::Regex;
use serde_json::Value as JsonValue;

use super::error::EvalError;
use super::expr::CompareOp;
use super::ty::Method;
use crate::store::{Snapshot, number_to_json};

/// A runtime value produced while evaluating a rule.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    RegExp(Regex),
    Snapshot(Snapshot),
    /// A JSON object or array, as found in `auth` or returned by `val()`.
    Object(JsonValue),
    Array(Vec<Value>),
    /// A method bound to its receiver, waiting to be called.
    Function { method: Method, receiver: Box<Value> },
}

impl Value {
    /// Convert plain JSON. Objects and arrays stay as JSON.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            JsonValue::String(s) => Value::String(s.clone()),
            other => Value::Object(other.clone()),
        }
    }

    /// Name of the runtime type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::RegExp(_) => "RegExp",
            Value::Snapshot(_) => "Snapshot",
            Value::Object(JsonValue::Array(_)) | Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function { .. } => "function",
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Strict equality: values of different runtime types are never equal.
    #[must_use]
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            #[allow(clippy::float_cmp)]
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::RegExp(a), Value::RegExp(b)) => a.as_str() == b.as_str(),
            (Value::Snapshot(a), Value::Snapshot(b)) => a.same_view(b),
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_eq(y))
            }
            (
                Value::Function {
                    method: m1,
                    receiver: r1,
                },
                Value::Function {
                    method: m2,
                    receiver: r2,
                },
            ) => m1 == m2 && r1.strict_eq(r2),
            _ => false,
        }
    }

    /// Compare this value to another using the given operator.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Incomparable`] when an ordering operator is used
    /// on values of different runtime types, or on types without an order.
    pub fn compare(&self, op: CompareOp, other: &Value) -> Result<bool, EvalError> {
        match op {
            CompareOp::Eq | CompareOp::StrictEq => return Ok(self.strict_eq(other)),
            CompareOp::Neq | CompareOp::StrictNeq => return Ok(!self.strict_eq(other)),
            _ => {}
        }
        let ord = self.order(other).ok_or_else(|| EvalError::Incomparable {
            op: op.to_string(),
            left: self.type_name().to_owned(),
            right: other.type_name().to_owned(),
        })?;
        Ok(match (op, ord) {
            // NaN compares false against everything.
            (_, None) => false,
            (CompareOp::Gt, Some(ord)) => ord == Ordering::Greater,
            (CompareOp::Gte, Some(ord)) => ord != Ordering::Less,
            (CompareOp::Lt, Some(ord)) => ord == Ordering::Less,
            (_, Some(ord)) => ord != Ordering::Greater,
        })
    }

    fn order(&self, other: &Value) -> Option<Option<Ordering>> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Some(a.partial_cmp(b)),
            (Value::String(a), Value::String(b)) => Some(Some(a.cmp(b))),
            (Value::Null, Value::Null) => Some(Some(Ordering::Equal)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Snapshot> for Value {
    fn from(v: Snapshot) -> Self {
        Value::Snapshot(v)
    }
}

/// Format a number the way the rule language prints it: integers without a
/// fraction, `NaN` and `Infinity` spelled out.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n == f64::INFINITY {
        "Infinity".to_owned()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else if n == 0.0 {
        "0".to_owned()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", JsonValue::String(s.clone())),
            Value::RegExp(re) => write!(f, "/{}/", re.as_str()),
            Value::Snapshot(snap) => write!(f, "Snapshot(/{})", snap.path()),
            Value::Object(json) => write!(f, "{json}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Function { method, .. } => write!(f, "[function {}]", method.name()),
        }
    }
}

impl From<&Value> for JsonValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null | Value::Function { .. } => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::RegExp(re) => JsonValue::String(re.as_str().to_owned()),
            Value::Snapshot(snap) => snap.val(),
            Value::Object(json) => json.clone(),
            Value::Array(items) => JsonValue::Array(items.iter().map(JsonValue::from).collect()),
        }
    }
}
