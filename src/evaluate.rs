use std::collections::BTreeSet;

use serde_json::Value as JsonValue;

use crate::paths;
use crate::store::{Priority, Snapshot};
use crate::types::format_number;
use crate::{
    ArithOp, BinaryOp, EvalError, Expr, ExprKind, LogicalOp, MemberKey, Method, State, Traced,
    UnaryOp, Value,
};

pub(crate) fn evaluate(expr: &Expr, source: &str, state: &State) -> Result<bool, EvalError> {
    let mut evaluator = Evaluator {
        state,
        source,
        trace: None,
    };
    evaluator.eval(expr).and_then(into_bool)
}

pub(crate) fn debug_evaluate(expr: &Expr, source: &str, state: &State) -> Traced {
    let mut evaluator = Evaluator {
        state,
        source,
        trace: Some(BTreeSet::new()),
    };
    let result = evaluator.eval(expr).and_then(into_bool);
    Traced {
        result,
        annotations: evaluator.trace.unwrap_or_default().into_iter().collect(),
    }
}

fn into_bool(value: Value) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| EvalError::NotBoolean {
        found: value.type_name().to_owned(),
    })
}

struct Evaluator<'a> {
    state: &'a State,
    source: &'a str,
    trace: Option<BTreeSet<String>>,
}

impl Evaluator<'_> {
    fn annotate(&mut self, expr: &Expr, value: &Value) {
        if let Some(trace) = &mut self.trace
            && !matches!(value, Value::Function { .. })
        {
            trace.insert(format!("{} = {value}", expr.source(self.source)));
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Identifier(name) => {
                let value = self
                    .state
                    .lookup(name)
                    .ok_or_else(|| EvalError::UnknownIdentifier { name: name.clone() })?;
                self.annotate(expr, &value);
                Ok(value)
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match (op, value) {
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Not, other) => Err(operand_error("!", "boolean", &other)),
                    (UnaryOp::Neg, other) => Err(operand_error("-", "number", &other)),
                }
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                match op {
                    BinaryOp::Arith(op) => arithmetic(*op, &left, &right),
                    BinaryOp::Compare(op) => left.compare(*op, &right).map(Value::Bool),
                }
            }
            ExprKind::Logical { op, left, right } => {
                let l = self.eval_bool(*op, left)?;
                match (op, l) {
                    (LogicalOp::And, false) => Ok(Value::Bool(false)),
                    (LogicalOp::Or, true) => Ok(Value::Bool(true)),
                    _ => self.eval_bool(*op, right).map(Value::Bool),
                }
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => match self.eval(test)? {
                Value::Bool(true) => self.eval(consequent),
                Value::Bool(false) => self.eval(alternate),
                other => Err(operand_error("?:", "boolean", &other)),
            },
            ExprKind::Member { object, property } => {
                let object = self.eval(object)?;
                let key = match property {
                    MemberKey::Named(name) => name.clone(),
                    MemberKey::Computed(key) => match self.eval(key)? {
                        Value::String(s) => s,
                        Value::Number(n) => format_number(n),
                        other => return Err(operand_error("[]", "string or number", &other)),
                    },
                };
                let value = member(object, &key)?;
                self.annotate(expr, &value);
                Ok(value)
            }
            ExprKind::Call { callee, args } => {
                let Value::Function { method, receiver } = self.eval(callee)? else {
                    return Err(EvalError::NotAFunction {
                        found: callee.source(self.source).to_owned(),
                    });
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let value = call(method, *receiver, &args)?;
                self.annotate(expr, &value);
                Ok(value)
            }
            ExprKind::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    fn eval_bool(&mut self, op: LogicalOp, expr: &Expr) -> Result<bool, EvalError> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(operand_error(&op.to_string(), "boolean", &other)),
        }
    }
}

fn operand_error(op: &str, expected: &str, found: &Value) -> EvalError {
    EvalError::Operand {
        op: op.to_owned(),
        expected: expected.to_owned(),
        found: found.type_name().to_owned(),
    }
}

fn arithmetic(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (ArithOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (_, Value::Number(a), Value::Number(b)) => Ok(Value::Number(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Mod => a % b,
        })),
        (ArithOp::Add, _, _) => Err(EvalError::Operand {
            op: op.to_string(),
            expected: "two strings or two numbers".to_owned(),
            found: format!("{} and {}", left.type_name(), right.type_name()),
        }),
        (_, Value::Number(_), other) | (_, other, _) => {
            Err(operand_error(&op.to_string(), "number", other))
        }
    }
}

fn member(object: Value, property: &str) -> Result<Value, EvalError> {
    let unknown = |receiver: &Value| EvalError::UnknownMember {
        receiver: receiver.type_name().to_owned(),
        property: property.to_owned(),
    };
    match object {
        Value::Null => Err(EvalError::NullMember {
            property: property.to_owned(),
        }),
        Value::Snapshot(_) => {
            let method = Method::snapshot(property).ok_or_else(|| unknown(&object))?;
            Ok(Value::Function {
                method,
                receiver: Box::new(object),
            })
        }
        Value::String(ref s) if property == "length" => {
            #[allow(clippy::cast_precision_loss)]
            let len = s.encode_utf16().count() as f64;
            Ok(Value::Number(len))
        }
        Value::String(_) => {
            let method = Method::string(property).ok_or_else(|| unknown(&object))?;
            Ok(Value::Function {
                method,
                receiver: Box::new(object),
            })
        }
        Value::Object(JsonValue::Object(ref map)) => {
            Ok(map.get(property).map_or(Value::Null, Value::from_json))
        }
        Value::Object(JsonValue::Array(ref items)) => {
            if property == "length" {
                #[allow(clippy::cast_precision_loss)]
                let len = items.len() as f64;
                return Ok(Value::Number(len));
            }
            Ok(property
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .map_or(Value::Null, Value::from_json))
        }
        other => Err(unknown(&other)),
    }
}

fn call(method: Method, receiver: Value, args: &[Value]) -> Result<Value, EvalError> {
    check_arity(method, args)?;
    match receiver {
        Value::Snapshot(snap) => snapshot_method(method, &snap, args),
        Value::String(s) => string_method(method, &s, args),
        other => Err(EvalError::NotAFunction {
            found: format!("{}.{}", other.type_name(), method.name()),
        }),
    }
}

fn check_arity(method: Method, args: &[Value]) -> Result<(), EvalError> {
    let expected = method.params().len();
    let ok = match method {
        Method::HasChildren => args.len() <= 1,
        _ => args.len() == expected,
    };
    if ok {
        Ok(())
    } else {
        Err(EvalError::Arity {
            method: method.name().to_owned(),
            expected,
            found: args.len(),
        })
    }
}

fn string_arg(method: Method, args: &[Value], index: usize) -> Result<&str, EvalError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        other => Err(EvalError::Argument {
            method: method.name().to_owned(),
            index,
            expected: "string".to_owned(),
            found: other.map_or("nothing", Value::type_name).to_owned(),
        }),
    }
}

/// A string argument naming a non-empty, valid relative data path.
fn path_arg(method: Method, args: &[Value], index: usize) -> Result<&str, EvalError> {
    let path = string_arg(method, args, index)?;
    if paths::trim(path).is_empty() || !paths::is_valid_path(path) {
        return Err(EvalError::Argument {
            method: method.name().to_owned(),
            index,
            expected: "a non-empty data path".to_owned(),
            found: format!("{path:?}"),
        });
    }
    Ok(path)
}

fn key_list(method: Method, arg: &Value) -> Result<Vec<String>, EvalError> {
    let bad = |found: &str| EvalError::Argument {
        method: method.name().to_owned(),
        index: 0,
        expected: "a non-empty array of strings".to_owned(),
        found: found.to_owned(),
    };
    let keys: Vec<String> = match arg {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned).ok_or_else(|| bad(item.type_name())))
            .collect::<Result<_, _>>()?,
        Value::Object(JsonValue::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned).ok_or_else(|| bad("array")))
            .collect::<Result<_, _>>()?,
        other => return Err(bad(other.type_name())),
    };
    if keys.is_empty() {
        return Err(bad("an empty array"));
    }
    Ok(keys)
}

fn snapshot_method(method: Method, snap: &Snapshot, args: &[Value]) -> Result<Value, EvalError> {
    Ok(match method {
        Method::Val => Value::from_json(&snap.val()),
        Method::Child => Value::Snapshot(snap.child(path_arg(method, args, 0)?)),
        Method::Parent => snap.parent().map_or(Value::Null, Value::Snapshot),
        Method::HasChild => Value::Bool(snap.has_child(path_arg(method, args, 0)?)),
        Method::HasChildren => match args.first() {
            None => Value::Bool(snap.has_children::<&str>(&[])),
            Some(arg) => Value::Bool(snap.has_children(&key_list(method, arg)?)),
        },
        Method::Exists => Value::Bool(snap.exists()),
        Method::GetPriority => match snap.get_priority() {
            Some(Priority::String(s)) => Value::String(s),
            Some(Priority::Number(n)) => Value::Number(n),
            None => Value::Null,
        },
        Method::IsNumber => Value::Bool(snap.is_number()),
        Method::IsString => Value::Bool(snap.is_string()),
        Method::IsBoolean => Value::Bool(snap.is_boolean()),
        other => {
            return Err(EvalError::UnknownMember {
                receiver: "Snapshot".to_owned(),
                property: other.name().to_owned(),
            });
        }
    })
}

fn string_method(method: Method, s: &str, args: &[Value]) -> Result<Value, EvalError> {
    Ok(match method {
        Method::Contains => Value::Bool(s.contains(string_arg(method, args, 0)?)),
        Method::BeginsWith => Value::Bool(s.starts_with(string_arg(method, args, 0)?)),
        Method::EndsWith => Value::Bool(s.ends_with(string_arg(method, args, 0)?)),
        Method::Replace => {
            let from = string_arg(method, args, 0)?;
            let to = string_arg(method, args, 1)?;
            Value::String(s.replace(from, to))
        }
        Method::ToLowerCase => Value::String(s.to_lowercase()),
        Method::ToUpperCase => Value::String(s.to_uppercase()),
        Method::Matches => match args.first() {
            Some(Value::RegExp(re)) => Value::Bool(re.is_match(s)),
            other => {
                return Err(EvalError::Argument {
                    method: method.name().to_owned(),
                    index: 0,
                    expected: "RegExp".to_owned(),
                    found: other.map_or("nothing", Value::type_name).to_owned(),
                });
            }
        },
        other => {
            return Err(EvalError::UnknownMember {
                receiver: "string".to_owned(),
                property: other.name().to_owned(),
            });
        }
    })
}
