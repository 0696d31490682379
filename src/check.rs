use std::ops::Range;

use regex::RegexBuilder;

use crate::parse::{Literal, Property, Syntax, SyntaxKind};
use crate::{
    ArithOp, BinaryOp, Expr, ExprError, ExprKind, LogicalOp, MemberKey, Method, Scope, Type,
    UnaryOp, Value,
};

/// Infer a type for every node of `syntax`, rejecting expressions that can
/// never evaluate. Checks against fuzzy types are left to the evaluator.
pub(crate) fn check(syntax: &Syntax, scope: &Scope, source: &str) -> Result<Expr, ExprError> {
    Checker { scope, source }.check(syntax)
}

struct Checker<'a> {
    scope: &'a Scope,
    source: &'a str,
}

impl Checker<'_> {
    fn error(&self, span: &Range<usize>, message: impl Into<String>) -> ExprError {
        ExprError::Type {
            rule: self.source.to_owned(),
            fragment: self.source.get(span.clone()).unwrap_or_default().to_owned(),
            start: span.start,
            end: span.end,
            message: message.into(),
        }
    }

    fn check(&self, syntax: &Syntax) -> Result<Expr, ExprError> {
        let span = syntax.span.clone();
        match &syntax.kind {
            SyntaxKind::Literal(literal) => self.literal(literal, span),
            SyntaxKind::Identifier(name) => {
                let ty = self
                    .scope
                    .get(name)
                    .cloned()
                    .ok_or_else(|| self.error(&span, format!("unknown variable '{name}'")))?;
                Ok(Expr::new(ExprKind::Identifier(name.clone()), ty, span))
            }
            SyntaxKind::Unary { op, operand } => self.unary(*op, operand, span),
            SyntaxKind::Binary { op, left, right } => self.binary(*op, left, right, span),
            SyntaxKind::Logical { op, left, right } => self.logical(*op, left, right, span),
            SyntaxKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.check(test)?;
                if test.ty != Type::Boolean {
                    return Err(self.error(
                        &test.span,
                        format!("condition must be boolean, got {}", test.ty),
                    ));
                }
                let consequent = self.check(consequent)?;
                let alternate = self.check(alternate)?;
                let ty = consequent.ty.join(&alternate.ty);
                Ok(Expr::new(
                    ExprKind::Conditional {
                        test: Box::new(test),
                        consequent: Box::new(consequent),
                        alternate: Box::new(alternate),
                    },
                    ty,
                    span,
                ))
            }
            SyntaxKind::Member { object, property } => self.member(object, property, span),
            SyntaxKind::Call { callee, args } => self.call(callee, args, span),
            SyntaxKind::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.check(item))
                    .collect::<Result<Vec<_>, _>>()?;
                let item_ty = items
                    .iter()
                    .map(|item| item.ty.clone())
                    .reduce(|a, b| a.join(&b))
                    .unwrap_or(Type::Any);
                Ok(Expr::new(
                    ExprKind::Array(items),
                    Type::Array(Box::new(item_ty)),
                    span,
                ))
            }
        }
    }

    fn literal(&self, literal: &Literal, span: Range<usize>) -> Result<Expr, ExprError> {
        let (value, ty) = match literal {
            Literal::Null => (Value::Null, Type::Null),
            Literal::Bool(b) => (Value::Bool(*b), Type::Boolean),
            Literal::Number(n) => (Value::Number(*n), Type::Number),
            Literal::String(s) => (Value::String(s.clone()), Type::String),
            Literal::RegExp { pattern, flags } => {
                if !flags.is_empty() && flags != "i" {
                    return Err(self.error(
                        &span,
                        format!("unsupported regular expression flags '{flags}'"),
                    ));
                }
                let regex = RegexBuilder::new(&pattern.replace("\\/", "/"))
                    .case_insensitive(flags == "i")
                    .build()
                    .map_err(|e| self.error(&span, format!("invalid regular expression: {e}")))?;
                (Value::RegExp(regex), Type::RegExp)
            }
        };
        Ok(Expr::new(ExprKind::Literal(value), ty, span))
    }

    fn unary(&self, op: UnaryOp, operand: &Syntax, span: Range<usize>) -> Result<Expr, ExprError> {
        let operand = self.check(operand)?;
        let ty = match op {
            UnaryOp::Not if operand.ty == Type::Boolean => Type::Boolean,
            UnaryOp::Neg if Type::Number.accepts(&operand.ty) => Type::Number,
            UnaryOp::Not => {
                return Err(self.error(&span, format!("! expected boolean, got {}", operand.ty)));
            }
            UnaryOp::Neg => {
                return Err(self.error(&span, format!("- expected number, got {}", operand.ty)));
            }
        };
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            span,
        ))
    }

    fn binary(
        &self,
        op: BinaryOp,
        left: &Syntax,
        right: &Syntax,
        span: Range<usize>,
    ) -> Result<Expr, ExprError> {
        let left = self.check(left)?;
        let right = self.check(right)?;
        let (l, r) = (&left.ty, &right.ty);
        let mismatch = || self.error(&span, format!("{op} cannot be applied to {l} and {r}"));

        let ty = match op {
            BinaryOp::Arith(ArithOp::Add) => match (l, r) {
                (Type::String, Type::String) => Type::String,
                (Type::Number, Type::Number) => Type::Number,
                _ if (l.is_fuzzy() || r.is_fuzzy())
                    && (l.is_primitive() || l.is_fuzzy())
                    && (r.is_primitive() || r.is_fuzzy()) =>
                {
                    Type::Primitive
                }
                _ => return Err(mismatch()),
            },
            BinaryOp::Arith(_) => {
                if Type::Number.accepts(l) && Type::Number.accepts(r) {
                    Type::Number
                } else {
                    return Err(mismatch());
                }
            }
            BinaryOp::Compare(cmp) if cmp.is_equality() => {
                if *l == Type::RegExp || *r == Type::RegExp {
                    return Err(mismatch());
                }
                Type::Boolean
            }
            BinaryOp::Compare(_) => {
                let orderable = |t: &Type| {
                    t.is_fuzzy() || matches!(t, Type::String | Type::Number | Type::Null)
                };
                let resolved = l.is_fuzzy() || r.is_fuzzy() || l == r;
                if orderable(l) && orderable(r) && resolved {
                    Type::Boolean
                } else {
                    return Err(mismatch());
                }
            }
        };
        Ok(Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            span,
        ))
    }

    fn logical(
        &self,
        op: LogicalOp,
        left: &Syntax,
        right: &Syntax,
        span: Range<usize>,
    ) -> Result<Expr, ExprError> {
        let left = self.check(left)?;
        let right = self.check(right)?;
        for side in [&left, &right] {
            if side.ty != Type::Boolean {
                return Err(self.error(
                    &side.span,
                    format!("{op} expected boolean, got {}", side.ty),
                ));
            }
        }
        Ok(Expr::new(
            ExprKind::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            Type::Boolean,
            span,
        ))
    }

    fn member(
        &self,
        object: &Syntax,
        property: &Property,
        span: Range<usize>,
    ) -> Result<Expr, ExprError> {
        let object = self.check(object)?;
        let (property, ty) = match (&object.ty, property) {
            (Type::Snapshot, Property::Named(name)) => {
                let method = Method::snapshot(name).ok_or_else(|| {
                    self.error(&span, format!("Snapshot has no member '{name}'"))
                })?;
                (MemberKey::Named(name.clone()), Type::Function(method))
            }
            (Type::String, Property::Named(name)) if name == "length" => {
                (MemberKey::Named(name.clone()), Type::Number)
            }
            (Type::String, Property::Named(name)) => {
                let method = Method::string(name).ok_or_else(|| {
                    self.error(&span, format!("string has no member '{name}'"))
                })?;
                (MemberKey::Named(name.clone()), Type::Function(method))
            }
            (ty, Property::Named(name)) if ty.is_fuzzy() => {
                (MemberKey::Named(name.clone()), Type::Any)
            }
            (ty, Property::Computed(key)) if ty.is_fuzzy() => {
                let key = self.check(key)?;
                if !(key.ty.is_fuzzy() || matches!(key.ty, Type::String | Type::Number)) {
                    return Err(self.error(
                        &key.span,
                        format!("property key must be a string or number, got {}", key.ty),
                    ));
                }
                (MemberKey::Computed(Box::new(key)), Type::Any)
            }
            (ty, _) => {
                return Err(self.error(&span, format!("cannot access a member of {ty}")));
            }
        };
        Ok(Expr::new(
            ExprKind::Member {
                object: Box::new(object),
                property,
            },
            ty,
            span,
        ))
    }

    fn call(&self, callee: &Syntax, args: &[Syntax], span: Range<usize>) -> Result<Expr, ExprError> {
        let callee = self.check(callee)?;
        let args = args
            .iter()
            .map(|arg| self.check(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let ty = match &callee.ty {
            Type::Function(Method::HasChildren) => {
                match args.as_slice() {
                    [] => {}
                    [arg] => self.has_children_arg(arg)?,
                    _ => {
                        return Err(self.error(
                            &span,
                            format!("hasChildren() takes at most 1 argument, got {}", args.len()),
                        ));
                    }
                }
                Type::Boolean
            }
            Type::Function(method) => {
                let params = method.params();
                if params.len() != args.len() {
                    return Err(self.error(
                        &span,
                        format!(
                            "{}() expected {} arguments, got {}",
                            method.name(),
                            params.len(),
                            args.len()
                        ),
                    ));
                }
                for (param, arg) in params.iter().zip(&args) {
                    if !param.accepts(&arg.ty) {
                        return Err(self.error(
                            &arg.span,
                            format!("{}() expected {param}, got {}", method.name(), arg.ty),
                        ));
                    }
                }
                method.returns()
            }
            ty if ty.is_fuzzy() => Type::Any,
            ty => return Err(self.error(&callee.span, format!("{ty} is not a function"))),
        };
        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            ty,
            span,
        ))
    }

    fn has_children_arg(&self, arg: &Expr) -> Result<(), ExprError> {
        let ExprKind::Array(items) = &arg.kind else {
            return Err(self.error(
                &arg.span,
                format!("hasChildren() expected an array of strings, got {}", arg.ty),
            ));
        };
        if items.is_empty() {
            return Err(self.error(&arg.span, "hasChildren() expected a non-empty array"));
        }
        if let Some(item) = items.iter().find(|item| item.ty != Type::String) {
            return Err(self.error(
                &item.span,
                format!("hasChildren() expected string keys, got {}", item.ty),
            ));
        }
        Ok(())
    }
}
