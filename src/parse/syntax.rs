use std::ops::Range;

use crate::{BinaryOp, LogicalOp, UnaryOp};

/// Untyped expression tree produced by the grammar.
///
/// Spans are byte ranges into the rule source. The checker turns this into a
/// typed [`Expr`](crate::Expr).
#[derive(Debug, Clone, PartialEq)]
pub struct Syntax {
    pub kind: SyntaxKind,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxKind {
    Literal(Literal),
    Identifier(String),
    Unary {
        op: UnaryOp,
        operand: Box<Syntax>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Syntax>,
        right: Box<Syntax>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Syntax>,
        right: Box<Syntax>,
    },
    Conditional {
        test: Box<Syntax>,
        consequent: Box<Syntax>,
        alternate: Box<Syntax>,
    },
    Member {
        object: Box<Syntax>,
        property: Property,
    },
    Call {
        callee: Box<Syntax>,
        args: Vec<Syntax>,
    },
    Array(Vec<Syntax>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    RegExp { pattern: String, flags: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Named(String),
    Computed(Box<Syntax>),
}

impl Syntax {
    pub(crate) fn new(kind: SyntaxKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    pub(crate) fn binary(op: BinaryOp, left: Syntax, right: Syntax) -> Self {
        let span = left.span.start..right.span.end;
        Self::new(
            SyntaxKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub(crate) fn logical(op: LogicalOp, left: Syntax, right: Syntax) -> Self {
        let span = left.span.start..right.span.end;
        Self::new(
            SyntaxKind::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }
}
