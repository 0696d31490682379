use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, delimited, eof, opt, preceded, repeat, separated};
use winnow::error::{ContextError, ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::stream::{LocatingSlice, Stream};
use winnow::token::{any, one_of, take_while};

use super::syntax::{Literal, Property, Syntax, SyntaxKind};
use crate::{ArithOp, BinaryOp, CompareOp, LogicalOp, UnaryOp};

pub(crate) type Input<'i> = LocatingSlice<&'i str>;

fn cut() -> ErrMode<ContextError> {
    ErrMode::Cut(ContextError::new())
}

// -- Whitespace & identifiers -------------------------------------------------

fn ws(input: &mut Input<'_>) -> ModalResult<()> {
    take_while(0.., char::is_whitespace)
        .void()
        .parse_next(input)
}

fn ident<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '$'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
    )
        .take()
        .parse_next(input)
}

// -- Literals -----------------------------------------------------------------

fn string_literal(input: &mut Input<'_>) -> ModalResult<String> {
    let quote = one_of(['"', '\'']).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = cut_err(any).parse_next(input)?;
        match ch {
            c if c == quote => return Ok(s),
            '\\' => {
                let esc = cut_err(any).parse_next(input)?;
                match esc {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    'b' => s.push('\u{8}'),
                    'f' => s.push('\u{c}'),
                    'v' => s.push('\u{b}'),
                    '0' => s.push('\0'),
                    'u' => {
                        let hex = cut_err(take_while(4, |c: char| c.is_ascii_hexdigit()))
                            .parse_next(input)?;
                        let decoded = u32::from_str_radix(hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(cut)?;
                        s.push(decoded);
                    }
                    other => s.push(other),
                }
            }
            c => s.push(c),
        }
    }
}

fn number_literal(input: &mut Input<'_>) -> ModalResult<f64> {
    (
        alt((
            (digit1, opt(('.', take_while(0.., |c: char| c.is_ascii_digit())))).void(),
            ('.', digit1).void(),
        )),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .try_map(|s: &str| s.parse::<f64>())
        .parse_next(input)
}

fn regex_literal(input: &mut Input<'_>) -> ModalResult<Literal> {
    '/'.parse_next(input)?;
    let mut pattern = String::new();
    let mut in_class = false;
    loop {
        let ch = cut_err(any).parse_next(input)?;
        match ch {
            '\n' | '\r' => return Err(cut()),
            '/' if !in_class => break,
            '\\' => {
                pattern.push('\\');
                pattern.push(cut_err(any).parse_next(input)?);
            }
            '[' => {
                in_class = true;
                pattern.push('[');
            }
            ']' => {
                in_class = false;
                pattern.push(']');
            }
            c => pattern.push(c),
        }
    }
    if pattern.is_empty() {
        return Err(cut());
    }
    let flags = take_while(0.., |c: char| c.is_ascii_alphabetic()).parse_next(input)?;
    Ok(Literal::RegExp {
        pattern,
        flags: flags.to_owned(),
    })
}

fn word(input: &mut Input<'_>) -> ModalResult<Syntax> {
    let (name, span) = ident.with_span().parse_next(input)?;
    let kind = match name {
        "true" => SyntaxKind::Literal(Literal::Bool(true)),
        "false" => SyntaxKind::Literal(Literal::Bool(false)),
        "null" => SyntaxKind::Literal(Literal::Null),
        other => SyntaxKind::Identifier(other.to_owned()),
    };
    Ok(Syntax::new(kind, span))
}

fn array_literal(input: &mut Input<'_>) -> ModalResult<Syntax> {
    let (items, span) = delimited(
        '[',
        separated(0.., expr, (ws, ',')),
        (ws, cut_err(']')),
    )
    .with_span()
    .parse_next(input)?;
    Ok(Syntax::new(SyntaxKind::Array(items), span))
}

fn parenthesized(input: &mut Input<'_>) -> ModalResult<Syntax> {
    let (mut inner, span) = delimited('(', cut_err(expr), (ws, cut_err(')')))
        .with_span()
        .parse_next(input)?;
    inner.span = span;
    Ok(inner)
}

// -- Operands -----------------------------------------------------------------

fn primary(input: &mut Input<'_>) -> ModalResult<Syntax> {
    ws.parse_next(input)?;
    alt((
        parenthesized,
        array_literal,
        string_literal
            .with_span()
            .map(|(s, span)| Syntax::new(SyntaxKind::Literal(Literal::String(s)), span)),
        number_literal
            .with_span()
            .map(|(n, span)| Syntax::new(SyntaxKind::Literal(Literal::Number(n)), span)),
        regex_literal
            .with_span()
            .map(|(re, span)| Syntax::new(SyntaxKind::Literal(re), span)),
        word,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

fn postfix(input: &mut Input<'_>) -> ModalResult<Syntax> {
    let mut node = primary(input)?;
    loop {
        let checkpoint = input.checkpoint();
        ws.parse_next(input)?;
        let start = node.span.start;

        if opt('.').parse_next(input)?.is_some() {
            ws.parse_next(input)?;
            let (name, span) = cut_err(ident)
                .context(StrContext::Expected(StrContextValue::Description(
                    "property name",
                )))
                .with_span()
                .parse_next(input)?;
            node = Syntax::new(
                SyntaxKind::Member {
                    object: Box::new(node),
                    property: Property::Named(name.to_owned()),
                },
                start..span.end,
            );
        } else if opt('[').parse_next(input)?.is_some() {
            let property = cut_err(expr).parse_next(input)?;
            ws.parse_next(input)?;
            let close = cut_err(']').span().parse_next(input)?;
            node = Syntax::new(
                SyntaxKind::Member {
                    object: Box::new(node),
                    property: Property::Computed(Box::new(property)),
                },
                start..close.end,
            );
        } else if opt('(').parse_next(input)?.is_some() {
            let args: Vec<Syntax> = separated(0.., expr, (ws, ',')).parse_next(input)?;
            ws.parse_next(input)?;
            let close = cut_err(')').span().parse_next(input)?;
            node = Syntax::new(
                SyntaxKind::Call {
                    callee: Box::new(node),
                    args,
                },
                start..close.end,
            );
        } else {
            input.reset(&checkpoint);
            return Ok(node);
        }
    }
}

fn unary(input: &mut Input<'_>) -> ModalResult<Syntax> {
    ws.parse_next(input)?;
    let op = opt(alt(('!'.value(UnaryOp::Not), '-'.value(UnaryOp::Neg))).with_span())
        .parse_next(input)?;
    match op {
        Some((op, span)) => {
            let operand = cut_err(unary).parse_next(input)?;
            let end = operand.span.end;
            Ok(Syntax::new(
                SyntaxKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span.start..end,
            ))
        }
        None => postfix(input),
    }
}

// -- Binary operators (precedence: || < && < equality < relational < + < *) ----

fn multiplicative_op(input: &mut Input<'_>) -> ModalResult<BinaryOp> {
    alt((
        '*'.value(BinaryOp::Arith(ArithOp::Mul)),
        '/'.value(BinaryOp::Arith(ArithOp::Div)),
        '%'.value(BinaryOp::Arith(ArithOp::Mod)),
    ))
    .parse_next(input)
}

fn additive_op(input: &mut Input<'_>) -> ModalResult<BinaryOp> {
    alt((
        '+'.value(BinaryOp::Arith(ArithOp::Add)),
        '-'.value(BinaryOp::Arith(ArithOp::Sub)),
    ))
    .parse_next(input)
}

fn relational_op(input: &mut Input<'_>) -> ModalResult<BinaryOp> {
    alt((
        "<=".value(BinaryOp::Compare(CompareOp::Lte)),
        ">=".value(BinaryOp::Compare(CompareOp::Gte)),
        '<'.value(BinaryOp::Compare(CompareOp::Lt)),
        '>'.value(BinaryOp::Compare(CompareOp::Gt)),
    ))
    .parse_next(input)
}

fn equality_op(input: &mut Input<'_>) -> ModalResult<BinaryOp> {
    alt((
        "===".value(BinaryOp::Compare(CompareOp::StrictEq)),
        "!==".value(BinaryOp::Compare(CompareOp::StrictNeq)),
        "==".value(BinaryOp::Compare(CompareOp::Eq)),
        "!=".value(BinaryOp::Compare(CompareOp::Neq)),
    ))
    .parse_next(input)
}

fn binary_level<'i>(
    input: &mut Input<'i>,
    operand: fn(&mut Input<'i>) -> ModalResult<Syntax>,
    operator: fn(&mut Input<'i>) -> ModalResult<BinaryOp>,
) -> ModalResult<Syntax> {
    let first = operand(input)?;
    let rest: Vec<(BinaryOp, Syntax)> =
        repeat(0.., (preceded(ws, operator), cut_err(operand))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |left, (op, right)| Syntax::binary(op, left, right)))
}

fn multiplicative(input: &mut Input<'_>) -> ModalResult<Syntax> {
    binary_level(input, unary, multiplicative_op)
}

fn additive(input: &mut Input<'_>) -> ModalResult<Syntax> {
    binary_level(input, multiplicative, additive_op)
}

fn relational(input: &mut Input<'_>) -> ModalResult<Syntax> {
    binary_level(input, additive, relational_op)
}

fn equality(input: &mut Input<'_>) -> ModalResult<Syntax> {
    binary_level(input, relational, equality_op)
}

fn logical_and(input: &mut Input<'_>) -> ModalResult<Syntax> {
    let first = equality(input)?;
    let rest: Vec<Syntax> = repeat(0.., preceded((ws, "&&"), cut_err(equality))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |left, right| Syntax::logical(LogicalOp::And, left, right)))
}

fn logical_or(input: &mut Input<'_>) -> ModalResult<Syntax> {
    let first = logical_and(input)?;
    let rest: Vec<Syntax> =
        repeat(0.., preceded((ws, "||"), cut_err(logical_and))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |left, right| Syntax::logical(LogicalOp::Or, left, right)))
}

fn conditional(input: &mut Input<'_>) -> ModalResult<Syntax> {
    let test = logical_or(input)?;
    let checkpoint = input.checkpoint();
    ws.parse_next(input)?;
    if opt('?').parse_next(input)?.is_none() {
        input.reset(&checkpoint);
        return Ok(test);
    }
    let consequent = cut_err(expr).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err(':')
        .context(StrContext::Expected(StrContextValue::CharLiteral(':')))
        .parse_next(input)?;
    let alternate = cut_err(expr).parse_next(input)?;
    let span = test.span.start..alternate.span.end;
    Ok(Syntax::new(
        SyntaxKind::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        },
        span,
    ))
}

fn expr(input: &mut Input<'_>) -> ModalResult<Syntax> {
    ws.parse_next(input)?;
    conditional(input)
}

// -- Top-level ----------------------------------------------------------------

/// Exactly one expression, optionally followed by a semicolon.
pub(crate) fn statement(input: &mut Input<'_>) -> ModalResult<Syntax> {
    let node = expr(input)?;
    (ws, opt(';'), ws).void().parse_next(input)?;
    cut_err(eof)
        .context(StrContext::Expected(StrContextValue::Description(
            "end of expression",
        )))
        .parse_next(input)?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use crate::parse::parse;

    use super::*;

    fn kind(source: &str) -> SyntaxKind {
        parse(source).unwrap().kind
    }

    #[test]
    fn parse_literals() {
        let cases = [
            ("null", Literal::Null),
            ("true", Literal::Bool(true)),
            ("false", Literal::Bool(false)),
            ("42", Literal::Number(42.0)),
            ("3.5", Literal::Number(3.5)),
            (".5", Literal::Number(0.5)),
            ("1e3", Literal::Number(1000.0)),
            ("'single'", Literal::String("single".into())),
            (r#""dou\"ble""#, Literal::String("dou\"ble".into())),
            (r"'A'", Literal::String("A".into())),
        ];
        for (source, expected) in cases {
            assert_eq!(kind(source), SyntaxKind::Literal(expected), "failed for {source}");
        }
    }

    #[test]
    fn parse_regex_literal() {
        assert_eq!(
            kind(r"/^a\/b[/]$/i"),
            SyntaxKind::Literal(Literal::RegExp {
                pattern: r"^a\/b[/]$".into(),
                flags: "i".into(),
            })
        );
    }

    #[test]
    fn parse_member_and_call() {
        let syntax = parse("data.child('a').val()").unwrap();
        assert_eq!(syntax.span, 0..21);
        match syntax.kind {
            SyntaxKind::Call { callee, args } => {
                assert!(args.is_empty());
                assert!(matches!(
                    callee.kind,
                    SyntaxKind::Member { property: Property::Named(ref n), .. } if n == "val"
                ));
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn parse_computed_member() {
        assert!(matches!(
            kind("auth.token['email']"),
            SyntaxKind::Member {
                property: Property::Computed(_),
                ..
            }
        ));
    }

    #[test]
    fn parse_precedence() {
        match kind("a || b && c") {
            SyntaxKind::Logical { op, right, .. } => {
                assert_eq!(op, LogicalOp::Or);
                assert!(matches!(
                    right.kind,
                    SyntaxKind::Logical {
                        op: LogicalOp::And,
                        ..
                    }
                ));
            }
            other => panic!("expected Or, got {other:?}"),
        }

        match kind("1 + 2 * 3 == 7") {
            SyntaxKind::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOp::Compare(CompareOp::Eq));
                assert!(matches!(
                    left.kind,
                    SyntaxKind::Binary {
                        op: BinaryOp::Arith(ArithOp::Add),
                        ..
                    }
                ));
            }
            other => panic!("expected ==, got {other:?}"),
        }
    }

    #[test]
    fn parse_all_comparison_ops() {
        let ops = [
            ("==", CompareOp::Eq),
            ("===", CompareOp::StrictEq),
            ("!=", CompareOp::Neq),
            ("!==", CompareOp::StrictNeq),
            (">", CompareOp::Gt),
            (">=", CompareOp::Gte),
            ("<", CompareOp::Lt),
            ("<=", CompareOp::Lte),
        ];
        for (sym, expected) in ops {
            match kind(&format!("a {sym} 1")) {
                SyntaxKind::Binary { op, .. } => {
                    assert_eq!(op, BinaryOp::Compare(expected), "failed for {sym}");
                }
                other => panic!("expected comparison for {sym}, got {other:?}"),
            }
        }
    }

    #[test]
    fn parse_unary_and_conditional() {
        assert!(matches!(
            kind("!a"),
            SyntaxKind::Unary {
                op: UnaryOp::Not,
                ..
            }
        ));
        assert!(matches!(
            kind("-a"),
            SyntaxKind::Unary {
                op: UnaryOp::Neg,
                ..
            }
        ));
        assert!(matches!(kind("a ? b : c"), SyntaxKind::Conditional { .. }));
    }

    #[test]
    fn parenthesized_span_covers_parens() {
        let syntax = parse("(a || b) && c").unwrap();
        match syntax.kind {
            SyntaxKind::Logical { left, .. } => assert_eq!(left.span, 0..8),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn parse_array() {
        match kind("['a', 'b']") {
            SyntaxKind::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("expected Array, got {other:?}"),
        }
        assert_eq!(kind("[]"), SyntaxKind::Array(vec![]));
    }

    #[test]
    fn trailing_semicolon_allowed() {
        assert!(parse("true;").is_ok());
        assert!(parse("  true ; ").is_ok());
    }

    #[test]
    fn reject_unsupported_syntax() {
        for source in [
            "a = 1",
            "a; b",
            "var a = 1",
            "a &",
            "a +",
            "'unterminated",
            "(a",
            "a ? b",
            "",
            "function() {}",
        ] {
            assert!(parse(source).is_err(), "{source:?} should not parse");
        }
    }
}
