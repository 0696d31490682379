use winnow::combinator::{alt, cut_err, preceded, repeat};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, none_of, take_till, take_until};

use super::grammar::Input;

/// One piece of a JSON-with-comments document.
#[derive(Clone)]
enum Chunk<'i> {
    Keep(&'i str),
    Char(char),
    Comment,
}

fn json_string<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    (
        '"',
        repeat::<_, _, (), _, _>(0.., alt((preceded('\\', any).void(), none_of(['"', '\\']).void()))),
        cut_err('"').context(StrContext::Expected(StrContextValue::CharLiteral('"'))),
    )
        .take()
        .parse_next(input)
}

fn line_comment(input: &mut Input<'_>) -> ModalResult<()> {
    ("//", take_till(0.., ['\n'])).void().parse_next(input)
}

fn block_comment(input: &mut Input<'_>) -> ModalResult<()> {
    preceded(
        "/*",
        cut_err((take_until(0.., "*/"), "*/"))
            .context(StrContext::Expected(StrContextValue::StringLiteral("*/"))),
    )
    .void()
    .parse_next(input)
}

fn chunk<'i>(input: &mut Input<'i>) -> ModalResult<Chunk<'i>> {
    alt((
        json_string.map(Chunk::Keep),
        line_comment.value(Chunk::Comment),
        block_comment.value(Chunk::Comment),
        any.map(Chunk::Char),
    ))
    .parse_next(input)
}

/// Remove `//` and `/* */` comments, leaving string contents untouched.
pub(crate) fn document(input: &mut Input<'_>) -> ModalResult<String> {
    let mut out = String::new();
    while !input.is_empty() {
        match chunk(input)? {
            Chunk::Keep(s) => out.push_str(s),
            Chunk::Char(c) => out.push(c),
            Chunk::Comment => out.push(' '),
        }
    }
    Ok(out)
}
