mod comments;
mod error;
mod grammar;
mod syntax;

pub use error::ParseError;
pub use syntax::{Literal, Property, Syntax, SyntaxKind};

use winnow::Parser;
use winnow::stream::LocatingSlice;

/// Parse a single rule expression into an untyped [`Syntax`] tree.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not exactly one supported expression.
pub fn parse(source: &str) -> Result<Syntax, ParseError> {
    grammar::statement
        .parse(LocatingSlice::new(source))
        .map_err(|e| ParseError::new(source, e.offset(), e.inner().to_string()))
}

/// Strip `//` and `/* */` comments from a JSON rules document.
///
/// # Errors
///
/// Returns [`ParseError`] on an unterminated string or block comment.
pub fn strip_comments(source: &str) -> Result<String, ParseError> {
    comments::document
        .parse(LocatingSlice::new(source))
        .map_err(|e| ParseError::new(source, e.offset(), e.inner().to_string()))
}
