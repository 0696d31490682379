use std::fmt;

/// Errors produced when parsing rule expressions or rule files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    source_text: String,
    offset: usize,
    message: String,
}

impl ParseError {
    pub(crate) fn new(source_text: &str, offset: usize, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            source_text: source_text.to_owned(),
            offset,
            message: if message.is_empty() {
                "unexpected input".to_owned()
            } else {
                message
            },
        }
    }

    /// The text that failed to parse.
    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Byte offset of the failure within [`source_text`](Self::source_text).
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at offset {}: {}",
            self.offset, self.message
        )
    }
}

impl std::error::Error for ParseError {}
