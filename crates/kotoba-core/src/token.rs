//! Token records exchanged with the external lexer.
//!
//! The lexer reports [`RawToken`]s positioned in the *prepared* text (after
//! indentation normalization and character folding). The driver decorates
//! each of them into a [`Token`] positioned in the author's original text.
//! Tokens are immutable records: every mapping stage builds new ones.

use serde::{Deserialize, Serialize};

use crate::{ast::FuncMeta, span::Span};

/// Token kind carrying nested source text that is lexed recursively.
pub const KIND_EMBEDDED_CODE: &str = "code";
/// Token kind of a comment running to the end of the line.
pub const KIND_LINE_COMMENT: &str = "line_comment";
/// Token kind of a delimited comment.
pub const KIND_RANGE_COMMENT: &str = "range_comment";

/// A token as produced by the lexer, positioned in prepared text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawToken {
    pub kind: String,
    pub value: String,
    pub line: usize,
    pub column: usize,
    pub file: String,
    pub josi: String,
    pub prepared_offset: usize,
    pub prepared_len: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FuncMeta>,
}

impl RawToken {
    pub fn new(kind: impl Into<String>, value: impl Into<String>, prepared: Span) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            line: 0,
            column: 0,
            file: String::new(),
            josi: String::new(),
            prepared_offset: prepared.start(),
            prepared_len: prepared.len(),
            meta: None,
        }
    }

    pub fn with_josi(mut self, josi: impl Into<String>) -> Self {
        self.josi = josi.into();
        self
    }

    pub fn with_line(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Start and end offsets in the prepared text.
    pub fn prepared_span(&self) -> Span {
        Span::new(self.prepared_offset..self.prepared_offset + self.prepared_len)
    }
}

/// A token decorated with offsets in the author's original source.
///
/// An offset is `None` when the token has no counterpart in the original
/// text, e.g. a block terminator synthesized by the indentation normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: String,
    pub value: String,
    pub line: usize,
    pub column: usize,
    pub file: String,
    pub josi: String,
    pub raw_josi: String,
    pub start_offset: Option<usize>,
    pub end_offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FuncMeta>,
}

impl Token {
    /// Build the decorated record for `raw` with already-composed offsets.
    ///
    /// Offsets that would violate `start <= end` are dropped rather than
    /// reported as a reversed range.
    pub fn from_raw(raw: &RawToken, start_offset: Option<usize>, end_offset: Option<usize>) -> Self {
        let (start_offset, end_offset) = match (start_offset, end_offset) {
            (Some(start), Some(end)) if start > end => (Some(start), None),
            offsets => offsets,
        };
        Self {
            kind: raw.kind.clone(),
            value: raw.value.clone(),
            line: raw.line,
            column: raw.column,
            file: raw.file.clone(),
            josi: raw.josi.clone(),
            raw_josi: raw.josi.clone(),
            start_offset,
            end_offset,
            meta: raw.meta.clone(),
        }
    }

    /// The original-source span, when both ends are known.
    pub fn span(&self) -> Option<Span> {
        match (self.start_offset, self.end_offset) {
            (Some(start), Some(end)) => Some(Span::new(start..end)),
            _ => None,
        }
    }

    /// Check if this is a comment token.
    pub fn is_comment(&self) -> bool {
        self.kind == KIND_LINE_COMMENT || self.kind == KIND_RANGE_COMMENT
    }

    /// Check if this token carries embedded source code.
    pub fn is_embedded_code(&self) -> bool {
        self.kind == KIND_EMBEDDED_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_keeps_josi_twice() {
        let raw = RawToken::new("word", "A", Span::new(3..4)).with_josi("を");
        let token = Token::from_raw(&raw, Some(5), Some(6));

        assert_eq!(token.josi, "を");
        assert_eq!(token.raw_josi, "を");
        assert_eq!(token.span(), Some(Span::new(5..6)));
    }

    #[test]
    fn test_from_raw_drops_reversed_end() {
        let raw = RawToken::new("word", "A", Span::new(0..1));
        let token = Token::from_raw(&raw, Some(9), Some(2));

        assert_eq!(token.start_offset, Some(9));
        assert_eq!(token.end_offset, None);
        assert_eq!(token.span(), None);
    }

    #[test]
    fn test_comment_kinds() {
        let raw = RawToken::new(KIND_LINE_COMMENT, "# memo", Span::new(0..6));
        assert!(Token::from_raw(&raw, None, None).is_comment());
    }
}
