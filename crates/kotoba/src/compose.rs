//! Token decoration: from prepared-text offsets to original-source offsets.
//!
//! A program passes through two rewriting stages before the lexer sees it:
//! the indentation normalizer and the prepare stage. The lexer reports
//! positions in the text of the last stage. Each stage's [`PositionMap`] is
//! composed, prepare map first, and applied to both ends of every token.
//!
//! Embedded code tokens are lexed on their own with one more stage, a shift to
//! where they sit in the enclosing file, and spliced in place of the token
//! that carried them.

use log::{debug, trace};

use kotoba_core::{
    position::{MapChain, PositionMap, Shift},
    span::Span,
    token::{RawToken, Token},
};
use kotoba_source::{Prepare, indent};

use crate::{
    error::LexError,
    interface::{LexFailure, Lexer},
};

/// Decorate `raw` tokens through `map`.
///
/// An end without a counterpart leaves the decorated field `None`.
pub fn decorate(raw: &[RawToken], map: &impl PositionMap) -> Vec<Token> {
    raw.iter()
        .map(|token| {
            let span = token.prepared_span();
            Token::from_raw(token, map.map(span.start()), map.map(span.end()))
        })
        .collect()
}

/// Map a lexer failure back to the original source.
pub fn lex_error(failure: LexFailure, map: &impl PositionMap) -> LexError {
    let original = match (
        map.map(failure.prepared.start()),
        map.map(failure.prepared.end()),
    ) {
        (Some(start), Some(end)) if start <= end => Some(Span::new(start..end)),
        _ => None,
    };
    LexError {
        message: failure.message,
        prepared: failure.prepared,
        original,
    }
}

/// Normalize, prepare and tokenize `code`, returning tokens positioned in `code`.
///
/// # Errors
///
/// Returns a [`LexError`] when the lexer rejects the prepared text.
pub fn tokenize(
    lexer: &dyn Lexer,
    prepare: &dyn Prepare,
    code: &str,
    line: usize,
    file: &str,
) -> Result<Vec<Token>, LexError> {
    tokenize_at(lexer, prepare, code, line, file, None)
}

/// Tokenize `code`, moving the tokens into the enclosing file by `shift`.
///
/// A whole file passes no shift. Embedded code passes the offset of its
/// carrier token.
fn tokenize_at(
    lexer: &dyn Lexer,
    prepare: &dyn Prepare,
    code: &str,
    line: usize,
    file: &str,
    shift: Option<Shift>,
) -> Result<Vec<Token>, LexError> {
    let indented = indent::convert(code);
    let prepared = prepare.prepare(&indented.code);
    let indent_map = indented.map(code);
    let mut map = MapChain::new().push(prepared.map()).push(&indent_map);
    if let Some(shift) = shift {
        map = map.push(shift);
    }

    debug!(
        inserted = indented.inserted_lines.len(),
        deleted = indented.deleted_lines.len(),
        stages = map.len();
        "Source normalized"
    );

    let raw = lexer
        .tokenize(&prepared.text(), file, line)
        .map_err(|failure| lex_error(failure, &map))?;
    Ok(decorate(&raw, &map))
}

/// Comment tokens of `tokens`, copied before the lexer's finishing pass drops them.
pub fn comments(tokens: &[Token]) -> Vec<Token> {
    tokens.iter().filter(|token| token.is_comment()).cloned().collect()
}

/// Embedded code nested deeper than this is rejected.
pub const EMBED_DEPTH_LIMIT: usize = 16;

/// Replace every embedded code token by the tokens of the code it carries.
///
/// Comments of the embedded code are appended to `collected`. Code nested in
/// embedded code is expanded too, up to [`EMBED_DEPTH_LIMIT`] levels.
///
/// # Errors
///
/// Returns the first [`LexError`] of an embedded program, or one naming the
/// carrier token when nesting exceeds the limit.
pub fn splice_embedded(
    lexer: &dyn Lexer,
    prepare: &dyn Prepare,
    tokens: Vec<Token>,
    collected: &mut Vec<Token>,
) -> Result<Vec<Token>, LexError> {
    expand(lexer, prepare, tokens, collected, 0)
}

fn expand(
    lexer: &dyn Lexer,
    prepare: &dyn Prepare,
    tokens: Vec<Token>,
    collected: &mut Vec<Token>,
    depth: usize,
) -> Result<Vec<Token>, LexError> {
    let mut expanded = Vec::with_capacity(tokens.len());
    for parent in tokens {
        if !parent.is_embedded_code() {
            expanded.push(parent);
            continue;
        }
        if depth >= EMBED_DEPTH_LIMIT {
            return Err(LexError {
                message: format!("埋め込みコードの入れ子が{EMBED_DEPTH_LIMIT}段を超えました"),
                prepared: Span::new(0..parent.value.len()),
                original: parent.span(),
            });
        }

        let children = tokenize_at(
            lexer,
            prepare,
            &parent.value,
            parent.line,
            &parent.file,
            Some(Shift::by(parent.start_offset)),
        )?;
        trace!(line = parent.line, depth, tokens = children.len(); "Embedded code tokenized");

        collected.extend(comments(&children));
        let children = lexer.finish(children, false);
        expanded.extend(expand(lexer, prepare, children, collected, depth + 1)?);
    }
    Ok(expanded)
}
