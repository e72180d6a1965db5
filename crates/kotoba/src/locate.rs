//! The Error Locator: a non-empty source span for a failing token.
//!
//! Tokens synthesized by normalization have no position of their own. When
//! the parser fails on one, the span is borrowed from the nearest positioned
//! neighbours instead.

use kotoba_core::{span::Span, token::Token};

/// The span to report for a failure at token `index` of `tokens`.
///
/// The result is never empty, even for empty `source`. An `index` past the
/// end of `tokens` names the last token.
pub fn locate(tokens: &[Token], index: usize, source: &str) -> Span {
    let Some(last) = tokens.len().checked_sub(1) else {
        return widen(0, source.len(), source);
    };
    let index = index.min(last);
    let token = &tokens[index];

    let start = token
        .start_offset
        .or_else(|| {
            tokens[..index]
                .iter()
                .rev()
                .find_map(|left| left.end_offset.or(left.start_offset))
        })
        .unwrap_or(0);
    let end = token
        .end_offset
        .or_else(|| {
            tokens[index + 1..]
                .iter()
                .find_map(|right| right.start_offset.or(right.end_offset))
        })
        .unwrap_or(source.len());

    widen(start.min(end), start.max(end), source)
}

/// Widen an empty range by one character: forward at offset 0, else backward.
fn widen(start: usize, end: usize, source: &str) -> Span {
    if start < end {
        return Span::new(start..end);
    }
    if start == 0 {
        let width = source.chars().next().map_or(1, char::len_utf8);
        return Span::new(0..width);
    }
    let width = source
        .get(..start)
        .and_then(|before| before.chars().next_back())
        .map_or(1, char::len_utf8);
    Span::new(start - width..end)
}

#[cfg(test)]
mod tests {
    use kotoba_core::token::RawToken;
    use proptest::prelude::*;

    use super::*;

    fn token(start: Option<usize>, end: Option<usize>) -> Token {
        let raw = RawToken::new("word", "x", Span::new(0..1));
        Token::from_raw(&raw, start, end)
    }

    #[test]
    fn test_own_offsets_are_used() {
        let tokens = [token(Some(0), Some(1)), token(Some(2), Some(5))];
        assert_eq!(locate(&tokens, 1, "A B   "), Span::new(2..5));
    }

    #[test]
    fn test_synthetic_token_borrows_neighbours() {
        let tokens = [
            token(Some(0), Some(3)),
            token(None, None),
            token(Some(7), Some(9)),
        ];
        assert_eq!(locate(&tokens, 1, "0123456789"), Span::new(3..7));
    }

    #[test]
    fn test_no_neighbours_fall_back_to_source_bounds() {
        let tokens = [token(None, None)];
        assert_eq!(locate(&tokens, 0, "abc"), Span::new(0..3));
    }

    #[test]
    fn test_empty_range_widens_backward() {
        let tokens = [token(Some(0), Some(4)), token(None, None), token(Some(4), Some(5))];
        assert_eq!(locate(&tokens, 1, "abcdef"), Span::new(3..4));
    }

    #[test]
    fn test_widening_respects_multibyte_characters() {
        let tokens = [token(Some(3), Some(3))];
        assert_eq!(locate(&tokens, 0, "あい"), Span::new(0..3));
        let tokens = [token(Some(0), Some(0))];
        assert_eq!(locate(&tokens, 0, "あい"), Span::new(0..3));
    }

    #[test]
    fn test_empty_source_and_tokens() {
        assert_eq!(locate(&[], 0, ""), Span::new(0..1));
    }

    #[test]
    fn test_index_past_end_uses_last_token() {
        let tokens = [token(Some(0), Some(1)), token(Some(2), Some(3))];
        assert_eq!(locate(&tokens, 10, "abc"), Span::new(2..3));
    }

    fn offset() -> impl Strategy<Value = Option<usize>> {
        prop::option::of(0usize..64)
    }

    proptest! {
        #[test]
        fn prop_span_is_never_empty(
            offsets in prop::collection::vec((offset(), offset()), 0..12),
            index in 0usize..16,
            source_len in 0usize..64,
        ) {
            let tokens: Vec<Token> = offsets
                .into_iter()
                .map(|(start, end)| token(start, end))
                .collect();
            let source = "x".repeat(source_len);
            let span = locate(&tokens, index, &source);
            prop_assert!(span.start() < span.end());
        }
    }
}
