//! Literal-boundary scanning.
//!
//! Indentation rewriting works line by line, so a newline inside a string or
//! a comment must not be mistaken for a line break. [`scan`] finds every
//! literal span and [`protect_newlines`] hides the newlines inside them behind
//! a [`sentinel`] that cannot occur in the text.
//!
//! Openers are matched on the raw character (comment markers after folding);
//! closers are always compared after folding. An opener without a closer
//! extends to the end of the text.

use serde::Serialize;

use crate::fold::fold_char;

/// What a literal span contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralKind {
    Quoted,
    LineComment,
    BlockComment,
}

/// A literal span in byte offsets, delimiters included.
///
/// A line comment ends before its terminating newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LiteralSpan {
    pub start: usize,
    pub end: usize,
    pub kind: LiteralKind,
}

impl LiteralSpan {
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

fn quote_closer(c: char) -> Option<&'static str> {
    let closer = match c {
        '"' => "\"",
        '\'' => "'",
        '「' => "」",
        '『' => "』",
        '“' => "”",
        '{' => "}",
        '｛' => "｝",
        '[' => "]",
        '🌴' => "🌴",
        '🌿' => "🌿",
        '【' => "】",
        _ => return None,
    };
    Some(closer)
}

/// Whether the folded characters at `index` spell `pattern`.
fn folded_at(chars: &[(usize, char)], index: usize, pattern: &[char]) -> bool {
    chars.len() >= index + pattern.len()
        && chars[index..index + pattern.len()]
            .iter()
            .zip(pattern)
            .all(|(&(_, c), &p)| fold_char(c) == p)
}

/// Find every string and comment span of `source`, in order.
pub fn scan(source: &str) -> Vec<LiteralSpan> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let offset_at = |index: usize| chars.get(index).map_or(source.len(), |&(offset, _)| offset);
    let mut spans = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        let (kind, closer, opener_len) = if let Some(closer) = quote_closer(c) {
            (LiteralKind::Quoted, closer, 1)
        } else if fold_char(c) == '#' {
            (LiteralKind::LineComment, "\n", 1)
        } else if folded_at(&chars, i, &['/', '/']) {
            (LiteralKind::LineComment, "\n", 2)
        } else if folded_at(&chars, i, &['/', '*']) {
            (LiteralKind::BlockComment, "*/", 2)
        } else {
            i += 1;
            continue;
        };

        let closer: Vec<char> = closer.chars().map(fold_char).collect();
        i += opener_len;
        let mut end = source.len();
        while i < chars.len() {
            if folded_at(&chars, i, &closer) {
                if kind != LiteralKind::LineComment {
                    i += closer.len();
                }
                end = offset_at(i);
                break;
            }
            i += 1;
        }
        spans.push(LiteralSpan { start, end, kind });
    }

    spans
}

/// A marker that does not occur in `source`: one more `0` than the longest
/// run of `0`s in the text, followed by `1`.
pub fn sentinel(source: &str) -> String {
    let longest = source
        .split(|c| c != '0')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let mut marker = "0".repeat(longest + 1);
    marker.push('1');
    marker
}

/// Replace every newline inside a literal span with `sentinel`.
pub fn protect_newlines(source: &str, spans: &[LiteralSpan], sentinel: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut spans = spans.iter().peekable();

    for (offset, c) in source.char_indices() {
        while spans.next_if(|span| span.end <= offset).is_some() {}
        let inside = spans.peek().is_some_and(|span| span.contains(offset));
        if c == '\n' && inside {
            out.push_str(sentinel);
        } else {
            out.push(c);
        }
    }

    out
}
