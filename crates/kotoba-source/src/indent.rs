//! Indentation-based blocks.
//!
//! A program that opts in with one of the [`DIRECTIVES`] may delimit blocks
//! by indentation instead of writing the block terminator itself. [`convert`]
//! rewrites such a program into the terminator form and records every line
//! it inserted or removed, which [`IndentMap`] uses to translate offsets in
//! the rewritten text back to the author's text.
//!
//! ```
//! use kotoba_source::indent::convert;
//!
//! let output = convert("!インデント構文\nもしA=1ならば\n  1を表示\n");
//! assert_eq!(output.code, "!インデント構文\nもしA=1ならば\n  1を表示\nここまで");
//! ```

use kotoba_core::{line_index::LineIndex, position::PositionMap};
use log::{debug, trace};
use serde::Serialize;

use crate::scanner::{protect_newlines, scan, sentinel};

/// Markers that switch indentation blocks on.
pub const DIRECTIVES: [&str; 2] = ["!インデント構文", "!ここまでだるい"];

/// The block terminator inserted when a level closes.
pub const TERMINATOR: &str = "ここまで";

/// A line that continues the enclosing conditional instead of ending it.
pub const ELSE_KEYWORD: &str = "違えば";

/// Directives are only honored within this many leading lines.
const DIRECTIVE_SCAN_LINES: usize = 30;

/// Number of leading characters compared against the directives.
const DIRECTIVE_WIDTH: usize = 8;

/// Whether a recorded line was synthesized or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEditKind {
    Inserted,
    Deleted,
}

/// One structural change made by [`convert`].
///
/// For an insertion `line_number` is the zero-based output line holding the
/// synthetic text. For a deletion it is the output line that followed the
/// removed line. `length` is the line's byte length without its newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineEdit {
    pub line_number: usize,
    pub kind: LineEditKind,
    pub length: usize,
}

impl LineEdit {
    pub fn inserted(line_number: usize, length: usize) -> Self {
        Self {
            line_number,
            kind: LineEditKind::Inserted,
            length,
        }
    }

    pub fn deleted(line_number: usize, length: usize) -> Self {
        Self {
            line_number,
            kind: LineEditKind::Deleted,
            length,
        }
    }

    /// Bytes the line occupied, newline included.
    fn footprint(&self) -> usize {
        self.length + 1
    }
}

/// The rewritten program and the edits that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndentOutput {
    pub code: String,
    pub inserted_lines: Vec<LineEdit>,
    pub deleted_lines: Vec<LineEdit>,
}

impl IndentOutput {
    fn unchanged(source: &str) -> Self {
        Self {
            code: source.to_string(),
            inserted_lines: Vec::new(),
            deleted_lines: Vec::new(),
        }
    }

    /// The offset map from [`code`](Self::code) back to `original`.
    pub fn map<'a>(&'a self, original: &str) -> IndentMap<'a> {
        IndentMap::new(
            original,
            &self.code,
            &self.inserted_lines,
            &self.deleted_lines,
        )
    }
}

/// Whether any of the first lines starts with an indentation directive.
pub fn has_directive(source: &str) -> bool {
    source.split('\n').take(DIRECTIVE_SCAN_LINES).any(|line| {
        let head: String = line.chars().take(DIRECTIVE_WIDTH).collect();
        DIRECTIVES.contains(&head.replacen('！', "!", 1).as_str())
    })
}

/// Indentation depth of `line`.
///
/// A space counts 1, an ideographic space or a middle dot 2, a tab 4.
pub fn indent_width(line: &str) -> usize {
    line.chars()
        .map_while(|c| match c {
            ' ' => Some(1),
            '\u{3000}' | '・' => Some(2),
            '\t' => Some(4),
            _ => None,
        })
        .sum()
}

fn terminator_line(depth: usize) -> String {
    format!("{}{TERMINATOR}", " ".repeat(depth))
}

/// Rewrite indentation blocks into explicit terminators.
///
/// Without a directive the source is returned unchanged with no edits.
/// Newlines inside strings and comments never open or close a block, and
/// the conversion never fails: an unterminated literal simply runs to the
/// end of the text.
pub fn convert(source: &str) -> IndentOutput {
    if !has_directive(source) {
        return IndentOutput::unchanged(source);
    }

    let marker = sentinel(source);
    let protected = protect_newlines(source, &scan(source), &marker);

    let mut lines: Vec<String> = Vec::new();
    let mut inserted = Vec::new();
    let mut deleted = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut depth = 0;

    let mut close = |lines: &mut Vec<String>, level: usize| {
        let line = terminator_line(level);
        inserted.push(LineEdit::inserted(lines.len(), line.len()));
        lines.push(line);
    };

    for line in protected.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            deleted.push(LineEdit::deleted(lines.len(), line.len()));
            continue;
        }

        let width = indent_width(line);
        if width > depth {
            stack.push(depth);
        } else if width < depth {
            while let Some(level) = stack.pop() {
                if level > width {
                    close(&mut lines, level);
                    continue;
                }
                if level == width {
                    if trimmed != ELSE_KEYWORD {
                        close(&mut lines, level);
                    }
                } else {
                    // A dedent to a depth that was never opened.
                    stack.push(level);
                }
                break;
            }
        }
        depth = width;
        lines.push(line.to_string());
    }
    while let Some(level) = stack.pop() {
        close(&mut lines, level);
    }

    // Lines holding protected newlines become several lines again; every
    // edit below them moves down accordingly.
    let mut shift_before = Vec::with_capacity(lines.len() + 1);
    let mut shift = 0;
    for line in &lines {
        shift_before.push(shift);
        shift += line.matches(marker.as_str()).count();
    }
    shift_before.push(shift);
    let relocate = |edit: &mut LineEdit| {
        let index = edit.line_number.min(lines.len());
        edit.line_number += shift_before[index];
    };
    inserted.iter_mut().for_each(relocate);
    deleted.iter_mut().for_each(relocate);

    let code = lines.join("\n").replace(marker.as_str(), "\n");
    debug!(
        inserted = inserted.len(),
        deleted = deleted.len();
        "Indentation blocks converted"
    );
    trace!(code:?; "Converted source");

    IndentOutput {
        code,
        inserted_lines: inserted,
        deleted_lines: deleted,
    }
}

/// Maps offsets in converted text back to the original text.
///
/// Offsets on inserted lines have no counterpart. Any other offset moves by
/// the bytes of the inserted lines above it and the deleted lines before it.
#[derive(Debug, Clone)]
pub struct IndentMap<'a> {
    lines: LineIndex<'a>,
    deltas: Vec<Option<isize>>,
    converted_len: usize,
    original_len: usize,
}

impl<'a> IndentMap<'a> {
    pub fn new(
        original: &str,
        converted: &'a str,
        inserted: &[LineEdit],
        deleted: &[LineEdit],
    ) -> Self {
        let lines = LineIndex::new(converted);

        let mut inserted: Vec<&LineEdit> = inserted.iter().collect();
        inserted.sort_by_key(|edit| edit.line_number);
        let mut deleted: Vec<&LineEdit> = deleted.iter().collect();
        deleted.sort_by_key(|edit| edit.line_number);
        let mut inserted = inserted.into_iter().peekable();
        let mut deleted = deleted.into_iter().peekable();

        let mut delta: isize = 0;
        let mut deltas = Vec::with_capacity(lines.line_count());
        for line in 0..lines.line_count() {
            while let Some(edit) = deleted.next_if(|edit| edit.line_number <= line) {
                delta += edit.footprint() as isize;
            }
            match inserted.next_if(|edit| edit.line_number == line) {
                Some(edit) => {
                    deltas.push(None);
                    delta -= edit.footprint() as isize;
                }
                None => deltas.push(Some(delta)),
            }
        }

        Self {
            lines,
            deltas,
            converted_len: converted.len(),
            original_len: original.len(),
        }
    }

    /// Whether zero-based converted line `line` was synthesized.
    pub fn is_inserted_line(&self, line: usize) -> bool {
        matches!(self.deltas.get(line), Some(None))
    }
}

impl PositionMap for IndentMap<'_> {
    fn map(&self, offset: usize) -> Option<usize> {
        if offset > self.converted_len {
            return None;
        }
        let delta = self.deltas.get(self.lines.line_of(offset)).copied().flatten()?;
        offset
            .checked_add_signed(delta)
            .map(|mapped| mapped.min(self.original_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_detection() {
        assert!(has_directive("!インデント構文\nA"));
        assert!(has_directive("# memo\n！ここまでだるい\nA"));
        assert!(!has_directive("A\n !インデント構文"));
        assert!(!has_directive(&format!("{}!インデント構文", "\n".repeat(30))));
    }

    #[test]
    fn test_indent_width() {
        assert_eq!(indent_width("  A"), 2);
        assert_eq!(indent_width("\u{3000}A"), 2);
        assert_eq!(indent_width("・・A"), 4);
        assert_eq!(indent_width("\t A"), 5);
        assert_eq!(indent_width("A  "), 0);
    }

    #[test]
    fn test_without_directive_is_unchanged() {
        let source = "もしA=1ならば\n  1を表示\n\nここまで\n";
        let output = convert(source);

        assert_eq!(output.code, source);
        assert!(output.inserted_lines.is_empty());
        assert!(output.deleted_lines.is_empty());
    }

    #[test]
    fn test_if_block_closed_at_end() {
        let output = convert("!インデント構文\nもしA=1ならば\n  1を表示\n");

        assert_eq!(output.code, "!インデント構文\nもしA=1ならば\n  1を表示\nここまで");
        assert_eq!(output.inserted_lines, [LineEdit::inserted(3, 12)]);
        assert_eq!(output.deleted_lines, [LineEdit::deleted(3, 0)]);
    }

    #[test]
    fn test_nested_dedent_closes_inner_first() {
        let output = convert("!インデント構文\nA\n  B\n    C\nD");

        assert_eq!(
            output.code,
            "!インデント構文\nA\n  B\n    C\n  ここまで\nここまで\nD"
        );
        assert_eq!(
            output.inserted_lines,
            [LineEdit::inserted(4, 14), LineEdit::inserted(5, 12)]
        );
    }

    #[test]
    fn test_else_keeps_block_open() {
        let output = convert("!インデント構文\nもしAならば\n  X\n違えば\n  Y");

        assert_eq!(
            output.code,
            "!インデント構文\nもしAならば\n  X\n違えば\n  Y\nここまで"
        );
    }

    #[test]
    fn test_dedent_to_unopened_depth_keeps_line() {
        let output = convert("!インデント構文\nA\n    B\n  C\nD");

        assert_eq!(output.code, "!インデント構文\nA\n    B\n  C\nここまで\nD");
        assert_eq!(output.inserted_lines, [LineEdit::inserted(4, 12)]);
    }

    #[test]
    fn test_newline_in_string_does_not_close() {
        let output = convert("!インデント構文\nA\n  「x\nyz」を表示\nB");

        assert_eq!(
            output.code,
            "!インデント構文\nA\n  「x\nyz」を表示\nここまで\nB"
        );
        assert_eq!(output.inserted_lines, [LineEdit::inserted(4, 12)]);
    }

    #[test]
    fn test_map_skips_inserted_and_deleted_lines() {
        let original = "!インデント構文\nA\n\n  B\nC";
        let output = convert(original);
        assert_eq!(output.code, "!インデント構文\nA\n  B\nここまで\nC");

        let map = output.map(original);
        let b = output.code.find('B').unwrap();
        let c = output.code.find('C').unwrap();
        let terminator = output.code.find(TERMINATOR).unwrap();

        assert_eq!(map.map(0), Some(0));
        assert_eq!(map.map(b), original.find('B'));
        assert_eq!(map.map(c), original.find('C'));
        assert_eq!(map.map(terminator), None);
        assert!(map.is_inserted_line(3));
    }
}
