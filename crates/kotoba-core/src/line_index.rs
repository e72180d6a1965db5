//! Conversion between byte offsets and line/column pairs.

/// A zero-based line and column.
///
/// Columns count UTF-16 code units, which is what host-language source map
/// consumers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

/// Precomputed line starts of a text for offset lookups.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
    }

    /// Number of lines, counting a trailing empty line after a final newline.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset at which `line` starts.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Zero-based line containing `offset`. Offsets past the end clamp to the
    /// last line.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    /// Line and column of `offset`, clamped to the text length.
    pub fn line_column(&self, offset: usize) -> LineColumn {
        let offset = self.floor_char_boundary(offset.min(self.text.len()));
        let line = self.line_of(offset);
        let start = self.line_starts[line];
        let column = self.text[start..offset].encode_utf16().count();
        LineColumn { line, column }
    }

    fn floor_char_boundary(&self, mut offset: usize) -> usize {
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_starts() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_start(1), Some(3));
        assert_eq!(index.line_start(2), Some(6));
        assert_eq!(index.line_start(3), None);
    }

    #[test]
    fn test_line_column_ascii() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.line_column(0), LineColumn { line: 0, column: 0 });
        assert_eq!(index.line_column(2), LineColumn { line: 0, column: 2 });
        assert_eq!(index.line_column(3), LineColumn { line: 1, column: 0 });
        assert_eq!(index.line_column(99), LineColumn { line: 1, column: 2 });
    }

    #[test]
    fn test_line_column_counts_utf16_units() {
        // 「あ」 is three bytes but one UTF-16 unit; 🌴 is four bytes and two units.
        let index = LineIndex::new("あ🌴x");
        assert_eq!(index.line_column(3), LineColumn { line: 0, column: 1 });
        assert_eq!(index.line_column(7), LineColumn { line: 0, column: 3 });
    }
}
