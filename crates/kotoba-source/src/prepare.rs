//! The *prepare* stage: character folding with a per-chunk source offset.
//!
//! A [`Prepare`] implementation turns normalized source text into
//! [`PreparedText`], a sequence of [`Chunk`]s whose concatenation is what the
//! lexer sees. Each chunk remembers where it came from, which is enough to
//! build the [`TokenizationMap`] from prepared offsets back to source
//! offsets.

use kotoba_core::position::PositionMap;
use serde::{Deserialize, Serialize};

use crate::fold::fold_char;

/// A piece of prepared text and the source offset it was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_offset: usize,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source_offset: usize) -> Self {
        Self {
            text: text.into(),
            source_offset,
        }
    }
}

/// The output of a prepare stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedText {
    chunks: Vec<Chunk>,
    source_len: usize,
}

impl PreparedText {
    /// Wrap `chunks` produced from a source text of `source_len` bytes.
    pub fn new(chunks: Vec<Chunk>, source_len: usize) -> Self {
        Self { chunks, source_len }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// The prepared text handed to the lexer.
    pub fn text(&self) -> String {
        self.chunks.iter().map(|chunk| chunk.text.as_str()).collect()
    }

    /// The map from prepared offsets back to source offsets.
    pub fn map(&self) -> TokenizationMap {
        TokenizationMap::new(&self.chunks, self.source_len)
    }
}

/// A pass producing prepared text.
pub trait Prepare {
    fn prepare(&self, source: &str) -> PreparedText;
}

/// The default prepare stage: [`fold_char`] applied to every character.
///
/// Unchanged runs share one chunk; every folded character gets a chunk of
/// its own so offsets inside it clamp to the character's start.
#[derive(Debug, Clone, Copy, Default)]
pub struct WidthFold;

impl Prepare for WidthFold {
    fn prepare(&self, source: &str) -> PreparedText {
        let mut chunks = Vec::new();
        let mut run_start = 0;

        for (offset, c) in source.char_indices() {
            let folded = fold_char(c);
            if folded == c {
                continue;
            }
            if run_start < offset {
                chunks.push(Chunk::new(&source[run_start..offset], run_start));
            }
            chunks.push(Chunk::new(folded.to_string(), offset));
            run_start = offset + c.len_utf8();
        }
        if run_start < source.len() {
            chunks.push(Chunk::new(&source[run_start..], run_start));
        }

        PreparedText::new(chunks, source.len())
    }
}

/// Maps offsets in prepared text back to the text the chunks came from.
///
/// A chunk whose text has the same length as its source maps offset for
/// offset. A chunk that was rewritten (folded or expanded) only maps its
/// two ends: its start maps to the start of its source and every offset past
/// that maps to the end of its source. Mapped offsets therefore always land
/// on a boundary of the source text.
#[derive(Debug, Clone)]
pub struct TokenizationMap {
    /// Prepared-text start of each chunk.
    starts: Vec<usize>,
    /// Source range each chunk was produced from.
    sources: Vec<(usize, usize)>,
    /// Whether the chunk text differs in length from its source range.
    rewritten: Vec<bool>,
    prepared_len: usize,
    source_len: usize,
}

impl TokenizationMap {
    pub fn new(chunks: &[Chunk], source_len: usize) -> Self {
        let mut starts = Vec::with_capacity(chunks.len());
        let mut sources = Vec::with_capacity(chunks.len());
        let mut rewritten = Vec::with_capacity(chunks.len());
        let mut prepared_len = 0;
        for (index, chunk) in chunks.iter().enumerate() {
            let source_end = chunks
                .get(index + 1)
                .map_or(source_len, |next| next.source_offset)
                .max(chunk.source_offset);
            starts.push(prepared_len);
            sources.push((chunk.source_offset, source_end));
            rewritten.push(chunk.text.len() != source_end - chunk.source_offset);
            prepared_len += chunk.text.len();
        }
        Self {
            starts,
            sources,
            rewritten,
            prepared_len,
            source_len,
        }
    }
}

impl PositionMap for TokenizationMap {
    fn map(&self, offset: usize) -> Option<usize> {
        if offset > self.prepared_len {
            return None;
        }
        // Last chunk starting at or before `offset`.
        let index = self.starts.partition_point(|&start| start <= offset);
        let Some(index) = index.checked_sub(1) else {
            return Some(offset.min(self.source_len));
        };
        let (source_start, source_end) = self.sources[index];
        let into = offset - self.starts[index];
        let mapped = if !self.rewritten[index] {
            source_start + into
        } else if into == 0 {
            source_start
        } else {
            source_end
        };
        Some(mapped.min(source_end))
    }
}
