//! Output fragments that remember where they came from.
//!
//! The generator never builds output strings directly. It builds a tree of
//! [`CodeFragment`]s, each optionally tagged with the [`Origin`] of the AST
//! node it was generated for. [`CodeFragment::flatten`] concatenates the tree
//! and reports, for every literal piece, the output range it landed in and
//! the source range it stands for.
//!
//! Provenance is inherited lazily: a fragment without an origin takes the
//! nearest ancestor's origin at flatten time, so a fragment can be built
//! before it is known where it will be attached. An explicit origin is never
//! overwritten. The file name is inherited the same way.
//!
//! ```
//! use kotoba_codegen::fragment::{CodeFragment, Origin};
//!
//! let child = CodeFragment::new().push("a").push("b");
//! let root = CodeFragment::with_origin(Origin::new(Some(0), Some(3)))
//!     .push("(")
//!     .push(child)
//!     .push(")");
//! assert_eq!(root.flatten().code, "(ab)");
//! ```

use std::ops::Range;

use kotoba_core::ast::Node;
use serde::Serialize;

/// The source range an output fragment stands for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl Origin {
    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// The source range of `node`, possibly unknown at either end.
    pub fn of(node: &Node) -> Self {
        Self::new(node.info.start_offset, node.info.end_offset)
    }
}

/// One element of a fragment.
#[derive(Debug, Clone)]
pub enum Piece {
    Text(String),
    Fragment(CodeFragment),
}

impl From<&str> for Piece {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Piece {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for Piece {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

impl From<usize> for Piece {
    fn from(value: usize) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<CodeFragment> for Piece {
    fn from(fragment: CodeFragment) -> Self {
        Self::Fragment(fragment)
    }
}

/// A node of the output tree.
#[derive(Debug, Clone, Default)]
pub struct CodeFragment {
    pieces: Vec<Piece>,
    origin: Option<Origin>,
    file: Option<String>,
}

/// Build a [`CodeFragment`] from a list of pieces.
///
/// `fragment!(node => [a, b])` tags the fragment with the node's origin and
/// file; `fragment!([a, b])` leaves both to be inherited.
#[macro_export]
macro_rules! fragment {
    ([$($piece:expr),* $(,)?]) => {{
        #[allow(unused_mut)]
        let mut fragment = $crate::fragment::CodeFragment::new();
        $( fragment.append($piece); )*
        fragment
    }};
    ($node:expr => [$($piece:expr),* $(,)?]) => {{
        #[allow(unused_mut)]
        let mut fragment = $crate::fragment::CodeFragment::from_node($node);
        $( fragment.append($piece); )*
        fragment
    }};
}

impl CodeFragment {
    /// An empty fragment without origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty fragment with an explicit origin.
    pub fn with_origin(origin: Origin) -> Self {
        Self {
            origin: Some(origin),
            ..Self::default()
        }
    }

    /// An empty fragment standing for `node`.
    pub fn from_node(node: &Node) -> Self {
        Self {
            pieces: Vec::new(),
            origin: Some(Origin::of(node)),
            file: node.info.file.clone(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn origin(&self) -> Option<Origin> {
        self.origin
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Append a piece, builder style.
    pub fn push(mut self, piece: impl Into<Piece>) -> Self {
        self.append(piece);
        self
    }

    /// Append a piece in place.
    pub fn append(&mut self, piece: impl Into<Piece>) {
        self.pieces.push(piece.into());
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// A fragment holding these pieces with `separator` between each pair.
    pub fn join(self, separator: &str) -> Self {
        let count = self.pieces.len();
        let mut joined = Self {
            pieces: Vec::with_capacity(count * 2),
            origin: self.origin,
            file: self.file,
        };
        for (index, piece) in self.pieces.into_iter().enumerate() {
            joined.pieces.push(piece);
            if index + 1 < count {
                joined.append(separator);
            }
        }
        joined
    }

    /// Check if the fragment produces no text.
    pub fn is_empty(&self) -> bool {
        self.pieces.iter().all(|piece| match piece {
            Piece::Text(text) => text.is_empty(),
            Piece::Fragment(fragment) => fragment.is_empty(),
        })
    }

    /// Concatenate the tree into text plus one map entry per literal piece.
    pub fn flatten(&self) -> Flattened {
        let mut flattened = Flattened::default();
        self.flatten_into(None, None, &mut flattened);
        flattened
    }

    fn flatten_into(
        &self,
        inherited_origin: Option<Origin>,
        inherited_file: Option<&str>,
        out: &mut Flattened,
    ) {
        let origin = self.origin.or(inherited_origin);
        let file = self.file.as_deref().or(inherited_file);
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => {
                    let start = out.code.len();
                    out.code.push_str(text);
                    out.source_map.push(SourceMapEntry {
                        file: file.map(str::to_string),
                        source: origin.unwrap_or_default(),
                        output: start..out.code.len(),
                    });
                }
                Piece::Fragment(fragment) => fragment.flatten_into(origin, file, out),
            }
        }
    }
}

/// Where one literal piece of output came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMapEntry {
    pub file: Option<String>,
    pub source: Origin,
    pub output: Range<usize>,
}

/// Flattened output text and its position map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Flattened {
    pub code: String,
    pub source_map: Vec<SourceMapEntry>,
}

impl Flattened {
    /// The entry covering output offset `offset`, if any.
    pub fn entry_at(&self, offset: usize) -> Option<&SourceMapEntry> {
        self.source_map
            .iter()
            .find(|entry| entry.output.contains(&offset))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn origin(start: usize, end: usize) -> Origin {
        Origin::new(Some(start), Some(end))
    }

    #[test]
    fn test_children_inherit_at_flatten_time() {
        let child = CodeFragment::new().push("a").push("b").push("c");
        let root = CodeFragment::with_origin(origin(0, 10))
            .push("--")
            .push(child)
            .push("==");
        let flattened = root.flatten();

        assert_eq!(flattened.code, "--abc==");
        assert!(flattened.source_map.iter().all(|e| e.source == origin(0, 10)));
    }

    #[test]
    fn test_child_origin_covers_only_its_own_pieces() {
        let child = CodeFragment::with_origin(origin(3, 7)).push("a").push("b").push("c");
        let root = CodeFragment::with_origin(origin(0, 10))
            .push("--")
            .push(child)
            .push("==");
        let flattened = root.flatten();

        assert_eq!(flattened.code, "--abc==");
        let entries: Vec<(Range<usize>, Origin)> = flattened
            .source_map
            .iter()
            .map(|e| (e.output.clone(), e.source))
            .collect();
        assert_eq!(
            entries,
            [
                (0..2, origin(0, 10)),
                (2..3, origin(3, 7)),
                (3..4, origin(3, 7)),
                (4..5, origin(3, 7)),
                (5..7, origin(0, 10)),
            ]
        );
    }

    #[test]
    fn test_explicit_origin_is_kept() {
        let child = CodeFragment::with_origin(origin(4, 5)).push("x");
        let root = CodeFragment::with_origin(origin(0, 9))
            .push("[")
            .push(child)
            .push("]")
            .with_file("main.kotoba");
        let map = root.flatten().source_map;

        assert_eq!(map[0].source, origin(0, 9));
        assert_eq!(map[1].source, origin(4, 5));
        assert_eq!(map[1].output, 1..2);
        assert_eq!(map[1].file.as_deref(), Some("main.kotoba"));
    }

    #[test]
    fn test_unknown_origin_is_not_replaced() {
        let child = CodeFragment::with_origin(Origin::default()).push("x");
        let root = CodeFragment::with_origin(origin(0, 9)).push(child);

        assert_eq!(root.flatten().source_map[0].source, Origin::default());
    }

    #[test]
    fn test_join() {
        let joined = CodeFragment::new().push("1").push("2").push("3").join(",");
        assert_eq!(joined.flatten().code, "1,2,3");
        assert!(CodeFragment::new().join(",").is_empty());
    }

    #[test]
    fn test_is_empty_looks_through_children() {
        let nested = CodeFragment::new().push("").push(CodeFragment::new().push(""));
        assert!(nested.is_empty());
        assert!(!nested.push(CodeFragment::new().push(";")).is_empty());
    }

    #[test]
    fn test_macro_builds_pieces() {
        let node = Node::word("A").with_span(kotoba_core::span::Span::new(2..3));
        let inner = fragment!(["x", 1usize]);
        let outer = fragment!(&node => ["(", inner, ")"]);
        let flattened = outer.flatten();

        assert_eq!(flattened.code, "(x1)");
        assert_eq!(flattened.entry_at(1).map(|e| e.source), Some(origin(2, 3)));
    }

    fn tree() -> impl Strategy<Value = CodeFragment> {
        let leaf = "[a-z;]{0,4}".prop_map(|text| CodeFragment::new().push(text));
        leaf.prop_recursive(4, 32, 4, |inner| {
            (prop::option::of(0usize..50), prop::collection::vec(inner, 0..4)).prop_map(
                |(start, children)| {
                    let origin = start.map(|start| Origin::new(Some(start), Some(start + 1)));
                    children.into_iter().fold(
                        origin.map_or_else(CodeFragment::new, CodeFragment::with_origin),
                        |fragment, child| fragment.push(child),
                    )
                },
            )
        })
    }

    proptest! {
        #[test]
        fn prop_entries_tile_the_output(fragment in tree()) {
            let flattened = fragment.flatten();
            let mut next = 0;
            for entry in &flattened.source_map {
                prop_assert_eq!(entry.output.start, next);
                next = entry.output.end;
            }
            prop_assert_eq!(next, flattened.code.len());
        }
    }
}
