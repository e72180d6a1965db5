//! Offset remaps between the representations of one program.
//!
//! Every normalization stage of the pipeline rewrites text, so an offset in
//! the stage's output has to be translated back into the stage's input. A
//! [`PositionMap`] is that translation; `None` means the offset has no
//! counterpart in the input (the text was synthesized by the stage).
//!
//! Maps compose forward with [`PositionMap::then`]: the prepared-text map
//! followed by the indentation map turns lexer offsets into offsets in the
//! author's file.
//!
//! ```
//! use kotoba_core::position::{IdentityMap, PositionMap, Shift};
//!
//! let map = IdentityMap.then(Shift::by(Some(10)));
//! assert_eq!(map.map(5), Some(15));
//! ```

/// A remap from offsets in a stage's output to offsets in its input.
pub trait PositionMap {
    /// Translate `offset`, or return `None` when it has no counterpart.
    fn map(&self, offset: usize) -> Option<usize>;

    /// Compose this map with `next`, applying `self` first.
    fn then<M>(self, next: M) -> Composed<Self, M>
    where
        Self: Sized,
        M: PositionMap,
    {
        Composed { first: self, next }
    }

    /// Map an optional offset, propagating `None`.
    fn map_opt(&self, offset: Option<usize>) -> Option<usize> {
        offset.and_then(|offset| self.map(offset))
    }
}

impl<M: PositionMap + ?Sized> PositionMap for &M {
    fn map(&self, offset: usize) -> Option<usize> {
        (**self).map(offset)
    }
}

impl<M: PositionMap + ?Sized> PositionMap for Box<M> {
    fn map(&self, offset: usize) -> Option<usize> {
        (**self).map(offset)
    }
}

/// The map that changes nothing; the neutral element of composition.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMap;

impl PositionMap for IdentityMap {
    fn map(&self, offset: usize) -> Option<usize> {
        Some(offset)
    }
}

/// Two maps applied one after the other.
#[derive(Debug, Clone)]
pub struct Composed<A, B> {
    first: A,
    next: B,
}

impl<A: PositionMap, B: PositionMap> PositionMap for Composed<A, B> {
    fn map(&self, offset: usize) -> Option<usize> {
        self.first.map(offset).and_then(|offset| self.next.map(offset))
    }
}

/// A constant displacement, used to place text that was lexed on its own
/// (embedded code) back at its position in the enclosing file.
///
/// A shift built from `None` maps everything to `None`: the enclosing text
/// itself has no known position.
#[derive(Debug, Clone, Copy)]
pub struct Shift(Option<usize>);

impl Shift {
    /// Shift by `base`, or erase every position when `base` is unknown.
    pub fn by(base: Option<usize>) -> Self {
        Self(base)
    }
}

impl PositionMap for Shift {
    fn map(&self, offset: usize) -> Option<usize> {
        self.0.map(|base| base + offset)
    }
}

/// An ordered chain of heterogeneous stage maps, applied front to back.
///
/// Used when the set of stages is only known at run time.
#[derive(Default)]
pub struct MapChain<'a> {
    stages: Vec<Box<dyn PositionMap + 'a>>,
}

impl<'a> MapChain<'a> {
    /// Create an empty chain, which behaves as the identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage to the end of the chain.
    pub fn push(mut self, stage: impl PositionMap + 'a) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Number of stages in the chain.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl PositionMap for MapChain<'_> {
    fn map(&self, offset: usize) -> Option<usize> {
        self.stages
            .iter()
            .try_fold(offset, |offset, stage| stage.map(offset))
    }
}
