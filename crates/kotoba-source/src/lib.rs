//! Kotoba Source Normalization
//!
//! The text passes that run before tokenization, each paired with the
//! [`PositionMap`](kotoba_core::position::PositionMap) that undoes it:
//!
//! - [`fold`]: full-width to half-width character folding
//! - [`prepare`]: the chunked *prepare* stage and its [`TokenizationMap`]
//! - [`scanner`]: the literal-boundary scanner that finds strings and comments
//! - [`indent`]: the indentation normalizer and its [`IndentMap`]
//!
//! [`TokenizationMap`]: prepare::TokenizationMap
//! [`IndentMap`]: indent::IndentMap

pub mod fold;
pub mod indent;
pub mod prepare;
pub mod scanner;

pub use indent::{IndentMap, IndentOutput, LineEdit, LineEditKind, convert};
pub use prepare::{Chunk, Prepare, PreparedText, TokenizationMap, WidthFold};
