//! Kotoba Code Generation
//!
//! Turns a parsed program into JavaScript while keeping track of where every
//! piece of output came from.
//!
//! - [`fragment`]: the provenance-carrying output tree and its flattening
//! - [`standard`]: Source Map Revision 3 encoding of flattened positions
//! - [`scope`]: the compile-time scope model used to resolve identifiers
//! - [`generator`]: the AST walk producing fragments
//! - [`error`]: generation errors

pub mod error;
pub mod fragment;
pub mod generator;
pub mod scope;
pub mod standard;

pub use error::{GenError, GenErrorKind};
pub use fragment::{CodeFragment, Flattened, Origin, SourceMapEntry};
pub use generator::{GeneratorOptions, GlobalScope, generate};
pub use standard::StandardSourceMap;
