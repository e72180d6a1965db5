//! Kotoba Core Types
//!
//! This crate provides the types shared by every stage of the Kotoba
//! compiler. It includes:
//!
//! - **Spans**: byte ranges into source text ([`span::Span`])
//! - **Diagnostics**: structured errors with codes and labels ([`error`] module)
//! - **Tokens**: raw lexer output and source-decorated tokens ([`token`] module)
//! - **AST**: the closed node model produced by the parser ([`ast`] module)
//! - **Registry**: the plugin namespace read by the generator ([`registry`] module)
//! - **Positions**: offset remaps, their composition and line/column lookup
//!   ([`position`] and [`line_index`] modules)

pub mod ast;
pub mod error;
pub mod line_index;
pub mod position;
pub mod registry;
pub mod span;
pub mod token;
