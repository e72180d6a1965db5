//! Error and diagnostic system for the Kotoba compiler.
//!
//! This module provides an error handling system with:
//! - Error codes for documentation and searchability
//! - Multiple labeled spans for rich error context
//! - Severity levels
//!
//! # Overview
//!
//! The error system is built around the [`Diagnostic`] type, which represents
//! a single error or warning message with optional error code, multiple source
//! locations, and help text. Every pipeline error of the compiler can be
//! turned into a [`Diagnostic`] whose labels point into the author's original
//! source text.
//!
//! # Example
//!
//! ```
//! # use kotoba_core::error::{Diagnostic, ErrorCode};
//! # use kotoba_core::span::Span;
//!
//! let span = Span::new(12..18);
//!
//! let diag = Diagnostic::error("function `表示` was not found")
//!     .with_code(ErrorCode::E200)
//!     .with_label(span, "called here")
//!     .with_help("available plugins: [PluginSystem]");
//! ```

mod diagnostic;
mod error_code;
mod label;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::{Label, Severity};
