//! Error types for Kotoba compilation.
//!
//! [`KotobaError`] wraps every failure of the pipeline. The lexical, syntax
//! and generation variants carry spans in the author's original source and
//! convert to a [`Diagnostic`] for rendering.

use std::io;

use thiserror::Error;

use kotoba_codegen::GenError;
use kotoba_core::{
    error::{Diagnostic, ErrorCode},
    span::Span,
    token::Token,
};

use crate::config::ConfigError;

/// A lexer failure with its position composed back to the original source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[字句解析エラー] {message}")]
pub struct LexError {
    pub message: String,
    /// Span in the prepared text the lexer saw.
    pub prepared: Span,
    /// Span in the original source, when both ends have a counterpart.
    pub original: Option<Span>,
}

/// A parser failure located in the original source.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[文法エラー]{} {message}", line_prefix(.line))]
pub struct SyntaxError {
    pub message: String,
    /// The failing token, if the token list was not empty.
    pub token: Option<Token>,
    /// Never empty.
    pub span: Span,
    pub line: Option<usize>,
    pub file: String,
}

fn line_prefix(line: &Option<usize>) -> String {
    line.map(|line| format!("({line})")).unwrap_or_default()
}

/// The main error type for Kotoba operations.
#[derive(Debug, Error)]
pub enum KotobaError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Gen(#[from] GenError),

    #[error("The pre-parse hook needs asynchronous processing; use the async entry points")]
    AsyncHookInSyncParse,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl KotobaError {
    /// The error code of this error, if it has one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Lex(_) => Some(ErrorCode::E001),
            Self::Syntax(_) => Some(ErrorCode::E100),
            Self::Gen(err) => Some(err.code()),
            Self::AsyncHookInSyncParse => Some(ErrorCode::E300),
            Self::Config(_) => Some(ErrorCode::E301),
            Self::Io(_) => None,
        }
    }

    /// Whether this error points into the compiled source.
    pub fn has_source_location(&self) -> bool {
        match self {
            Self::Lex(err) => err.original.is_some(),
            Self::Syntax(_) => true,
            Self::Gen(err) => err.span.is_some(),
            _ => false,
        }
    }

    /// Convert to a diagnostic with labels over original-source spans.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Lex(err) => {
                let diagnostic = Diagnostic::error(err.to_string()).with_code(ErrorCode::E001);
                match err.original {
                    Some(span) => diagnostic.with_label(span, ErrorCode::E001.description()),
                    None => diagnostic,
                }
            }
            Self::Syntax(err) => {
                let mut diagnostic = Diagnostic::error(err.to_string())
                    .with_code(ErrorCode::E100)
                    .with_label(err.span, ErrorCode::E100.description());
                if let Some(token) = &err.token {
                    diagnostic = diagnostic.with_help(format!("failing token: {} `{}`", token.kind, token.value));
                }
                diagnostic
            }
            Self::Gen(err) => err.to_diagnostic(),
            other => {
                let diagnostic = Diagnostic::error(other.to_string());
                match other.code() {
                    Some(code) => diagnostic.with_code(code),
                    None => diagnostic,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = SyntaxError {
            message: "不明な語句".to_string(),
            token: None,
            span: Span::new(3..4),
            line: Some(2),
            file: "main.kotoba".to_string(),
        };
        assert_eq!(err.to_string(), "[文法エラー](2) 不明な語句");

        let err = SyntaxError { line: None, ..err };
        assert_eq!(err.to_string(), "[文法エラー] 不明な語句");
    }

    #[test]
    fn test_lex_diagnostic_has_original_label() {
        let err = KotobaError::from(LexError {
            message: "閉じ括弧がありません".to_string(),
            prepared: Span::new(0..2),
            original: Some(Span::new(0..6)),
        });
        let diagnostic = err.to_diagnostic();

        assert_eq!(diagnostic.code(), Some(ErrorCode::E001));
        assert_eq!(diagnostic.labels()[0].span(), Span::new(0..6));
        assert!(err.has_source_location());
    }

    #[test]
    fn test_pipeline_error_has_no_label() {
        let diagnostic = KotobaError::AsyncHookInSyncParse.to_diagnostic();
        assert_eq!(diagnostic.code(), Some(ErrorCode::E300));
        assert!(diagnostic.labels().is_empty());
    }
}
