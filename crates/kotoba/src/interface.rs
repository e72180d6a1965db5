//! The collaborators the compiler drives but does not implement.
//!
//! Lexical classification and grammar live outside this workspace. The
//! compiler hands them text and tokens through these traits and takes care
//! of everything positional around them.

use std::{fmt, future::Future, pin::Pin};

use kotoba_core::{
    ast::Node,
    registry::Registry,
    span::Span,
    token::{RawToken, Token},
};

/// Splits prepared text into tokens.
pub trait Lexer {
    /// Tokenize `prepared`, the normalized and folded text of `file`.
    ///
    /// `line` is the line the text starts on, non-zero for embedded code.
    /// Token offsets are positions in `prepared`.
    ///
    /// # Errors
    ///
    /// Returns a [`LexFailure`] spanning the offending prepared text.
    fn tokenize(&self, prepared: &str, file: &str, line: usize) -> Result<Vec<RawToken>, LexFailure>;

    /// Correct token attributes before parsing.
    ///
    /// `is_first` is false for the tokens of embedded code. Comment tokens
    /// may be dropped here.
    fn finish(&self, tokens: Vec<Token>, is_first: bool) -> Vec<Token>;
}

/// Builds the syntax tree from decorated tokens.
pub trait Parser {
    /// # Errors
    ///
    /// Returns a [`ParseFailure`] naming the index of the failing token.
    fn parse(&self, tokens: &[Token], registry: &Registry, file: &str) -> Result<Node, ParseFailure>;
}

/// A future yielding the token list a hook rewrote asynchronously.
pub type PendingTokens = Pin<Box<dyn Future<Output = Vec<Token>> + Send>>;

/// What a [`PreParseHook`] returns.
pub enum HookOutput {
    /// The rewritten token list.
    Ready(Vec<Token>),
    /// A rewrite that completes later; only the asynchronous entry points
    /// accept it.
    Pending(PendingTokens),
}

impl fmt::Debug for HookOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(tokens) => f.debug_tuple("Ready").field(&tokens.len()).finish(),
            Self::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Rewrites the raw token list of a file before comments are collected and
/// the lexer finishes it.
pub trait PreParseHook {
    fn before_parse(&self, tokens: Vec<Token>, file: &str) -> HookOutput;
}

/// A lexer failure positioned in prepared text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexFailure {
    pub message: String,
    pub prepared: Span,
}

impl LexFailure {
    pub fn new(message: impl Into<String>, prepared: Span) -> Self {
        Self {
            message: message.into(),
            prepared,
        }
    }
}

/// A parser failure at token `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub index: usize,
    pub message: String,
    pub line: Option<usize>,
}

impl ParseFailure {
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
            line: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}
