//! Error codes for the Kotoba diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Lexical errors
//! - `E1xx` - Syntax errors
//! - `E2xx` - Code generation errors
//! - `E3xx` - Pipeline and configuration errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexical Errors (E0xx)
    // =========================================================================
    /// Malformed token.
    ///
    /// The lexer could not classify a run of characters.
    E001,

    // =========================================================================
    // Syntax Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    ///
    /// The parser rejected the token stream at this position.
    E100,

    // =========================================================================
    // Code Generation Errors (E2xx)
    // =========================================================================
    /// Unknown function.
    ///
    /// A call names a function that is neither user-defined nor registered
    /// by a plugin.
    E200,

    /// Loop exit outside a loop.
    ///
    /// `break` or `continue` was used without an enclosing loop.
    E201,

    /// Return outside a function.
    ///
    /// An early return was used outside a function body.
    E202,

    /// Assignment to a constant.
    ///
    /// A name declared read-only in an enclosing scope was reassigned.
    E203,

    /// Duplicate local declaration.
    ///
    /// A name was declared twice in the same local scope.
    E204,

    /// Not a function.
    ///
    /// A registered constant or variable was called like a function.
    E205,

    /// Function used as a value.
    ///
    /// A plugin function that takes arguments was referenced as a value.
    E206,

    /// Particle mismatch.
    ///
    /// An argument's particle is not accepted by the callee, or the call has
    /// more arguments than the callee accepts.
    E207,

    /// Malformed program.
    ///
    /// The syntax tree handed to the generator does not start with a block.
    E208,

    // =========================================================================
    // Pipeline Errors (E3xx)
    // =========================================================================
    /// Asynchronous hook in synchronous parse.
    ///
    /// The pre-parse hook returned a pending value to the synchronous entry point.
    E300,

    /// Invalid configuration.
    E301,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E100 => "E100",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            ErrorCode::E206 => "E206",
            ErrorCode::E207 => "E207",
            ErrorCode::E208 => "E208",
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "malformed token",
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E200 => "unknown function",
            ErrorCode::E201 => "loop exit outside a loop",
            ErrorCode::E202 => "return outside a function",
            ErrorCode::E203 => "assignment to a constant",
            ErrorCode::E204 => "duplicate local declaration",
            ErrorCode::E205 => "not a function",
            ErrorCode::E206 => "function used as a value",
            ErrorCode::E207 => "particle mismatch",
            ErrorCode::E208 => "malformed program",
            ErrorCode::E300 => "asynchronous hook in synchronous parse",
            ErrorCode::E301 => "invalid configuration",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E001.to_string(), "E001");
        assert_eq!(ErrorCode::E100.to_string(), "E100");
        assert_eq!(ErrorCode::E207.to_string(), "E207");
        assert_eq!(ErrorCode::E300.to_string(), "E300");
    }

    #[test]
    fn test_error_code_description() {
        assert_eq!(ErrorCode::E001.description(), "malformed token");
        assert_eq!(ErrorCode::E200.description(), "unknown function");
        assert_eq!(ErrorCode::E204.description(), "duplicate local declaration");
    }
}
