//! Errors raised while generating code.
//!
//! Every error aborts the compilation unit. Messages are phrased for the
//! program's author and carry the line of the offending node.

use std::fmt;

use kotoba_core::{
    ast::{Node, VarType},
    error::{Diagnostic, ErrorCode},
    span::Span,
};
use thiserror::Error;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenErrorKind {
    #[error("関数『{name}』が見当たりません。有効プラグイン=[{}]", .plugins.join(", "))]
    UnknownFunction { name: String, plugins: Vec<String> },

    #[error("『{keyword}』文がありますが、それは繰り返しの中で利用してください。")]
    LoopExitOutsideLoop { keyword: &'static str },

    #[error("『戻る』がありますが、関数定義内のみで使用可能です。")]
    ReturnOutsideFunction,

    #[error("定数『{name}』は既に定義済みなので、値を代入することはできません。")]
    AssignToConstant { name: String },

    #[error("{}『{name}』の二重定義はできません。", .vartype.keyword())]
    DuplicateDeclaration { name: String, vartype: VarType },

    #[error("『{name}』は関数ではありません。")]
    NotAFunction { name: String },

    #[error("『{name}』が複文で使われました。単文で記述してください。")]
    FunctionAsValue { name: String },

    #[error("関数『{name}』の引数が多すぎます。({given}個の引数に対して{accepted}個まで)")]
    TooManyArguments {
        name: String,
        given: usize,
        accepted: usize,
    },

    #[error("関数『{name}』の{position}番目の引数に助詞『{josi}』は使えません。(使える助詞: {})", .expected.join(", "))]
    ParticleMismatch {
        name: String,
        position: usize,
        josi: String,
        expected: Vec<String>,
    },

    #[error("構文解析に失敗しています。構文は必ずblockが先頭になります(先頭: {found})")]
    MalformedProgram { found: &'static str },

    #[error("構文木が不正です。{expected}が必要ですが{found}がありました。")]
    UnexpectedNode {
        expected: &'static str,
        found: &'static str,
    },
}

impl GenErrorKind {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownFunction { .. } => ErrorCode::E200,
            Self::LoopExitOutsideLoop { .. } => ErrorCode::E201,
            Self::ReturnOutsideFunction => ErrorCode::E202,
            Self::AssignToConstant { .. } => ErrorCode::E203,
            Self::DuplicateDeclaration { .. } => ErrorCode::E204,
            Self::NotAFunction { .. } => ErrorCode::E205,
            Self::FunctionAsValue { .. } => ErrorCode::E206,
            Self::TooManyArguments { .. } | Self::ParticleMismatch { .. } => ErrorCode::E207,
            Self::MalformedProgram { .. } | Self::UnexpectedNode { .. } => ErrorCode::E208,
        }
    }
}

/// A generation error located at a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenError {
    pub kind: GenErrorKind,
    pub line: Option<usize>,
    pub span: Option<Span>,
    pub file: Option<String>,
}

impl GenError {
    /// An error reported at `node`.
    pub fn at(node: &Node, kind: GenErrorKind) -> Self {
        let span = match (node.info.start_offset, node.info.end_offset) {
            (Some(start), Some(end)) => Some(Span::new(start..end)),
            _ => None,
        };
        Self {
            kind,
            line: node.info.line,
            span,
            file: node.info.file.clone(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// Convert to a diagnostic labeled at the node's source range.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diagnostic = Diagnostic::error(self.kind.to_string()).with_code(self.code());
        if let Some(span) = self.span {
            diagnostic = diagnostic.with_label(span, self.code().description());
        }
        if let GenErrorKind::ParticleMismatch { expected, .. } = &self.kind {
            diagnostic = diagnostic.with_help(format!("accepted particles: {}", expected.join(", ")));
        }
        diagnostic
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "[文法エラー]({line}) {}", self.kind),
            None => write!(f, "[文法エラー] {}", self.kind),
        }
    }
}

impl std::error::Error for GenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_line() {
        let node = Node::word("X").with_line(3);
        let err = GenError::at(
            &node,
            GenErrorKind::UnknownFunction {
                name: "X".to_string(),
                plugins: vec!["PluginSystem".to_string(), "PluginMath".to_string()],
            },
        );

        assert_eq!(
            err.to_string(),
            "[文法エラー](3) 関数『X』が見当たりません。有効プラグイン=[PluginSystem, PluginMath]"
        );
        assert_eq!(err.code(), ErrorCode::E200);
    }

    #[test]
    fn test_diagnostic_label_uses_node_span() {
        let node = Node::word("PI").with_span(Span::new(4..6));
        let err = GenError::at(
            &node,
            GenErrorKind::AssignToConstant {
                name: "PI".to_string(),
            },
        );
        let diagnostic = err.to_diagnostic();

        assert_eq!(diagnostic.code(), Some(ErrorCode::E203));
        assert_eq!(diagnostic.labels()[0].span(), Span::new(4..6));
    }

    #[test]
    fn test_duplicate_declaration_names_flavor() {
        let kind = GenErrorKind::DuplicateDeclaration {
            name: "A".to_string(),
            vartype: VarType::Constant,
        };
        assert_eq!(kind.to_string(), "定数『A』の二重定義はできません。");
    }
}
