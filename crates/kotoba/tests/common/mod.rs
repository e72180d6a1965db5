//! A toy lexer and parser standing in for the real collaborators.
//!
//! The toy language has one statement per line: arguments followed by the
//! name of the function to call, e.g. `「やあ」を表示` or `1に2を足す`.
//!
//! - `「…」` is a string, digits a number, anything else a word;
//! - a word or literal may end in one of the particles `を に と は`;
//! - `#` starts a comment (`※` folds to it);
//! - `【…】` carries embedded code, lexed recursively;
//! - `@` is rejected by the lexer;
//! - lines starting with `!` are directives and produce no token.
//!
//! Token lines are zero-based; node lines are one-based.

#![allow(dead_code)]

use kotoba::{
    LexFailure, Lexer, ParseFailure, Parser,
    ast::Node,
    registry::{Entry, Registry},
    token::{KIND_EMBEDDED_CODE, KIND_LINE_COMMENT, RawToken, Token},
};
use kotoba_core::span::Span;

pub const PARTICLES: [char; 4] = ['を', 'に', 'と', 'は'];

pub struct ToyLexer;

struct Cursor<'a> {
    chars: Vec<(usize, char)>,
    text: &'a str,
    index: usize,
}

impl Cursor<'_> {
    fn offset(&self) -> usize {
        self.chars
            .get(self.index)
            .map_or(self.text.len(), |&(offset, _)| offset)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).map(|&(_, c)| c)
    }

    fn take_until(&mut self, stop: impl Fn(char) -> bool) -> usize {
        while let Some(c) = self.peek() {
            if stop(c) {
                break;
            }
            self.index += 1;
        }
        self.offset()
    }

    fn particle(&mut self) -> String {
        match self.peek() {
            Some(c) if PARTICLES.contains(&c) => {
                self.index += 1;
                c.to_string()
            }
            _ => String::new(),
        }
    }
}

impl Lexer for ToyLexer {
    fn tokenize(
        &self,
        prepared: &str,
        file: &str,
        line: usize,
    ) -> Result<Vec<RawToken>, LexFailure> {
        let mut cursor = Cursor {
            chars: prepared.char_indices().collect(),
            text: prepared,
            index: 0,
        };
        let mut tokens = Vec::new();
        let mut line = line;
        let mut line_start = 0;

        while let Some(c) = cursor.peek() {
            let start = cursor.offset();
            let column = start - line_start;
            let token = match c {
                '\n' => {
                    cursor.index += 1;
                    let token = RawToken::new("eol", "\n", Span::new(start..start + 1));
                    tokens.push(token.with_line(line, column).with_file(file));
                    line += 1;
                    line_start = cursor.offset();
                    continue;
                }
                ' ' | '\t' => {
                    cursor.index += 1;
                    continue;
                }
                '!' if column == 0 => {
                    cursor.take_until(|c| c == '\n');
                    continue;
                }
                '@' => {
                    return Err(LexFailure::new(
                        "使えない文字です",
                        Span::new(start..start + 1),
                    ));
                }
                '#' => {
                    let end = cursor.take_until(|c| c == '\n');
                    RawToken::new(KIND_LINE_COMMENT, &prepared[start + 1..end], Span::new(start..end))
                }
                '「' | '【' => {
                    let closer = if c == '「' { '」' } else { '】' };
                    cursor.index += 1;
                    let inner = cursor.offset();
                    let inner_end = cursor.take_until(|c| c == closer);
                    cursor.index += 1;
                    let value = &prepared[inner..inner_end];
                    if c == '【' {
                        RawToken::new(KIND_EMBEDDED_CODE, value, Span::new(inner..inner_end))
                    } else {
                        let josi = cursor.particle();
                        RawToken::new("string", value, Span::new(start..cursor.offset()))
                            .with_josi(josi)
                    }
                }
                '0'..='9' => {
                    let end = cursor.take_until(|c| !c.is_ascii_digit());
                    let josi = cursor.particle();
                    RawToken::new("number", &prepared[start..end], Span::new(start..cursor.offset()))
                        .with_josi(josi)
                }
                _ => {
                    cursor.index += 1;
                    let end = cursor.take_until(|c| {
                        c.is_whitespace()
                            || PARTICLES.contains(&c)
                            || matches!(c, '「' | '【' | '#' | '@')
                    });
                    let josi = cursor.particle();
                    RawToken::new("word", &prepared[start..end], Span::new(start..cursor.offset()))
                        .with_josi(josi)
                }
            };
            tokens.push(token.with_line(line, column).with_file(file));
        }
        Ok(tokens)
    }

    fn finish(&self, tokens: Vec<Token>, _is_first: bool) -> Vec<Token> {
        tokens.into_iter().filter(|token| !token.is_comment()).collect()
    }
}

pub struct ToyParser;

fn argument(token: &Token) -> Node {
    let node = match token.kind.as_str() {
        "number" => Node::number(token.value.parse::<u64>().unwrap_or_default()),
        "string" => Node::string(&token.value),
        _ => Node::word(&token.value),
    };
    positioned(node, token, token).with_josi(&token.josi)
}

fn positioned(node: Node, first: &Token, last: &Token) -> Node {
    let node = node.with_line(first.line + 1).with_file(&first.file);
    match (first.start_offset, last.end_offset) {
        (Some(start), Some(end)) if start <= end => node.with_span(Span::new(start..end)),
        _ => node,
    }
}

impl Parser for ToyParser {
    fn parse(&self, tokens: &[Token], _registry: &Registry, _file: &str) -> Result<Node, ParseFailure> {
        let mut statements = Vec::new();
        let mut start = 0;
        for (index, token) in tokens.iter().enumerate() {
            if token.kind != "eol" && index + 1 < tokens.len() {
                continue;
            }
            let end = if token.kind == "eol" { index } else { index + 1 };
            let statement = &tokens[start..end];
            start = index + 1;

            let Some((name, args)) = statement.split_last() else {
                continue;
            };
            if name.kind != "word" {
                return Err(ParseFailure::new(end - 1, "関数がありません").with_line(name.line + 1));
            }
            let args = args.iter().map(|token| Some(argument(token))).collect();
            statements.push(positioned(Node::call(&name.value, args), &statement[0], name));
        }
        Ok(Node::block(statements))
    }
}

/// The plugin functions the tests call.
pub fn system_plugin() -> Vec<(&'static str, Entry)> {
    vec![
        ("表示", Entry::procedure(&[&["を", "と"]])),
        ("足", Entry::func(&[&["に", "と"], &["を"]])),
        ("今", Entry::func(&[])),
    ]
}

pub fn compiler() -> kotoba::Compiler {
    let mut compiler = kotoba::Compiler::new(ToyLexer, ToyParser);
    compiler.add_plugin("PluginSystem", system_plugin());
    compiler
}
