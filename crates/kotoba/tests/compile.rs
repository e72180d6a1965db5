mod common;

use kotoba::{
    HookOutput, KotobaError, PreParseHook,
    ast::Node,
    config::{CompilerConfig, DebugConfig},
    token::Token,
};
use kotoba_codegen::Origin;
use kotoba_core::{error::ErrorCode, span::Span};

use common::compiler;

const FILE: &str = "main.kotoba";

/// Renames one word before the parser sees it.
struct Rename(&'static str, &'static str);

fn rename(tokens: Vec<Token>, from: &str, to: &str) -> Vec<Token> {
    tokens
        .into_iter()
        .map(|mut token| {
            if token.value == from {
                token.value = to.to_string();
            }
            token
        })
        .collect()
}

impl PreParseHook for Rename {
    fn before_parse(&self, tokens: Vec<Token>, _file: &str) -> HookOutput {
        HookOutput::Ready(rename(tokens, self.0, self.1))
    }
}

/// The same rewrite, completed asynchronously.
struct DeferredRename(&'static str, &'static str);

impl PreParseHook for DeferredRename {
    fn before_parse(&self, tokens: Vec<Token>, _file: &str) -> HookOutput {
        let (from, to) = (self.0, self.1);
        HookOutput::Pending(Box::pin(async move { rename(tokens, from, to) }))
    }
}

#[test]
fn test_compile_plugin_call() {
    let code = compiler()
        .compile("「こんにちは」を表示", FILE, false)
        .expect("program should compile");

    assert!(code.contains("__callPlugin(\"表示\", __v0[\"表示\"], [\"こんにちは\",__self])"));
    assert!(code.contains("__v0.line=1;"));
}

#[test]
fn test_map_entries_point_into_original_source() {
    let source = "※挨拶\n「やあ」を表示";
    let output = compiler()
        .compile_with_map(source, FILE, false)
        .expect("program should compile");

    let at = output.code.find("\"やあ\"").expect("string emitted");
    let entry = output
        .source_map
        .iter()
        .find(|entry| entry.output.contains(&at))
        .expect("string has a map entry");

    let start = source.find('「').expect("string in source");
    let end = source.find("表示").expect("call in source");
    assert_eq!(entry.source, Origin::new(Some(start), Some(end)));
    assert_eq!(entry.file.as_deref(), Some(FILE));
}

#[test]
fn test_standard_map_uses_source_lines() {
    let source = "※挨拶\n「やあ」を表示";
    let output = compiler()
        .compile_with_map(source, FILE, false)
        .expect("program should compile");

    let map = output.standard_map(FILE, source, Some("main.js"));
    assert!(map.mappings().iter().any(|m| m.original.line == 1));

    let json: serde_json::Value =
        serde_json::from_str(&map.to_json().expect("map serializes")).expect("valid JSON");
    assert_eq!(json["version"], 3);
    assert_eq!(json["file"], "main.js");
    assert_eq!(json["sources"], serde_json::json!([FILE]));
}

#[test]
fn test_comments_are_collected_before_finishing() {
    let source = "※メモ\n1を表示";
    let lexed = compiler().lex(source, FILE).expect("program should lex");

    assert_eq!(lexed.comments.len(), 1);
    assert_eq!(lexed.comments[0].value, "メモ");
    assert_eq!(lexed.comments[0].start_offset, Some(0));
    assert_eq!(lexed.comments[0].end_offset, source.find('\n'));
    assert!(lexed.tokens.iter().all(|token| !token.is_comment()));
}

#[test]
fn test_full_width_characters_map_back() {
    let source = "ＡＢを表示";
    let lexed = compiler().lex(source, FILE).expect("program should lex");

    assert_eq!(lexed.tokens[0].value, "AB");
    assert_eq!(lexed.tokens[0].start_offset, Some(0));
    assert_eq!(lexed.tokens[1].start_offset, source.find("表示"));
}

#[test]
fn test_inserted_terminator_has_no_position() {
    let source = "!インデント構文\nもし\n  1を表示\n";
    let lexed = compiler().lex(source, FILE).expect("program should lex");

    let terminator = lexed.tokens.last().expect("tokens produced");
    assert_eq!(terminator.value, "ここまで");
    assert_eq!(terminator.start_offset, None);
    assert_eq!(terminator.end_offset, None);

    let call = lexed
        .tokens
        .iter()
        .find(|token| token.value == "表示")
        .expect("call token");
    assert_eq!(call.start_offset, source.find("表示"));
}

#[test]
fn test_embedded_code_is_spliced_in_place() {
    let source = "【#内側\n「中」を表示】\n1を表示";
    let mut compiler = compiler();
    let lexed = compiler.lex(source, FILE).expect("program should lex");

    let inner = source.find('【').expect("embedded code") + '【'.len_utf8();
    assert!(lexed.tokens.iter().all(|token| !token.is_embedded_code()));
    assert_eq!(lexed.comments.len(), 1);
    assert_eq!(lexed.comments[0].start_offset, Some(inner));

    let string = lexed
        .tokens
        .iter()
        .find(|token| token.kind == "string")
        .expect("embedded string");
    assert_eq!(string.value, "中");
    assert_eq!(string.start_offset, source.find('「'));

    let code = compiler.compile(source, FILE, false).expect("program should compile");
    assert!(code.contains("[\"中\",__self]"));
}

#[test]
fn test_lex_error_maps_to_original_offsets() {
    let source = "ＡＢ@";
    let err = compiler().compile(source, FILE, false).expect_err("lexer rejects @");

    let KotobaError::Lex(lex) = &err else {
        panic!("Expected a lexical error, got {err:?}");
    };
    assert_eq!(lex.prepared, Span::new(2..3));
    assert_eq!(lex.original, Some(Span::new(6..7)));
    assert_eq!(err.code(), Some(ErrorCode::E001));
}

#[test]
fn test_syntax_error_is_located_at_failing_token() {
    let source = "1を表示\n2を";
    let err = compiler().compile(source, FILE, false).expect_err("statement without call");

    let KotobaError::Syntax(syntax) = &err else {
        panic!("Expected a syntax error, got {err:?}");
    };
    let start = source.rfind('2').expect("failing token");
    assert_eq!(syntax.span, Span::new(start..source.len()));
    assert_eq!(syntax.line, Some(2));
    assert_eq!(syntax.file, FILE);
    assert_eq!(err.to_string(), "[文法エラー](2) 関数がありません");
}

#[test]
fn test_generation_error_keeps_its_code() {
    let err = compiler()
        .compile("1を見せる", FILE, false)
        .expect_err("unknown function");

    assert!(matches!(err, KotobaError::Gen(_)));
    assert_eq!(err.code(), Some(ErrorCode::E200));
}

#[test]
fn test_ready_hook_rewrites_tokens() {
    let mut compiler = compiler().with_hook(Rename("見せる", "表示"));
    let code = compiler.compile("1を見せる", FILE, false).expect("hook renames call");

    assert!(code.contains("__callPlugin(\"表示\""));
}

#[test]
fn test_pending_hook_is_rejected_by_sync_compile() {
    let mut compiler = compiler().with_hook(DeferredRename("見せる", "表示"));
    let err = compiler.compile("1を見せる", FILE, false).expect_err("hook is asynchronous");

    assert!(matches!(err, KotobaError::AsyncHookInSyncParse));
}

#[tokio::test]
async fn test_pending_hook_is_awaited_by_async_compile() {
    let mut compiler = compiler().with_hook(DeferredRename("見せる", "表示"));
    let code = compiler
        .compile_async("1を見せる", FILE, false)
        .await
        .expect("hook completes");

    assert!(code.contains("__callPlugin(\"表示\""));
}

#[test]
fn test_used_functions_are_reported_sorted() {
    let mut compiler = compiler();
    compiler
        .compile("1に2を足す\nそれを表示\n3を表示", FILE, false)
        .expect("program should compile");

    assert_eq!(compiler.used_functions(), ["表示", "足"]);
}

#[test]
fn test_reset_forgets_globals_and_keeps_plugins() {
    let mut compiler = compiler();
    let program = Node::from_json(
        r#"{"type": "block", "block": [
            {"type": "def_local_var", "vartype": "定数", "name": {"type": "word", "value": "X"}}
        ]}"#,
    )
    .expect("program decodes");

    compiler.generate(&program, false).expect("program generates");
    assert!(compiler.globals().frame().contains("X"));

    compiler.reset();
    assert!(!compiler.globals().frame().contains("X"));
    assert!(compiler.registry().contains("表示"));
    assert!(compiler.compile("1を表示", FILE, false).is_ok());
}

#[test]
fn test_speed_mode_from_config() {
    let config = CompilerConfig::from_toml_str("speed_mode = true").expect("valid config");
    let code = compiler()
        .with_config(config)
        .compile("1を表示", FILE, false)
        .expect("program should compile");

    assert!(code.contains("/* line=1 */"));
    assert!(!code.contains("__v0.line=1;"));
}

#[test]
fn test_stage_dumps_do_not_change_output() {
    let debug = DebugConfig::new(true, true, true);
    let plain = compiler().compile("1を表示", FILE, false).expect("plain compile");
    let dumped = compiler()
        .with_config(CompilerConfig::new(false, debug))
        .compile("1を表示", FILE, false)
        .expect("compile with dumps");

    assert_eq!(plain, dumped);
}
