//! Kotoba - a source-accurate compiler from a Japanese natural-language
//! scripting language to JavaScript.
//!
//! The [`Compiler`] drives one program through the pipeline:
//!
//! 1. indentation normalization and the prepare stage ([`kotoba_source`]);
//! 2. tokenization by the external [`Lexer`];
//! 3. decoration of every token with offsets in the original file
//!    ([`compose`]), splicing embedded code in place;
//! 4. the optional [`PreParseHook`], synchronous or asynchronous;
//! 5. parsing by the external [`Parser`], with failures located by the
//!    Error Locator ([`locate`]);
//! 6. code generation ([`kotoba_codegen`]) into JavaScript plus a map from
//!    every output range to the source range it came from.
//!
//! Lexing and grammar are collaborators: this crate owns positions, scopes
//! and output, not the language's surface syntax.

pub mod compose;
pub mod config;
pub mod interface;
pub mod locate;
pub mod report;
pub mod usage;

mod error;

pub use error::{KotobaError, LexError, SyntaxError};
pub use interface::{
    HookOutput, LexFailure, Lexer, ParseFailure, Parser, PendingTokens, PreParseHook,
};
pub use kotoba_codegen::{CodeFragment, GenError, GlobalScope, SourceMapEntry, StandardSourceMap};
pub use kotoba_core::{ast, registry, token};

use indexmap::IndexMap;
use log::{debug, info, trace};

use kotoba_codegen::GeneratorOptions;
use kotoba_core::{
    ast::Node,
    registry::{Entry, Registry, RegistryError},
    token::Token,
};
use kotoba_source::{Prepare, WidthFold};

use config::{CompilerConfig, DebugConfig};

/// Tokens ready for the parser and the comments collected on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    /// Comment tokens, kept even when the lexer's finishing pass drops them.
    pub comments: Vec<Token>,
}

/// Generated JavaScript and the provenance of every piece of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
    pub code: String,
    pub source_map: Vec<SourceMapEntry>,
}

impl CompileOutput {
    /// Encode the map as a Source Map Revision 3 for one source file.
    pub fn standard_map(
        &self,
        file: &str,
        source: &str,
        output_file: Option<&str>,
    ) -> StandardSourceMap {
        let mut sources = IndexMap::new();
        sources.insert(file.to_string(), source.to_string());
        StandardSourceMap::build(&self.code, &self.source_map, &sources, output_file)
    }
}

/// Compiler for Kotoba programs.
///
/// The registry and the program-global scope persist across compilations
/// until [`reset`](Self::reset). Everything else is rebuilt per call.
pub struct Compiler {
    config: CompilerConfig,
    registry: Registry,
    globals: GlobalScope,
    lexer: Box<dyn Lexer>,
    parser: Box<dyn Parser>,
    prepare: Box<dyn Prepare>,
    hook: Option<Box<dyn PreParseHook>>,
    used_functions: Vec<String>,
}

impl Compiler {
    /// Create a compiler around the given lexer and parser.
    ///
    /// The prepare stage defaults to [`WidthFold`] and the configuration to
    /// [`CompilerConfig::default`].
    pub fn new(lexer: impl Lexer + 'static, parser: impl Parser + 'static) -> Self {
        Self {
            config: CompilerConfig::default(),
            registry: Registry::new(),
            globals: GlobalScope::new(),
            lexer: Box::new(lexer),
            parser: Box::new(parser),
            prepare: Box::new(WidthFold),
            hook: None,
            used_functions: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_prepare(mut self, prepare: impl Prepare + 'static) -> Self {
        self.prepare = Box::new(prepare);
        self
    }

    pub fn with_hook(mut self, hook: impl PreParseHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Register the entries of a plugin module.
    pub fn add_plugin<I, K>(&mut self, module: &str, entries: I)
    where
        I: IntoIterator<Item = (K, Entry)>,
        K: Into<String>,
    {
        self.registry.add_plugin(module, entries);
    }

    /// Register a plugin module described in JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] if the description is malformed.
    pub fn add_plugin_json(&mut self, module: &str, json: &str) -> Result<(), RegistryError> {
        self.registry.add_plugin_json(module, json)
    }

    pub fn globals(&self) -> &GlobalScope {
        &self.globals
    }

    /// Registry functions called by the last parsed program, sorted.
    pub fn used_functions(&self) -> &[String] {
        &self.used_functions
    }

    /// Forget program globals and user functions. The registry survives.
    pub fn reset(&mut self) {
        info!("Resetting compiler state");
        self.globals.reset();
        self.used_functions.clear();
    }

    fn context<'c>(&'c self, source: &'c str, file: &'c str) -> CompileContext<'c> {
        CompileContext {
            lexer: self.lexer.as_ref(),
            parser: self.parser.as_ref(),
            prepare: self.prepare.as_ref(),
            registry: &self.registry,
            debug: *self.config.debug(),
            source,
            file,
        }
    }

    fn run_hook(&self, tokens: Vec<Token>, file: &str) -> HookOutput {
        match &self.hook {
            Some(hook) => hook.before_parse(tokens, file),
            None => HookOutput::Ready(tokens),
        }
    }

    /// Tokenize `code` with positions in `code`.
    ///
    /// # Errors
    ///
    /// Returns [`KotobaError::Lex`] if the lexer fails and
    /// [`KotobaError::AsyncHookInSyncParse`] if the pre-parse hook does not
    /// complete synchronously.
    pub fn lex(&self, code: &str, file: &str) -> Result<LexOutput, KotobaError> {
        let context = self.context(code, file);
        let raw = context.raw_tokens()?;
        let tokens = match self.run_hook(raw, file) {
            HookOutput::Ready(tokens) => tokens,
            HookOutput::Pending(_) => return Err(KotobaError::AsyncHookInSyncParse),
        };
        Ok(context.finish(tokens)?)
    }

    /// Tokenize `code`, awaiting the pre-parse hook if it needs to.
    ///
    /// # Errors
    ///
    /// Returns [`KotobaError::Lex`] if the lexer fails.
    pub async fn lex_async(&self, code: &str, file: &str) -> Result<LexOutput, KotobaError> {
        let context = self.context(code, file);
        let raw = context.raw_tokens()?;
        let tokens = match self.run_hook(raw, file) {
            HookOutput::Ready(tokens) => tokens,
            HookOutput::Pending(pending) => {
                debug!(file; "Awaiting pre-parse hook");
                pending.await
            }
        };
        Ok(context.finish(tokens)?)
    }

    /// Parse `code` into a syntax tree.
    ///
    /// # Errors
    ///
    /// Returns `KotobaError` for lexical and syntax errors, and if the
    /// pre-parse hook does not complete synchronously.
    pub fn parse(&mut self, code: &str, file: &str) -> Result<Node, KotobaError> {
        info!(file; "Parsing program");
        let lexed = self.lex(code, file)?;
        let ast = self.context(code, file).parse(&lexed)?;
        self.used_functions = usage::used_functions(&ast, &self.registry);
        Ok(ast)
    }

    /// Parse `code` into a syntax tree, awaiting the pre-parse hook if it needs to.
    ///
    /// # Errors
    ///
    /// Returns `KotobaError` for lexical and syntax errors.
    pub async fn parse_async(&mut self, code: &str, file: &str) -> Result<Node, KotobaError> {
        info!(file; "Parsing program asynchronously");
        let lexed = self.lex_async(code, file).await?;
        let ast = self.context(code, file).parse(&lexed)?;
        self.used_functions = usage::used_functions(&ast, &self.registry);
        Ok(ast)
    }

    /// Generate the fragment tree of a parsed program.
    ///
    /// # Errors
    ///
    /// Returns a [`GenError`] if the program cannot be translated. Program
    /// globals are only updated on success.
    pub fn generate(&mut self, ast: &Node, is_test: bool) -> Result<CodeFragment, GenError> {
        let options = GeneratorOptions {
            speed_mode: self.config.speed_mode(),
            is_test,
        };
        kotoba_codegen::generate(ast, &self.registry, &mut self.globals, &options)
    }

    /// Compile `code` to JavaScript.
    ///
    /// # Errors
    ///
    /// Returns `KotobaError` for lexical, syntax and generation errors.
    pub fn compile(&mut self, code: &str, file: &str, is_test: bool) -> Result<String, KotobaError> {
        Ok(self.compile_with_map(code, file, is_test)?.code)
    }

    /// Compile `code` to JavaScript together with its position map.
    ///
    /// # Errors
    ///
    /// Returns `KotobaError` for lexical, syntax and generation errors.
    pub fn compile_with_map(
        &mut self,
        code: &str,
        file: &str,
        is_test: bool,
    ) -> Result<CompileOutput, KotobaError> {
        let ast = self.parse(code, file)?;
        self.finish_compile(&ast, file, is_test)
    }

    /// Compile `code` to JavaScript, awaiting the pre-parse hook if it needs to.
    ///
    /// # Errors
    ///
    /// Returns `KotobaError` for lexical, syntax and generation errors.
    pub async fn compile_async(
        &mut self,
        code: &str,
        file: &str,
        is_test: bool,
    ) -> Result<String, KotobaError> {
        let ast = self.parse_async(code, file).await?;
        Ok(self.finish_compile(&ast, file, is_test)?.code)
    }

    fn finish_compile(
        &mut self,
        ast: &Node,
        file: &str,
        is_test: bool,
    ) -> Result<CompileOutput, KotobaError> {
        let flattened = self.generate(ast, is_test)?.with_file(file).flatten();
        if self.config.debug().generated_code() {
            debug!(file, code = flattened.code; "Generated code");
        } else {
            trace!(file, code = flattened.code; "Generated code");
        }
        info!(file, bytes = flattened.code.len(); "Program compiled");
        Ok(CompileOutput {
            code: flattened.code,
            source_map: flattened.source_map,
        })
    }
}

/// The state of one compilation call.
struct CompileContext<'c> {
    lexer: &'c dyn Lexer,
    parser: &'c dyn Parser,
    prepare: &'c dyn Prepare,
    registry: &'c Registry,
    debug: DebugConfig,
    source: &'c str,
    file: &'c str,
}

impl CompileContext<'_> {
    fn raw_tokens(&self) -> Result<Vec<Token>, LexError> {
        compose::tokenize(self.lexer, self.prepare, self.source, 0, self.file)
    }

    /// Collect comments, finish the token list and splice in embedded code.
    fn finish(&self, tokens: Vec<Token>) -> Result<LexOutput, LexError> {
        let mut comments = compose::comments(&tokens);
        let tokens = self.lexer.finish(tokens, true);
        let tokens = compose::splice_embedded(self.lexer, self.prepare, tokens, &mut comments)?;

        if self.debug.lexer() {
            debug!(file = self.file, tokens:? = tokens; "Tokens");
        } else {
            trace!(file = self.file, tokens:? = tokens; "Tokens");
        }
        Ok(LexOutput { tokens, comments })
    }

    fn parse(&self, lexed: &LexOutput) -> Result<Node, SyntaxError> {
        let tokens = &lexed.tokens;
        let ast = self
            .parser
            .parse(tokens, self.registry, self.file)
            .map_err(|failure| {
                let span = locate::locate(tokens, failure.index, self.source);
                let token = tokens.get(failure.index).or(tokens.last()).cloned();
                debug!(index = failure.index, span:? = span; "Parse failed");
                SyntaxError {
                    line: failure.line.or(token.as_ref().map(|token| token.line)),
                    message: failure.message,
                    token,
                    span,
                    file: self.file.to_string(),
                }
            })?;

        if self.debug.parser() {
            debug!(file = self.file, ast:? = ast; "Syntax tree");
        } else {
            trace!(file = self.file, ast:? = ast; "Syntax tree");
        }
        Ok(ast)
    }
}
