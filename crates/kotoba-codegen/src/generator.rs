//! The AST walk producing JavaScript fragments.
//!
//! [`generate`] compiles one program. It first hoists every top-level
//! function definition into the global tier so calls may precede
//! definitions (and functions may call themselves), then converts the tree
//! node by node. Function bodies are deferred into a definitions block that
//! the program header emits before the main body.
//!
//! The generated program expects to run with `this` bound to a host object
//! whose `__varslist` holds the plugin tier and the global tier.

mod call;
mod control;
mod value;

use std::mem;

use indexmap::{IndexMap, IndexSet};
use kotoba_core::{
    ast::{Node, NodeKind},
    registry::{Entry, INIT_FUNCTION, Registry},
};
use log::{debug, info, trace};

use crate::{
    error::{GenError, GenErrorKind},
    fragment,
    fragment::CodeFragment,
    scope::{ScopeFrame, ScopeStack, Scoped},
};

/// The implicit result variable.
pub const SORE: &str = "それ";

/// Compiler-managed variables living in the plugin tier.
pub const PSEUDO_VARIABLES: [&str; 4] = ["対象", "対象キー", "回数", "エラーメッセージ"];

/// Reference to `それ` in the current frame.
const SORE_REF: &str = "__vars[\"それ\"]";

/// Helper wrapping plugin failures with the failing function's name.
const CALL_PLUGIN_HELPER: &str = "\
const __callPlugin = (name, fn, args) => {
  try {
    return fn.apply(__self, args);
  } catch (e) {
    if (e && e.__kotobaWrapped) { throw e; }
    const err = new Error('関数『' + name + '』:' + (e && e.name) + ':' + (e && e.message));
    err.__kotobaWrapped = true;
    throw err;
  }
};
";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Emit line markers as comments instead of runtime assignments.
    pub speed_mode: bool,
    /// Compile tests: emit the test block and an empty main body.
    pub is_test: bool,
}

/// A function defined by the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFunction {
    pub josi: Vec<Vec<String>>,
}

/// Program-global state that survives between compilations.
#[derive(Debug, Clone)]
pub struct GlobalScope {
    frame: ScopeFrame,
    functions: IndexMap<String, UserFunction>,
    used: IndexSet<String>,
}

impl Default for GlobalScope {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalScope {
    pub fn new() -> Self {
        let mut frame = ScopeFrame::new();
        frame.declare(SORE);
        Self {
            frame,
            functions: IndexMap::new(),
            used: IndexSet::new(),
        }
    }

    pub fn frame(&self) -> &ScopeFrame {
        &self.frame
    }

    pub fn function(&self, name: &str) -> Option<&UserFunction> {
        self.functions.get(name)
    }

    /// Functions called or defined by the compiled programs, in first-use order.
    pub fn used_functions(&self) -> impl Iterator<Item = &str> {
        self.used.iter().map(String::as_str)
    }

    /// Forget globals and used functions, keeping plugin initializers.
    pub fn reset(&mut self) {
        let suffix = format!(":{INIT_FUNCTION}");
        self.used
            .retain(|name| name.starts_with('!') && name.ends_with(&suffix));
        self.frame = Self::new().frame;
        self.functions.clear();
    }
}

/// Compile `program` into a fragment tree.
///
/// On success the global tier, the user functions and the used-function
/// set are written back to `globals`; on error `globals` is left untouched.
pub fn generate(
    program: &Node,
    registry: &Registry,
    globals: &mut GlobalScope,
    options: &GeneratorOptions,
) -> Result<CodeFragment, GenError> {
    let mut generator = Generator::new(registry, globals, options);
    generator.hoist_functions(program)?;

    let body = generator.convert(program)?;
    let body = if options.is_test {
        CodeFragment::from_node(program)
    } else {
        body
    };
    let header = generator.header();

    info!(
        functions = generator.definitions.len(),
        tests = generator.tests.len();
        "Program generated"
    );
    generator.commit(globals);
    Ok(fragment!([header, body]))
}

pub(crate) struct Generator<'a> {
    registry: &'a Registry,
    options: &'a GeneratorOptions,
    scope: ScopeStack,
    functions: IndexMap<String, UserFunction>,
    definitions: IndexMap<String, CodeFragment>,
    tests: IndexMap<String, CodeFragment>,
    used: IndexSet<String>,
    loop_id: usize,
    in_loop: bool,
    last_line: Option<usize>,
}

impl Scoped for Generator<'_> {
    fn scope_mut(&mut self) -> &mut ScopeStack {
        &mut self.scope
    }
}

impl<'a> Generator<'a> {
    fn new(registry: &'a Registry, globals: &GlobalScope, options: &'a GeneratorOptions) -> Self {
        let mut plugins = ScopeFrame::new();
        for name in registry.names() {
            match registry.get(name) {
                Some(Entry::Const { .. }) => plugins.declare_readonly(name),
                _ => plugins.declare(name),
            }
        }
        for name in PSEUDO_VARIABLES {
            plugins.declare(name);
        }

        Self {
            registry,
            options,
            scope: ScopeStack::new(plugins, globals.frame.clone()),
            functions: globals.functions.clone(),
            definitions: IndexMap::new(),
            tests: IndexMap::new(),
            used: IndexSet::new(),
            loop_id: 1,
            in_loop: false,
            last_line: None,
        }
    }

    fn commit(mut self, globals: &mut GlobalScope) {
        globals.frame = mem::take(self.scope.globals_mut());
        globals.functions = self.functions;
        globals.used.extend(self.used);
    }

    /// Register every top-level definition before generating any code.
    fn hoist_functions(&mut self, program: &Node) -> Result<(), GenError> {
        let NodeKind::Block { block } = &program.kind else {
            return Err(GenError::at(
                program,
                GenErrorKind::MalformedProgram {
                    found: program.kind.name(),
                },
            ));
        };
        for node in block {
            if let NodeKind::DefFunc { name, .. } = &node.kind {
                let function = function_name(identifier(name)?);
                let josi = name.info.meta.clone().unwrap_or_default().josi;
                self.declare_function(function, josi);
            }
        }
        Ok(())
    }

    fn declare_function(&mut self, name: &str, josi: Vec<Vec<String>>) {
        trace!(name; "Function declared");
        self.used.insert(name.to_string());
        self.scope.globals_mut().declare(name);
        self.functions
            .insert(name.to_string(), UserFunction { josi });
    }

    fn next_id(&mut self) -> usize {
        let id = self.loop_id;
        self.loop_id += 1;
        id
    }

    /// Convert `node` with loop exits allowed.
    fn convert_in_loop(&mut self, node: &Node) -> Result<CodeFragment, GenError> {
        let saved = mem::replace(&mut self.in_loop, true);
        let result = self.convert(node);
        self.in_loop = saved;
        result
    }

    /// The statement recording the current source line, if it changed.
    fn line_marker(&mut self, node: &Node) -> CodeFragment {
        let mut marker = CodeFragment::from_node(node);
        let Some(line) = node.info.line else {
            return marker;
        };
        if self.options.speed_mode {
            marker.append(format!("/* line={line} */"));
        } else if self.last_line != Some(line) {
            self.last_line = Some(line);
            marker.append(format!("__v0.line={line};"));
        }
        marker
    }

    fn convert(&mut self, node: &Node) -> Result<CodeFragment, GenError> {
        match &node.kind {
            NodeKind::Nop => Ok(CodeFragment::from_node(node)),
            NodeKind::Block { block } => {
                let mut code = CodeFragment::from_node(node);
                for statement in block {
                    code.append(self.convert(statement)?);
                }
                Ok(code)
            }
            NodeKind::Comment { value } | NodeKind::Eol { value } => Ok(self.comment(node, value)),
            NodeKind::Break => self.loop_exit(node, "break"),
            NodeKind::Continue => self.loop_exit(node, "continue"),
            NodeKind::End => Ok(fragment!(node => ["__varslist[0]['終']();"])),
            NodeKind::Number { value } => Ok(fragment!(node => [value.to_string()])),
            NodeKind::String { value, mode } => self.string(node, value, *mode),
            NodeKind::DefLocalVar {
                name,
                value,
                vartype,
            } => self.def_local_var(node, name, value.as_deref(), *vartype),
            NodeKind::Let { name, value } => self.assign(node, name, value.as_deref()),
            NodeKind::Word { value } | NodeKind::Variable { value } => {
                Ok(fragment!(node => [self.variable_ref(value, node)?]))
            }
            NodeKind::Op {
                operator,
                left,
                right,
            }
            | NodeKind::Calc {
                operator,
                left,
                right,
            } => self.operator(node, operator, left, right),
            NodeKind::Renbun { left, right } => self.renbun(node, left, right),
            NodeKind::Not { value } => {
                let value = self.convert(value)?;
                Ok(fragment!(node => ["((", value, ")?0:1)"]))
            }
            NodeKind::Func(call) | NodeKind::CalcFunc(call) => self.call(node, call, false),
            NodeKind::FuncPointer(call) => self.call(node, call, true),
            NodeKind::If {
                expr,
                block,
                false_block,
            } => self.if_(node, expr, block, false_block.as_deref()),
            NodeKind::Promise { blocks } => self.promise(node, blocks),
            NodeKind::For {
                word,
                from,
                to,
                block,
            } => self.for_(node, word.as_deref(), from, to, block),
            NodeKind::Foreach {
                target,
                name,
                block,
            } => self.foreach(node, target.as_deref(), name.as_deref(), block),
            NodeKind::RepeatTimes { value, block } => self.repeat_times(node, value, block),
            NodeKind::While { cond, block } => self.while_(node, cond, block),
            NodeKind::Switch { value, cases } => self.switch(node, value, cases),
            NodeKind::LetArray { name, index, value } => self.let_array(node, name, index, value),
            NodeKind::RefArray { name, index } => self.ref_array(node, name, index),
            NodeKind::JsonArray { value } => self.json_array(node, value),
            NodeKind::JsonObj { value } => self.json_obj(node, value),
            NodeKind::FuncObj { block } => {
                let meta = node.info.meta.clone().unwrap_or_default();
                self.function_body(node, None, &meta.varnames, block)
            }
            NodeKind::Bool { value } => Ok(fragment!(node => [if *value { "true" } else { "false" }])),
            NodeKind::Null => Ok(fragment!(node => ["null"])),
            NodeKind::DefTest { name, block } => self.def_test(node, name, block),
            NodeKind::DefFunc { name, block } => self.def_func(node, name, block),
            NodeKind::Return { value } => self.return_(node, value.as_deref()),
            NodeKind::TryExcept { block, err_block } => self.try_except(node, block, err_block),
            NodeKind::Require { value } => {
                let marker = self.line_marker(node);
                Ok(fragment!(node => [
                    marker,
                    "__module['", value, "'] = require('", value, "');\n",
                ]))
            }
        }
    }

    /// Shortcuts, deferred definitions, plugin initializers and tests.
    fn header(&mut self) -> CodeFragment {
        let mut code = fragment!([
            "const __self = this.__self = this;\n",
            "const __varslist = this.__varslist;\n",
            "const __module = this.__module;\n",
            "const __v0 = this.__v0 = this.__varslist[0];\n",
            "const __v1 = this.__v1 = this.__varslist[1];\n",
            "let __vars = this.__vars = this.__varslist[this.__varslist.length - 1];\n",
            CALL_PLUGIN_HELPER,
        ]);

        let mut definitions = CodeFragment::new();
        for (name, body) in &self.definitions {
            definitions.append(fragment!([
                "//[DEF_FUNC name='", name, "']\n",
                "__v1[\"", name, "\"]=", body.clone(), ";\n;",
                "//[/DEF_FUNC name='", name, "']\n",
            ]));
        }
        if !definitions.is_empty() {
            code.append("__v0.line=0;// function definitions\n");
            code.append(definitions);
        }

        let mut initializers = CodeFragment::new();
        for (module, key) in self.registry.init_functions() {
            debug!(module; "Plugin initializer scheduled");
            initializers.append(format!("__v0[\"{key}\"](__self);\n"));
            self.used.insert(key);
        }
        if !initializers.is_empty() {
            code.append("__v0.line=0;// plugin initialization\n");
            code.append(initializers);
        }

        code.append("__vars[\"それ\"] = '';\n");

        if self.options.is_test {
            let mut tests = CodeFragment::new();
            for body in self.tests.values() {
                tests.append(body.clone());
                tests.append(";\n;");
            }
            if !tests.is_empty() {
                code.append("__v0.line=0;// test definitions\n");
                code.append(tests);
                code.append("\n");
            }
        }
        code
    }
}

/// The identifier named by a `word` or `variable` node.
fn identifier(node: &Node) -> Result<&str, GenError> {
    node.name().ok_or_else(|| {
        GenError::at(
            node,
            GenErrorKind::UnexpectedNode {
                expected: "word",
                found: node.kind.name(),
            },
        )
    })
}

/// A function's name without its trailing hiragana inflection.
///
/// A name made only of hiragana is kept as written.
pub fn function_name(name: &str) -> &str {
    let stem = name.trim_end_matches(|c| ('ぁ'..='ん').contains(&c));
    if stem.is_empty() { name } else { stem }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_name_strips_inflection() {
        assert_eq!(function_name("足す"), "足");
        assert_eq!(function_name("表示する"), "表示");
        assert_eq!(function_name("ABC"), "ABC");
        assert_eq!(function_name("すべて"), "すべて");
    }

    #[test]
    fn test_reset_keeps_plugin_initializers() {
        let mut globals = GlobalScope::new();
        globals.used.insert("!PluginSystem:初期化".to_string());
        globals.used.insert("表示".to_string());
        globals.frame.declare("A");

        globals.reset();

        assert_eq!(
            globals.used_functions().collect::<Vec<_>>(),
            ["!PluginSystem:初期化"]
        );
        assert!(!globals.frame().contains("A"));
        assert!(globals.frame().contains(SORE));
    }
}
