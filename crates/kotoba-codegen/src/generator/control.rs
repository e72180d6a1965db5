//! Branches, loops, function bodies and other statements with blocks.

use std::mem;

use kotoba_core::ast::{Node, SwitchArm};
use log::{debug, trace};

use super::{Generator, SORE, SORE_REF, function_name, identifier};
use crate::{
    error::{GenError, GenErrorKind},
    fragment,
    fragment::CodeFragment,
    scope::{ScopeFrame, Scoped},
};

impl Generator<'_> {
    pub(super) fn loop_exit(&mut self, node: &Node, command: &str) -> Result<CodeFragment, GenError> {
        if !self.in_loop {
            let keyword = if command == "break" { "抜ける" } else { "続ける" };
            return Err(GenError::at(node, GenErrorKind::LoopExitOutsideLoop { keyword }));
        }
        let marker = self.line_marker(node);
        Ok(fragment!(node => [marker, command, ";"]))
    }

    pub(super) fn if_(
        &mut self,
        node: &Node,
        expr: &Node,
        block: &Node,
        false_block: Option<&Node>,
    ) -> Result<CodeFragment, GenError> {
        let marker = self.line_marker(node);
        let expr = self.convert(expr)?;
        let block = self.convert(block)?;
        let mut code = fragment!(node => [marker, "if (", expr, ") {\n  ", block, "\n}"]);
        if let Some(false_block) = false_block {
            let false_block = self.convert(false_block)?;
            code.append(fragment!(["else {", false_block, "};\n"]));
        }
        code.append(";\n");
        Ok(code)
    }

    /// Declare a loop variable in the current frame, shadowing any outer name.
    fn loop_variable(&mut self, word: &Node) -> Result<String, GenError> {
        let name = identifier(word)?;
        let frame = self.scope.innermost_mut();
        if frame.is_readonly(name) {
            return Err(GenError::at(
                word,
                GenErrorKind::AssignToConstant {
                    name: name.to_string(),
                },
            ));
        }
        frame.declare(name);
        trace!(name; "Loop variable declared");
        Ok(format!("__vars[\"{name}\"]"))
    }

    /// Counting loop whose direction is decided when it runs.
    pub(super) fn for_(
        &mut self,
        node: &Node,
        word: Option<&Node>,
        from: &Node,
        to: &Node,
        block: &Node,
    ) -> Result<CodeFragment, GenError> {
        let marker = self.line_marker(node);
        let word = match word {
            Some(word) => self.loop_variable(word)?,
            None => "__vars['__dummy__']".to_string(),
        };
        let id = self.next_id();
        let from = self.convert(from)?;
        let to = self.convert(to)?;
        let block = self.convert_in_loop(block)?;

        let from_var = format!("$kotoba_from{id}");
        let to_var = format!("$kotoba_to{id}");
        let i = format!("$kotoba_i{id}");
        Ok(fragment!(node => [
            marker,
            "\n//[FOR id=", id, "]\n",
            "const ", from_var.clone(), " = ", from, ";\n",
            "const ", to_var.clone(), " = ", to, ";\n",
            format!("if ({from_var} <= {to_var}) {{ // up\n"),
            format!("  for (let {i} = {from_var}; {i} <= {to_var}; {i}++) {{\n"),
            format!("    {SORE_REF} = {word} = {i};\n"),
            "    ", block.clone(), "\n",
            "  };\n",
            "} else { // down\n",
            format!("  for (let {i} = {from_var}; {i} >= {to_var}; {i}--) {{\n"),
            format!("    {SORE_REF} = {word} = {i};\n"),
            "    ", block, "\n",
            "  };\n",
            "};\n",
            "//[/FOR id=", id, "]\n",
        ]))
    }

    pub(super) fn foreach(
        &mut self,
        node: &Node,
        target: Option<&Node>,
        name: Option<&Node>,
        block: &Node,
    ) -> Result<CodeFragment, GenError> {
        let marker = self.line_marker(node);
        let target = match target {
            Some(target) => self.convert(target)?,
            None => fragment!([SORE_REF]),
        };
        let name = match name {
            Some(name) => self.loop_variable(name)?,
            None => "__v0[\"対象\"]".to_string(),
        };
        let id = self.next_id();
        let block = self.convert_in_loop(block)?;

        let list = format!("$kotoba_foreach_v{id}");
        let i = format!("$kotoba_i{id}");
        Ok(fragment!(node => [
            marker,
            "let ", list.clone(), "=", target, ";\n",
            format!("for (let {i} in {list}){{\n"),
            format!("  if ({list}.hasOwnProperty({i})) {{\n"),
            format!("    {name} = {SORE_REF} = {list}[{i}];\n"),
            format!("    __v0[\"対象キー\"] = {i};\n"),
            "    ", block, "\n",
            "  }\n",
            "};\n",
        ]))
    }

    pub(super) fn repeat_times(
        &mut self,
        node: &Node,
        value: &Node,
        block: &Node,
    ) -> Result<CodeFragment, GenError> {
        let marker = self.line_marker(node);
        let id = self.next_id();
        let value = self.convert(value)?;
        let block = self.convert_in_loop(block)?;

        let i = format!("$kotoba_i{id}");
        Ok(fragment!(node => [
            marker,
            format!("for(var {i} = 1; {i} <= "), value, format!("; {i}++){{\n"),
            format!("  {SORE_REF} = __v0[\"回数\"] = {i};\n"),
            "  ", block, "\n",
            "}\n",
        ]))
    }

    pub(super) fn while_(
        &mut self,
        node: &Node,
        cond: &Node,
        block: &Node,
    ) -> Result<CodeFragment, GenError> {
        let marker = self.line_marker(node);
        let cond = self.convert(cond)?;
        let block = self.convert_in_loop(block)?;
        Ok(fragment!(node => [marker, "while (", cond, "){\n  ", block, "\n}\n"]))
    }

    pub(super) fn switch(
        &mut self,
        node: &Node,
        value: &Node,
        cases: &[SwitchArm],
    ) -> Result<CodeFragment, GenError> {
        let marker = self.line_marker(node);
        let value = self.convert(value)?;
        let mut arms = CodeFragment::new();
        for arm in cases {
            match &arm.value {
                Some(label) => arms.append(fragment!(["  case ", self.convert(label)?, ":\n"])),
                None => arms.append("  default:\n"),
            }
            let block = self.convert_in_loop(&arm.block)?;
            arms.append(fragment!(["    ", block, "\n    break\n"]));
        }
        Ok(fragment!(node => [marker, "switch (", value, "){\n", arms, "\n}\n"]))
    }

    pub(super) fn try_except(
        &mut self,
        node: &Node,
        block: &Node,
        err_block: &Node,
    ) -> Result<CodeFragment, GenError> {
        let marker = self.line_marker(node);
        let block = self.convert(block)?;
        let err_block = self.convert(err_block)?;
        Ok(fragment!(node => [
            marker,
            "try {\n", block, "\n} catch (e) {\n",
            "__varslist[0][\"エラーメッセージ\"] = e.message;\n;\n",
            err_block, "}\n",
        ]))
    }

    /// Run each block in turn, waiting for asynchronous plugins to resolve.
    pub(super) fn promise(&mut self, node: &Node, blocks: &[Node]) -> Result<CodeFragment, GenError> {
        let marker = self.line_marker(node);
        let pid = format!("__pid{}", self.next_id());
        let mut steps = CodeFragment::new();
        for block in blocks {
            let block = self.convert(block)?;
            steps.append(fragment!([
                "await new Promise((resolve) => {\n",
                "  __self.resolve = resolve;\n",
                "  __self.resolveCount = 0;\n  ",
                block,
                "\n\n  if (__self.resolveCount === 0) resolve();\n\n})\n",
            ]));
        }
        Ok(fragment!(node => [
            marker,
            "const ", pid.clone(), " = async () => {\n",
            steps,
            "};/* ", pid.clone(), " */\n",
            pid, "();\n",
            "__self.resolve = undefined;\n",
        ]))
    }

    /// A JavaScript function expression running `block` in a fresh frame.
    pub(super) fn function_body(
        &mut self,
        node: &Node,
        name: Option<&str>,
        varnames: &[String],
        block: &Node,
    ) -> Result<CodeFragment, GenError> {
        let mut frame = ScopeFrame::for_function(name.unwrap_or_default());
        frame.declare(SORE);
        frame.declare("引数");
        let mut head = fragment!([
            "(function(){\n",
            "try {\n",
            "  __vars = {'それ':''};\n",
            "  __varslist.push(__vars);\n",
            "  __vars['引数'] = arguments;\n",
        ]);
        for (index, varname) in varnames.iter().enumerate() {
            frame.declare(varname.as_str());
            head.append(format!("  __vars['{varname}'] = arguments[{index}];\n"));
        }

        let saved_loop = mem::replace(&mut self.in_loop, false);
        let saved_line = self.last_line.take();
        let body = {
            let mut guard = self.enter(frame);
            guard.convert(block)
        };
        self.in_loop = saved_loop;
        self.last_line = saved_line;

        Ok(fragment!(node => [
            head,
            body?,
            "\n  return (__vars[\"それ\"]);\n",
            "} finally {\n",
            "  __varslist.pop(); __vars = __varslist[__varslist.length-1];\n",
            "}\n",
            "})",
        ]))
    }

    /// Generate a named function into the definitions block.
    pub(super) fn def_func(
        &mut self,
        node: &Node,
        name: &Node,
        block: &Node,
    ) -> Result<CodeFragment, GenError> {
        let function = function_name(identifier(name)?);
        let meta = name.info.meta.clone().unwrap_or_default();
        if !self.functions.contains_key(function) {
            self.declare_function(function, meta.josi.clone());
        }
        let body = self.function_body(node, Some(function), &meta.varnames, block)?;
        debug!(function; "Function generated");
        self.definitions.insert(function.to_string(), body);
        Ok(CodeFragment::from_node(node))
    }

    /// Generate a test case into the test block.
    pub(super) fn def_test(
        &mut self,
        node: &Node,
        name: &Node,
        block: &Node,
    ) -> Result<CodeFragment, GenError> {
        let name = identifier(name)?;
        let block = self.convert(block)?;
        trace!(name; "Test generated");
        self.tests.insert(
            name.to_string(),
            fragment!(node => [
                "describe('test', () => {\n",
                " it('", name, "', () => {\n",
                "   ", block, "\n",
                " })\n",
                "})",
            ]),
        );
        Ok(CodeFragment::from_node(node))
    }

    pub(super) fn return_(&mut self, node: &Node, value: Option<&Node>) -> Result<CodeFragment, GenError> {
        if self.scope.enclosing_function().is_none() {
            return Err(GenError::at(node, GenErrorKind::ReturnOutsideFunction));
        }
        let marker = self.line_marker(node);
        let value = match value {
            Some(value) => self.convert(value)?,
            None => fragment!([SORE_REF]),
        };
        Ok(fragment!(node => [marker, "return ", value, ";"]))
    }
}
