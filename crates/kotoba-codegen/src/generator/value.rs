//! Literals, names, assignments and expressions.

use std::sync::LazyLock;

use kotoba_core::{
    ast::{JsonEntry, Node, StringMode, VarType},
    registry::Entry,
};
use log::trace;
use regex::Regex;

use super::{Generator, SORE_REF, identifier};
use crate::{
    error::{GenError, GenErrorKind},
    fragment,
    fragment::CodeFragment,
    scope::PLUGIN_TIER,
};

/// `{name}` and `｛name｝` references inside an interpolating string.
static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(.+?)\}|｛(.+?)｝").expect("interpolation pattern"));

/// JavaScript spelling of the comparison and logic operators.
fn js_operator(operator: &str) -> &str {
    match operator {
        "&" => "+\"\"+",
        "eq" => "==",
        "noteq" => "!=",
        "gt" => ">",
        "lt" => "<",
        "gteq" => ">=",
        "lteq" => "<=",
        "and" => "&&",
        "or" => "||",
        "shift_l" => "<<",
        "shift_r" => ">>",
        "shift_r0" => ">>>",
        other => other,
    }
}

fn is_arithmetic(operator: &str) -> bool {
    matches!(operator, "+" | "-" | "*" | "/" | "%" | "^")
}

fn escape_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

impl Generator<'_> {
    pub(super) fn comment(&mut self, node: &Node, value: &str) -> CodeFragment {
        let marker = self.line_marker(node);
        let text = value.replace('\n', "¶");
        match (text.is_empty(), marker.is_empty()) {
            (true, true) => fragment!(node => [";"]),
            (true, false) => fragment!(node => [";", marker, "\n"]),
            (false, _) => fragment!(node => [";", marker, "//", text, "\n"]),
        }
    }

    pub(super) fn string(
        &mut self,
        node: &Node,
        value: &str,
        mode: StringMode,
    ) -> Result<CodeFragment, GenError> {
        let mut text = escape_string(value);
        if mode == StringMode::Ex {
            let mut interpolated = String::with_capacity(text.len());
            let mut last = 0;
            for captures in INTERPOLATION.captures_iter(&text) {
                let (Some(whole), Some(name)) = (captures.get(0), captures.get(1).or(captures.get(2)))
                else {
                    continue;
                };
                interpolated.push_str(&text[last..whole.start()]);
                interpolated.push_str("\"+");
                interpolated.push_str(&self.variable_ref(name.as_str(), node)?);
                interpolated.push_str("+\"");
                last = whole.end();
            }
            interpolated.push_str(&text[last..]);
            text = interpolated;
        }
        Ok(fragment!(node => ["\"", text, "\""]))
    }

    /// The JavaScript expression reading `name`.
    pub(super) fn variable_ref(&mut self, name: &str, node: &Node) -> Result<String, GenError> {
        let Some(resolved) = self.scope.find(name) else {
            trace!(name; "Unresolved name read from the current frame");
            let line = node.info.line.map(|line| line.to_string()).unwrap_or_default();
            return Ok(format!("__vars[\"{name}\"]/*?:{line}*/"));
        };

        if resolved.tier == PLUGIN_TIER {
            return match self.registry.get(name) {
                Some(Entry::Func { josi, .. }) if josi.is_empty() => {
                    self.used.insert(name.to_string());
                    Ok(format!("(__varslist[0][\"{name}\"]())"))
                }
                Some(Entry::Func { .. }) => Err(GenError::at(
                    node,
                    GenErrorKind::FunctionAsValue {
                        name: name.to_string(),
                    },
                )),
                _ => Ok(format!("__varslist[0][\"{name}\"]")),
            };
        }
        if resolved.innermost {
            Ok(format!("__vars[\"{name}\"]"))
        } else {
            Ok(format!("__varslist[{}][\"{name}\"]", resolved.tier))
        }
    }

    /// Assignment target for `name`, declaring it in the current frame when unknown.
    pub(super) fn assign_target(&mut self, node: &Node, name: &str) -> Result<String, GenError> {
        let Some(resolved) = self.scope.find(name) else {
            self.scope.innermost_mut().declare(name);
            return Ok(format!("__vars[\"{name}\"]"));
        };
        if self.scope.is_readonly(resolved.tier, name) {
            return Err(GenError::at(
                node,
                GenErrorKind::AssignToConstant {
                    name: name.to_string(),
                },
            ));
        }
        if resolved.innermost {
            Ok(format!("__vars[\"{name}\"]"))
        } else {
            Ok(format!("__varslist[{}][\"{name}\"]", resolved.tier))
        }
    }

    pub(super) fn assign(
        &mut self,
        node: &Node,
        name: &Node,
        value: Option<&Node>,
    ) -> Result<CodeFragment, GenError> {
        let value = match value {
            Some(value) => self.convert(value)?,
            None => fragment!([SORE_REF]),
        };
        let target = self.assign_target(node, identifier(name)?)?;
        let marker = self.line_marker(node);
        Ok(fragment!(node => [";", marker, target, "=", value, ";\n"]))
    }

    pub(super) fn def_local_var(
        &mut self,
        node: &Node,
        name: &Node,
        value: Option<&Node>,
        vartype: VarType,
    ) -> Result<CodeFragment, GenError> {
        let value = match value {
            Some(value) => self.convert(value)?,
            None => fragment!(["null"]),
        };
        let name = identifier(name)?;
        let frame = self.scope.innermost_mut();
        if frame.contains(name) {
            return Err(GenError::at(
                node,
                GenErrorKind::DuplicateDeclaration {
                    name: name.to_string(),
                    vartype,
                },
            ));
        }
        match vartype {
            VarType::Constant => frame.declare_readonly(name),
            VarType::Variable => frame.declare(name),
        }

        let marker = self.line_marker(node);
        Ok(fragment!(node => [marker, "__vars[\"", name, "\"]=", value, ";\n"]))
    }

    pub(super) fn operator(
        &mut self,
        node: &Node,
        operator: &str,
        left: &Node,
        right: &Node,
    ) -> Result<CodeFragment, GenError> {
        let mut left = self.convert(left)?;
        let mut right = self.convert(right)?;
        if is_arithmetic(operator) {
            left = fragment!(["parseFloat(", left, ")"]);
            right = fragment!(["parseFloat(", right, ")"]);
        }
        if operator == "^" {
            return Ok(fragment!(node => ["(Math.pow(", left, ",", right, "))"]));
        }
        Ok(fragment!(node => ["(", left, " ", js_operator(operator), " ", right, ")"]))
    }

    /// Evaluate `left` for its effect, then yield `right`.
    pub(super) fn renbun(
        &mut self,
        node: &Node,
        left: &Node,
        right: &Node,
    ) -> Result<CodeFragment, GenError> {
        let right = self.convert(right)?;
        let left = self.convert(left)?;
        Ok(fragment!(node => [
            "(function(){", left, "; return ", right, "}).call(this)",
        ]))
    }

    pub(super) fn ref_array(
        &mut self,
        node: &Node,
        name: &Node,
        index: &[Node],
    ) -> Result<CodeFragment, GenError> {
        let mut code = fragment!(node => [self.convert(name)?]);
        for index in index {
            code.append("[");
            code.append(self.convert(index)?);
            code.append("]");
        }
        Ok(code)
    }

    pub(super) fn let_array(
        &mut self,
        node: &Node,
        name: &Node,
        index: &[Node],
        value: &Node,
    ) -> Result<CodeFragment, GenError> {
        let value = self.convert(value)?;
        let target = self.ref_array(node, name, index)?;
        let marker = self.line_marker(node);
        Ok(fragment!(node => [marker, target, " = ", value, ";\n"]))
    }

    pub(super) fn json_array(
        &mut self,
        node: &Node,
        value: &[Node],
    ) -> Result<CodeFragment, GenError> {
        let mut items = CodeFragment::new();
        for item in value {
            items.append(self.convert(item)?);
        }
        Ok(fragment!(node => ["[", items.join(","), "]"]))
    }

    pub(super) fn json_obj(
        &mut self,
        node: &Node,
        value: &[JsonEntry],
    ) -> Result<CodeFragment, GenError> {
        let mut members = CodeFragment::new();
        for entry in value {
            let key = self.convert(&entry.key)?;
            let value = self.convert(&entry.value)?;
            members.append(fragment!([key, ":", value]));
        }
        Ok(fragment!(node => ["{", members.join(","), "}"]))
    }
}
