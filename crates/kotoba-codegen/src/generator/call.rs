//! Function calls and particle checking.

use kotoba_core::{
    ast::{Call, Node},
    registry::Entry,
};
use log::trace;

use super::{Generator, SORE_REF, function_name};
use crate::{
    error::{GenError, GenErrorKind},
    fragment,
    fragment::CodeFragment,
    scope::PLUGIN_TIER,
};

/// How a resolved function is invoked.
enum Callee {
    /// Through the plugin helper, by name.
    Plugin,
    /// Directly, through this expression.
    Direct(String),
}

impl Generator<'_> {
    pub(super) fn call(
        &mut self,
        node: &Node,
        call: &Call,
        pointer: bool,
    ) -> Result<CodeFragment, GenError> {
        let name = if self.scope.find(&call.name).is_some() {
            call.name.as_str()
        } else {
            function_name(&call.name)
        };
        let Some(resolved) = self.scope.find(name) else {
            return Err(GenError::at(
                node,
                GenErrorKind::UnknownFunction {
                    name: name.to_string(),
                    plugins: self.registry.modules().map(str::to_string).collect(),
                },
            ));
        };

        let (callee, josi, returns_value) = if resolved.tier == PLUGIN_TIER {
            match self.registry.get(name) {
                Some(Entry::Func {
                    josi,
                    returns_value,
                }) => (Callee::Plugin, Some(josi.clone()), *returns_value),
                _ => {
                    return Err(GenError::at(
                        node,
                        GenErrorKind::NotAFunction {
                            name: name.to_string(),
                        },
                    ));
                }
            }
        } else {
            let expression = if resolved.innermost {
                format!("__vars[\"{name}\"]")
            } else {
                format!("__varslist[{}][\"{name}\"]", resolved.tier)
            };
            let josi = self.functions.get(name).map(|function| function.josi.clone());
            (Callee::Direct(expression), josi, true)
        };
        self.used.insert(name.to_string());

        if pointer {
            return Ok(match callee {
                Callee::Plugin => fragment!(node => ["__v0[\"", name, "\"]"]),
                Callee::Direct(expression) => fragment!(node => [expression]),
            });
        }

        if let Some(patterns) = &josi {
            check_particles(node, name, call, patterns)?;
        }

        let mut args = CodeFragment::new();
        let mut reads_sore = false;
        for (index, arg) in call.args.iter().enumerate() {
            match arg {
                Some(arg) => args.append(self.convert(arg)?),
                None if index == 0 => {
                    reads_sore = true;
                    args.append(SORE_REF);
                }
                None => args.append("null"),
            }
        }
        args.append("__self");
        let args = args.join(",");

        let invocation = match callee {
            Callee::Plugin => fragment!(["__callPlugin(\"", name, "\", __v0[\"", name, "\"], [", args, "])"]),
            Callee::Direct(expression) => fragment!([expression, "(", args, ")"]),
        };
        let (mut begin, end) = if call.setter {
            (String::from(";__self.isSetter = true;"), ";__self.isSetter = false;")
        } else {
            (String::new(), "")
        };
        // Marks calls whose first argument was taken from `それ`.
        if reads_sore {
            begin.push_str("/*[sore]*/");
        }
        trace!(name, returns_value; "Call generated");

        if !returns_value {
            let marker = self.line_marker(node);
            return Ok(fragment!(node => [marker, begin, invocation, ";", end, "\n"]));
        }
        let mut code = fragment!(node => [
            "(function(){ ", begin,
            "const tmp=", SORE_REF, "=", invocation, ";",
            end, " return tmp; }).call(this)",
        ]);
        if node.info.josi == "して" {
            code.append(";\n");
        }
        Ok(code)
    }
}

/// Reject calls passing more arguments, or other particles, than `patterns` accepts.
fn check_particles(
    node: &Node,
    name: &str,
    call: &Call,
    patterns: &[Vec<String>],
) -> Result<(), GenError> {
    if call.args.len() > patterns.len() {
        return Err(GenError::at(
            node,
            GenErrorKind::TooManyArguments {
                name: name.to_string(),
                given: call.args.len(),
                accepted: patterns.len(),
            },
        ));
    }
    for (position, (arg, expected)) in call.args.iter().zip(patterns).enumerate() {
        let Some(arg) = arg else {
            continue;
        };
        let josi = &arg.info.josi;
        if josi.is_empty() || expected.is_empty() || expected.contains(josi) {
            continue;
        }
        return Err(GenError::at(
            arg,
            GenErrorKind::ParticleMismatch {
                name: name.to_string(),
                position: position + 1,
                josi: josi.clone(),
                expected: expected.clone(),
            },
        ));
    }
    Ok(())
}
