//! Used-function analysis.

use kotoba_codegen::generator::function_name;
use kotoba_core::{
    ast::{Node, NodeKind},
    registry::Registry,
};

/// Registry functions called or referenced by `program`, sorted and deduplicated.
///
/// User-defined functions and unknown names are not reported.
pub fn used_functions(program: &Node, registry: &Registry) -> Vec<String> {
    let mut used = Vec::new();
    program.walk(&mut |node| {
        let (NodeKind::Func(call) | NodeKind::FuncPointer(call) | NodeKind::CalcFunc(call)) =
            &node.kind
        else {
            return;
        };
        let name = if registry.contains(&call.name) {
            call.name.as_str()
        } else {
            function_name(&call.name)
        };
        if registry.get(name).is_some_and(|entry| entry.is_func()) {
            used.push(name.to_string());
        }
    });
    used.sort();
    used.dedup();
    used
}
