use std::fmt::Write;

use itertools::Itertools;

use crate::ast::{Node, NodeKind};

/// Renders an analyzed node as an indented tree, one node per line:
/// `Kind <context> detail`.
pub fn pretty_print_ast(node: &Node) -> String {
    let mut result = String::new();
    write_node(&mut result, node, 0);
    result
}

fn write_node(result: &mut String, node: &Node, indent: usize) {
    let indent_str = "  ".repeat(indent);
    write!(result, "{}{} <{}>", indent_str, node.kind_name(), node.context()).unwrap();

    let detail = match &node.kind {
        NodeKind::Literal { value } | NodeKind::Quote { value } => Some(value.to_string()),
        NodeKind::LocalVar { name } => Some(name.to_string()),
        NodeKind::GlobalVar { namespace, name, meta } => {
            let flags = [("macro", meta.is_macro()), ("inline", meta.is_inline())]
                .iter()
                .filter(|(_, on)| *on)
                .map(|(flag, _)| *flag)
                .join(",");
            if flags.is_empty() {
                Some(format!("{}/{}", namespace, name))
            } else {
                Some(format!("{}/{} [{}]", namespace, name, flags))
            }
        }
        NodeKind::HostVar { name } | NodeKind::HostClassName { name } => Some(name.to_string()),
        NodeKind::MethodCall { method, .. } => Some(format!(".{}", method)),
        NodeKind::Fn { params, variadic, uses, .. } => Some(format!(
            "[{}]{}{}",
            params.iter().join(" "),
            if *variadic { " variadic" } else { "" },
            if uses.is_empty() { String::new() } else { format!(" uses [{}]", uses.iter().join(" ")) }
        )),
        NodeKind::Let { bindings, .. } => Some(format!(
            "[{}]",
            bindings.iter().map(|b| format!("{} as {}", b.symbol, b.shadow)).join(", ")
        )),
        NodeKind::Foreach { value_symbol, key_symbol, .. } => Some(match key_symbol {
            Some(key) => format!("[{} {}]", key, value_symbol),
            None => format!("[{}]", value_symbol),
        }),
        NodeKind::Catch { symbol, .. } => Some(symbol.to_string()),
        NodeKind::Recur { frame, .. } => Some(format!("-> frame {}", frame.id)),
        NodeKind::Def { namespace, name, .. } => Some(format!("{}/{}", namespace, name)),
        NodeKind::Ns { namespace, requires } => {
            Some(format!("{} requires [{}]", namespace, requires.iter().join(" ")))
        }
        _ => None,
    };
    if let Some(detail) = detail {
        write!(result, " {}", detail).unwrap();
    }

    for child in node.children() {
        result.push('\n');
        write_node(result, child, indent + 1);
    }
}
