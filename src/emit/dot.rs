//! Graphviz DOT rendering of the final tree.
//!
//! Written when visualization is enabled; `dot -Tsvg` turns it into an
//! overview picture. Colors follow the tree-dump conventions: variable
//! positions blue (light when typed), fixed and list positions green when
//! lines terminate there, red otherwise, dark variants for lists.

use std::fmt::Write as _;

use crate::model::{Node, NodeKind};

pub fn render_dot(root: &Node) -> String {
    let mut out = String::from("digraph templates {\n");
    out.push_str("    node [shape=box, fontsize=10];\n");
    let mut next = 0;
    emit_node(root, &mut next, &mut out);
    out.push_str("}\n");
    out
}

fn emit_node(node: &Node, next: &mut usize, out: &mut String) -> usize {
    let index = *next;
    *next += 1;
    let _ = writeln!(
        out,
        "    n{} [label=\"{}\", color={}];",
        index,
        escape(&node.kind.to_string()),
        color(node)
    );
    for child in &node.children {
        let child_index = emit_node(child, next, out);
        let _ = writeln!(out, "    n{} -> n{};", index, child_index);
    }
    index
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

fn color(node: &Node) -> &'static str {
    match &node.kind {
        NodeKind::Variable(datatypes) if datatypes.is_empty() => "blue",
        NodeKind::Variable(_) => "lightblue",
        NodeKind::List(_) if node.end => "darkgreen",
        NodeKind::List(_) => "darkred",
        NodeKind::Fixed(_) if node.end => "green",
        NodeKind::Fixed(_) => "red",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn given_tree_when_rendering_then_one_edge_per_child() {
        let mut root = Node::fixed("root", 2);
        let mut mid = Node::fixed("a", 2);
        mid.children.push(Node::fixed("b", 2));
        root.children.push(mid);

        let dot = render_dot(&root);

        assert!(dot.starts_with("digraph templates {"));
        assert!(dot.trim_end().ends_with('}'));
        assert_eq!(dot.matches(" -> ").count(), 2);
        assert!(dot.contains("n0 -> n1"));
        assert!(dot.contains("n1 -> n2"));
    }

    #[test]
    fn given_quoted_element_when_rendering_then_escaped() {
        let root = Node::fixed("say \"hi\"", 1);

        let dot = render_dot(&root);

        assert!(dot.contains("label=\"say \\\"hi\\\"\""));
    }

    #[test]
    fn given_kinds_when_rendering_then_colors_follow_convention() {
        let mut root = Node::fixed("root", 3);
        root.children.push(Node::variable(BTreeSet::new(), 1));
        let mut list = Node::list(["x".to_string()].into(), 1);
        list.end = true;
        root.children.push(list);
        let mut fixed_end = Node::fixed("done", 1);
        fixed_end.end = true;
        root.children.push(fixed_end);

        let dot = render_dot(&root);

        assert!(dot.contains("color=red"), "inner fixed node");
        assert!(dot.contains("color=blue"), "untyped variable");
        assert!(dot.contains("color=darkgreen"), "terminal list");
        assert!(dot.contains("color=green"), "terminal fixed node");
    }
}
