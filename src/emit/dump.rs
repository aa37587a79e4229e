//! Textual tree dump via `termtree`.

use itertools::Itertools;
use termtree::Tree;

use crate::model::{Node, NodeKind, WILDCARD};

/// Render the tree for the dump artifact. One line per node, children
/// indented under their parent in depth-first order.
pub fn dump_tree(node: &Node) -> String {
    render(node).to_string()
}

fn render(node: &Node) -> Tree<String> {
    let leaves: Vec<_> = node.children.iter().map(render).collect();
    Tree::new(label(node)).with_leaves(leaves)
}

/// One structural summary per node. Fixed elements are quoted because
/// delimiter tokens are often pure whitespace.
fn label(node: &Node) -> String {
    let kind = match &node.kind {
        NodeKind::Fixed(element) => format!("'{}'", element),
        NodeKind::Variable(datatypes) if datatypes.is_empty() => WILDCARD.to_string(),
        NodeKind::Variable(datatypes) => {
            format!("{}<{}>", WILDCARD, datatypes.iter().map(|d| d.tag()).join("|"))
        }
        NodeKind::List(_) => node.kind.to_string(),
    };

    let mut annotations = Vec::new();
    if let Some(id) = node.id {
        annotations.push(format!("id={}", id));
    }
    annotations.push(format!("occ={}", node.occurrence));
    if node.end {
        annotations.push("end".to_string());
    }
    format!("{} ({})", kind, annotations.join(", "))
}
