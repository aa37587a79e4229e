//! Child ordering: most specific matchers first.

use crate::model::{Node, NodeKind};

/// Match rank: fixed literals are strictly most specific, lists next,
/// wildcards last.
fn rank(node: &Node) -> u8 {
    match node.kind {
        NodeKind::Fixed(_) => 0,
        NodeKind::List(_) => 1,
        NodeKind::Variable(_) => 2,
    }
}

/// Stable in-place reorder of every node's children so that no fixed child
/// ever follows a list or variable sibling. Relative order among same-rank
/// children is preserved.
pub fn sort_tree(node: &mut Node) {
    node.children.sort_by_key(rank);
    for child in &mut node.children {
        sort_tree(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn given_mixed_children_when_sorting_then_fixed_list_variable_order() {
        let mut node = Node::fixed("parent", 4);
        node.children.push(Node::variable(BTreeSet::new(), 1));
        node.children.push(Node::fixed("b", 1));
        node.children.push(Node::list(["x".to_string()].into(), 1));
        node.children.push(Node::fixed("a", 1));

        sort_tree(&mut node);

        assert_eq!(node.children[0].element(), Some("b"));
        assert_eq!(node.children[1].element(), Some("a"));
        assert!(node.children[2].is_list());
        assert!(node.children[3].is_variable());
    }

    #[test]
    fn given_nested_tree_when_sorting_then_recursive() {
        let mut inner = Node::fixed("inner", 2);
        inner.children.push(Node::variable(BTreeSet::new(), 1));
        inner.children.push(Node::fixed("lit", 1));
        let mut root = Node::fixed("root", 2);
        root.children.push(inner);

        sort_tree(&mut root);

        let inner = &root.children[0];
        assert_eq!(inner.children[0].element(), Some("lit"));
        assert!(inner.children[1].is_variable());
    }
}
