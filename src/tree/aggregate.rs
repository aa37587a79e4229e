//! Aggregation of single-child token runs.

use crate::model::{Node, NodeKind};
use crate::tree::subtrees::{fingerprint, SharedSubtreeRegistry};

/// Collapses maximal chains of single-child fixed nodes into one multi-token
/// fixed node, so a parser needs one comparison where the tree needed many.
///
/// A run never crosses a registered shared subtree (its structure must stay
/// exactly as registered) and never absorbs past a node where lines
/// terminate mid-run (the template ending there would be lost). Registered
/// subtrees are left untouched inside as well.
#[derive(Debug)]
pub struct Aggregator<'a> {
    registry: &'a SharedSubtreeRegistry,
}

impl<'a> Aggregator<'a> {
    pub fn new(registry: &'a SharedSubtreeRegistry) -> Self {
        Self { registry }
    }

    /// Aggregate runs below `node`; the node itself never joins a run.
    pub fn aggregate(&self, node: &mut Node) {
        for child in &mut node.children {
            if self.registry.contains(&fingerprint(child)) {
                continue;
            }
            self.collapse_run(child);
            self.aggregate(child);
        }
    }

    /// Extend a run starting at `node` as far as the rules allow, absorbing
    /// each single fixed child into the node element.
    fn collapse_run(&self, node: &mut Node) {
        if !node.is_fixed() {
            return;
        }
        loop {
            if node.end || node.children.len() != 1 {
                break;
            }
            let next = &node.children[0];
            if !next.is_fixed() || self.registry.contains(&fingerprint(next)) {
                break;
            }

            // Absorb: concatenated element, the last node's end flag,
            // occurrence, and children. With no mid-run terminations the
            // occurrences are equal anyway.
            let next = node.children.remove(0);
            if let (NodeKind::Fixed(element), NodeKind::Fixed(suffix)) = (&mut node.kind, &next.kind)
            {
                element.push_str(suffix);
            }
            node.end = next.end;
            node.occurrence = next.occurrence;
            node.children = next.children;
        }
    }
}
