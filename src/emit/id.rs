//! Node identifier assignment.

use crate::model::{Node, NodeId};

/// Hands out consecutive identifiers, starting at zero.
///
/// Kept as an explicit value rather than ambient state so independent runs
/// and tests get reproducible numbering.
#[derive(Debug, Default)]
pub struct IdIssuer {
    next: NodeId,
}

impl IdIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> NodeId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Count of identifiers issued so far.
    pub fn issued(&self) -> usize {
        self.next
    }
}

/// Number every node in depth-first pre-order. Identical trees always get
/// identical numbering.
pub fn assign_ids(node: &mut Node, issuer: &mut IdIssuer) {
    node.id = Some(issuer.issue());
    for child in &mut node.children {
        assign_ids(child, issuer);
    }
}
