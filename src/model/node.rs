//! Tree nodes of the template model.

use std::collections::BTreeSet;
use std::fmt;

use crate::model::Datatype;

/// Placeholder glyph for generalized positions in dumps and templates.
pub const WILDCARD: char = '§';

/// Identifier assigned in one deterministic depth-first pass at serialization
/// time, never before and never reused.
pub type NodeId = usize;

/// What a node matches at its token position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A literal token, or a concatenated token run after aggregation.
    Fixed(String),
    /// A wildcard, optionally narrowed by inferred datatypes.
    /// An empty set means a generic string position.
    Variable(BTreeSet<Datatype>),
    /// Enumerated interchangeable literals.
    List(BTreeSet<String>),
}

/// A position in the template tree.
///
/// Children are ordered and exclusively owned: the model is a tree, never a
/// graph. `occurrence` counts training lines whose path passes through the
/// node; lines may also terminate here (`end`) while siblings continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    pub occurrence: usize,
    pub end: bool,
    pub id: Option<NodeId>,
}

impl Node {
    pub fn fixed(element: impl Into<String>, occurrence: usize) -> Self {
        Self {
            kind: NodeKind::Fixed(element.into()),
            children: Vec::new(),
            occurrence,
            end: false,
            id: None,
        }
    }

    pub fn variable(datatypes: BTreeSet<Datatype>, occurrence: usize) -> Self {
        Self {
            kind: NodeKind::Variable(datatypes),
            children: Vec::new(),
            occurrence,
            end: false,
            id: None,
        }
    }

    pub fn list(values: BTreeSet<String>, occurrence: usize) -> Self {
        Self {
            kind: NodeKind::List(values),
            children: Vec::new(),
            occurrence,
            end: false,
            id: None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.kind, NodeKind::Fixed(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, NodeKind::Variable(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, NodeKind::List(_))
    }

    /// Literal element of a fixed node.
    pub fn element(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Fixed(element) => Some(element),
            _ => None,
        }
    }

    /// Number of nodes in this subtree, including self.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }

    /// Node count of the longest root-to-leaf path, including self.
    pub fn height(&self) -> usize {
        1 + self.children.iter().map(Node::height).max().unwrap_or(0)
    }

    /// Training lines terminating exactly at this node.
    ///
    /// Derived from the occurrence invariant: children occurrences sum to the
    /// node occurrence minus the terminating lines.
    pub fn terminal_count(&self) -> usize {
        let passed: usize = self.children.iter().map(|c| c.occurrence).sum();
        self.occurrence.saturating_sub(passed)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Fixed(element) => write!(f, "{}", element),
            NodeKind::Variable(_) => write!(f, "{}", WILDCARD),
            NodeKind::List(values) => {
                write!(f, "{}[", WILDCARD)?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}
