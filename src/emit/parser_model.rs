//! Parser specification built from the final tree.
//!
//! The specification is a composition of typed match primitives that an
//! external parsing engine loads to classify unseen lines. Repeated subtrees
//! are emitted once as definitions and referenced from every use site.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{Datatype, Node, NodeKind};
use crate::tree::subtrees::{fingerprint, SharedSubtreeRegistry};

pub const PARSER_SPEC_VERSION: u32 = 1;

/// Top-level artifact: header, shared-subtree definitions, entry model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserSpec {
    pub version: u32,
    /// Delimiter tokens the tokenization contract splits on.
    pub delimiters: Vec<String>,
    pub subtrees: Vec<SubtreeDef>,
    pub model: ParserNode,
}

/// One shared-subtree definition, referenced via `subtree_ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtreeDef {
    pub id: usize,
    /// Distinct tree positions the fragment occurred at.
    pub sites: usize,
    pub root: ParserNode,
}

/// A match primitive with the template identifier of the tree node it came
/// from. Structural wrappers introduced during conversion carry no identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<usize>,
    #[serde(flatten)]
    pub primitive: MatchPrimitive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchPrimitive {
    /// Literal byte sequence, possibly spanning several original tokens
    /// after aggregation.
    Fixed { value: String },
    /// One token out of an enumerated literal set.
    WordList { values: Vec<String> },
    Integer,
    Float,
    DateTime,
    IpAddress,
    Hex,
    Base64,
    /// Token bounded by the next delimiter.
    Delimited,
    /// Remaining bytes of the line.
    AnyBytes,
    /// Primitives matched one after another.
    Sequence { elements: Vec<ParserNode> },
    /// Ordered alternatives, first successful branch wins.
    FirstMatch { branches: Vec<ParserNode> },
    /// Branch that may be absent because some lines end before it.
    Optional { element: Box<ParserNode> },
    /// Reference to a shared-subtree definition.
    SubtreeRef { subtree: usize },
}

/// Convert the final tree into a [`ParserSpec`].
///
/// The artificial root element is not emitted; the model starts with the
/// root's continuation. Definitions are created at the first site that
/// references them, which matches registry discovery order.
pub fn build_parser_spec(
    root: &Node,
    registry: &SharedSubtreeRegistry,
    delimiters: &BTreeSet<char>,
) -> ParserSpec {
    let mut builder = SpecBuilder {
        registry,
        definitions: BTreeMap::new(),
    };

    let model = match builder.continuation(root) {
        Some(entry) if root.end => optional(entry),
        Some(entry) => entry,
        None => ParserNode {
            id: root.id,
            primitive: MatchPrimitive::FirstMatch {
                branches: Vec::new(),
            },
        },
    };

    let sites: BTreeMap<usize, usize> = registry
        .iter()
        .map(|(_, shared)| (shared.index, shared.sites))
        .collect();
    let subtrees = builder
        .definitions
        .into_iter()
        .map(|(id, root)| SubtreeDef {
            id,
            sites: sites.get(&id).copied().unwrap_or(0),
            root,
        })
        .collect();

    ParserSpec {
        version: PARSER_SPEC_VERSION,
        delimiters: delimiters.iter().map(|d| d.to_string()).collect(),
        subtrees,
        model,
    }
}

struct SpecBuilder<'a> {
    registry: &'a SharedSubtreeRegistry,
    definitions: BTreeMap<usize, ParserNode>,
}

impl SpecBuilder<'_> {
    fn convert(&mut self, node: &Node) -> ParserNode {
        if let Some(index) = self.registry.get(&fingerprint(node)).map(|s| s.index) {
            if !self.definitions.contains_key(&index) {
                // A subtree never contains itself, so building the body
                // cannot re-enter this index.
                let body = self.convert_body(node);
                self.definitions.insert(index, body);
            }
            return ParserNode {
                id: node.id,
                primitive: MatchPrimitive::SubtreeRef { subtree: index },
            };
        }
        self.convert_body(node)
    }

    fn convert_body(&mut self, node: &Node) -> ParserNode {
        let own = ParserNode {
            id: node.id,
            primitive: self.position_matcher(node),
        };
        match self.continuation(node) {
            None => own,
            Some(cont) => {
                let tail = if node.end { optional(cont) } else { cont };
                ParserNode {
                    id: None,
                    primitive: MatchPrimitive::Sequence {
                        elements: vec![own, tail],
                    },
                }
            }
        }
    }

    /// What follows the node's own position: nothing, the single child, or a
    /// first-match over the ordered children.
    fn continuation(&mut self, node: &Node) -> Option<ParserNode> {
        match node.children.len() {
            0 => None,
            1 => Some(self.convert(&node.children[0])),
            _ => {
                let branches = node.children.iter().map(|c| self.convert(c)).collect();
                Some(ParserNode {
                    id: None,
                    primitive: MatchPrimitive::FirstMatch { branches },
                })
            }
        }
    }

    fn position_matcher(&self, node: &Node) -> MatchPrimitive {
        match &node.kind {
            NodeKind::Fixed(element) => MatchPrimitive::Fixed {
                value: element.clone(),
            },
            NodeKind::List(values) => MatchPrimitive::WordList {
                values: values.iter().cloned().collect(),
            },
            NodeKind::Variable(datatypes) => {
                if datatypes.is_empty() {
                    if node.children.is_empty() {
                        MatchPrimitive::AnyBytes
                    } else {
                        MatchPrimitive::Delimited
                    }
                } else {
                    let mut matchers: Vec<_> = datatypes.iter().map(|&d| typed(d)).collect();
                    if matchers.len() == 1 {
                        matchers.remove(0)
                    } else {
                        MatchPrimitive::FirstMatch {
                            branches: matchers
                                .into_iter()
                                .map(|primitive| ParserNode { id: None, primitive })
                                .collect(),
                        }
                    }
                }
            }
        }
    }
}

fn typed(datatype: Datatype) -> MatchPrimitive {
    match datatype {
        Datatype::DateTime => MatchPrimitive::DateTime,
        Datatype::IpAddress => MatchPrimitive::IpAddress,
        Datatype::Integer => MatchPrimitive::Integer,
        Datatype::Float => MatchPrimitive::Float,
        Datatype::Hex => MatchPrimitive::Hex,
        Datatype::Base64 => MatchPrimitive::Base64,
    }
}

fn optional(element: ParserNode) -> ParserNode {
    ParserNode {
        id: None,
        primitive: MatchPrimitive::Optional {
            element: Box::new(element),
        },
    }
}
