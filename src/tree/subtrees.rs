//! Structural fingerprints and shared-subtree extraction.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::model::{Node, NodeKind};

/// Hex-rendered SHA-256 digest of a canonical subtree encoding.
///
/// Two subtrees share a fingerprint iff they are structurally identical:
/// same kinds, elements, value sets, datatype sets, end flags, and child
/// order. Occurrence counts and node ids are excluded.
pub type Fingerprint = String;

pub fn fingerprint(node: &Node) -> Fingerprint {
    let mut encoding = String::new();
    encode(node, true, &mut encoding);
    let digest = Sha256::digest(encoding.as_bytes());
    hex::encode(digest)
}

/// Fingerprint of everything below a node: own end flag and children, but not
/// the node's own element. Siblings with equal shape are list candidates.
pub fn subtree_shape(node: &Node) -> Fingerprint {
    let mut encoding = String::new();
    encode(node, false, &mut encoding);
    let digest = Sha256::digest(encoding.as_bytes());
    hex::encode(digest)
}

/// Canonical encoding. Payload strings are length-prefixed so the encoding is
/// injective even when elements contain the structural characters.
fn encode(node: &Node, with_kind: bool, out: &mut String) {
    out.push('(');
    if with_kind {
        match &node.kind {
            NodeKind::Fixed(element) => {
                out.push('F');
                push_payload(element, out);
            }
            NodeKind::Variable(datatypes) => {
                out.push('V');
                for datatype in datatypes {
                    push_payload(datatype.tag(), out);
                }
            }
            NodeKind::List(values) => {
                out.push('L');
                for value in values {
                    push_payload(value, out);
                }
            }
        }
    }
    out.push(if node.end { '!' } else { '.' });
    for child in &node.children {
        encode(child, true, out);
    }
    out.push(')');
}

fn push_payload(payload: &str, out: &mut String) {
    out.push_str(&payload.len().to_string());
    out.push(':');
    out.push_str(payload);
}

/// One structurally repeated subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSubtree {
    /// Stable index in first-discovery order; referenced by the parser
    /// specification as the subtree id.
    pub index: usize,
    /// Number of sites in the tree carrying this structure.
    pub sites: usize,
    pub height: usize,
}

/// Non-owning index of repeated subtrees, keyed by fingerprint.
///
/// The registry never holds nodes; subtree lifetime stays with the tree.
#[derive(Debug, Default)]
pub struct SharedSubtreeRegistry {
    entries: BTreeMap<Fingerprint, SharedSubtree>,
    order: Vec<Fingerprint>,
}

impl SharedSubtreeRegistry {
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn get(&self, fingerprint: &str) -> Option<&SharedSubtree> {
        self.entries.get(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in discovery (index) order.
    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &SharedSubtree)> {
        self.order.iter().map(|fp| (fp, &self.entries[fp]))
    }

    fn register(&mut self, fingerprint: Fingerprint, sites: usize, height: usize) {
        let index = self.order.len();
        self.order.push(fingerprint.clone());
        self.entries.insert(
            fingerprint,
            SharedSubtree {
                index,
                sites,
                height,
            },
        );
    }
}

/// Finds structurally repeated subtrees of sufficient height.
#[derive(Debug)]
pub struct SubtreeExtractor {
    min_height: usize,
}

impl SubtreeExtractor {
    pub fn new(min_height: usize) -> Self {
        Self { min_height }
    }

    /// Register every subtree occurring at two or more sites with height of
    /// at least `min_height`. The tree is not mutated; discovery order is the
    /// pre-order position of the first site.
    pub fn extract(&self, root: &Node) -> SharedSubtreeRegistry {
        let mut visits: Vec<(Fingerprint, usize)> = Vec::new();
        let mut counts: BTreeMap<Fingerprint, usize> = BTreeMap::new();
        self.visit(root, &mut visits, &mut counts);

        let mut registry = SharedSubtreeRegistry::default();
        for (fp, height) in visits {
            let sites = counts[&fp];
            if sites >= 2 && !registry.contains(&fp) {
                registry.register(fp, sites, height);
            }
        }
        debug!("{} shared subtrees registered", registry.len());
        registry
    }

    fn visit(
        &self,
        node: &Node,
        visits: &mut Vec<(Fingerprint, usize)>,
        counts: &mut BTreeMap<Fingerprint, usize>,
    ) {
        let height = node.height();
        if height >= self.min_height {
            let fp = fingerprint(node);
            *counts.entry(fp.clone()).or_insert(0) += 1;
            visits.push((fp, height));
        }
        for child in &node.children {
            self.visit(child, visits, counts);
        }
    }
}
