//! List detection and list broadening.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::model::{Node, NodeKind};
use crate::tree::merge::jaccard;
use crate::tree::subtrees::{fingerprint, subtree_shape, Fingerprint};

/// Collapses sibling groups with identical downstream structure into one
/// enumerated-list node.
///
/// Works bottom-up so that deeper collapses canonicalize subtrees before the
/// levels above them are grouped.
#[derive(Debug, Default)]
pub struct ListCollapser;

impl ListCollapser {
    pub fn collapse(&self, node: &mut Node) {
        for child in &mut node.children {
            self.collapse(child);
        }
        self.collapse_level(node);
    }

    fn collapse_level(&self, node: &mut Node) {
        // Fixed and list children with equal shape (same end flag, same
        // subtrees below) hold interchangeable values.
        let mut groups: BTreeMap<Fingerprint, Vec<usize>> = BTreeMap::new();
        for (idx, child) in node.children.iter().enumerate() {
            if child.is_fixed() || child.is_list() {
                groups.entry(subtree_shape(child)).or_default().push(idx);
            }
        }

        let mut removed: Vec<usize> = Vec::new();
        for indices in groups.values().filter(|g| g.len() >= 2) {
            let keep = indices[0];
            let mut values = member_values(&node.children[keep]);
            for &other in &indices[1..] {
                values.append(&mut member_values(&node.children[other]));
                // Equal shapes guarantee congruent subtrees; occurrences are
                // summed position by position so the occurrence invariant
                // survives the collapse.
                let donor = node.children[other].clone();
                add_occurrences(&mut node.children[keep], &donor);
            }
            node.children[keep].kind = NodeKind::List(values);
            removed.extend(&indices[1..]);
        }

        removed.sort_unstable();
        for idx in removed.into_iter().rev() {
            node.children.remove(idx);
        }
    }
}

fn member_values(node: &Node) -> BTreeSet<String> {
    match &node.kind {
        NodeKind::Fixed(element) => [element.clone()].into(),
        NodeKind::List(values) => values.clone(),
        NodeKind::Variable(_) => BTreeSet::new(),
    }
}

fn add_occurrences(dst: &mut Node, src: &Node) {
    dst.occurrence += src.occurrence;
    for (d, s) in dst.children.iter_mut().zip(&src.children) {
        add_occurrences(d, s);
    }
}

/// Broadens overlapping lists across the whole tree.
///
/// Any two list nodes whose value sets reach the similarity threshold are
/// unioned symmetrically. Downstream structure is unified without touching
/// occurrences: branches imported from the other site represent no training
/// line here and carry occurrence 0 throughout. Re-running the generalizer
/// on its own output changes nothing.
#[derive(Debug)]
pub struct ListGeneralizer {
    min_similarity: f64,
}

impl ListGeneralizer {
    pub fn new(min_similarity: f64) -> Self {
        Self { min_similarity }
    }

    pub fn generalize(&self, root: &mut Node) {
        let paths = collect_list_paths(root);
        let mut broadened = 0usize;
        for a in 0..paths.len() {
            for b in (a + 1)..paths.len() {
                let left = list_values(node_at(root, &paths[a]));
                let right = list_values(node_at(root, &paths[b]));
                if jaccard(&left, &right) < self.min_similarity {
                    continue;
                }
                if left != right {
                    broadened += 1;
                }
                let union: BTreeSet<String> = left.union(&right).cloned().collect();
                set_list_values(node_at_mut(root, &paths[a]), union.clone());
                set_list_values(node_at_mut(root, &paths[b]), union);
                self.unify_structure(root, &paths[a], &paths[b]);
            }
        }
        if broadened > 0 {
            debug!("{} list pairs broadened", broadened);
        }
    }

    /// Give both sites the union of their downstream branches. A branch
    /// missing on one side is imported as a deep copy with all occurrences
    /// zeroed.
    fn unify_structure(&self, root: &mut Node, path_a: &[usize], path_b: &[usize]) {
        let missing_in_b = missing_children(node_at(root, path_b), node_at(root, path_a));
        let missing_in_a = missing_children(node_at(root, path_a), node_at(root, path_b));
        node_at_mut(root, path_b).children.extend(missing_in_b);
        node_at_mut(root, path_a).children.extend(missing_in_a);
    }
}

/// Children of `src` whose structure has no counterpart under `dst`, deep
/// copied with zeroed occurrences.
fn missing_children(dst: &Node, src: &Node) -> Vec<Node> {
    let present: BTreeSet<Fingerprint> = dst.children.iter().map(fingerprint).collect();
    src.children
        .iter()
        .filter(|c| !present.contains(&fingerprint(c)))
        .map(|c| {
            let mut imported = c.clone();
            zero_occurrences(&mut imported);
            imported
        })
        .collect()
}

fn zero_occurrences(node: &mut Node) {
    node.occurrence = 0;
    for child in &mut node.children {
        zero_occurrences(child);
    }
}

fn collect_list_paths(root: &Node) -> Vec<Vec<usize>> {
    let mut paths = Vec::new();
    let mut current = Vec::new();
    collect(root, &mut current, &mut paths);
    return paths;

    fn collect(node: &Node, current: &mut Vec<usize>, paths: &mut Vec<Vec<usize>>) {
        if node.is_list() {
            paths.push(current.clone());
        }
        for (idx, child) in node.children.iter().enumerate() {
            current.push(idx);
            collect(child, current, paths);
            current.pop();
        }
    }
}

fn node_at<'a>(root: &'a Node, path: &[usize]) -> &'a Node {
    let mut node = root;
    for &idx in path {
        node = &node.children[idx];
    }
    node
}

fn node_at_mut<'a>(root: &'a mut Node, path: &[usize]) -> &'a mut Node {
    let mut node = root;
    for &idx in path {
        node = &mut node.children[idx];
    }
    node
}

fn list_values(node: &Node) -> BTreeSet<String> {
    match &node.kind {
        NodeKind::List(values) => values.clone(),
        _ => BTreeSet::new(),
    }
}

fn set_list_values(node: &mut Node, values: BTreeSet<String>) {
    if node.is_list() {
        node.kind = NodeKind::List(values);
    }
}
