//! Similarity-driven merging of sibling subtrees.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::Settings;
use crate::model::{DatatypeDetector, Node, NodeKind};

/// Sørensen-Dice coefficient over character bigram sets. Equal strings score
/// 1.0; strings without a common bigram score 0.0.
pub fn dice_bigrams(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let bigrams = |s: &str| -> BTreeSet<(char, char)> {
        let chars: Vec<char> = s.chars().collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    };
    let left = bigrams(a);
    let right = bigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let common = left.intersection(&right).count();
    2.0 * common as f64 / (left.len() + right.len()) as f64
}

/// Jaccard index of two sets. Two empty sets count as identical.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let common = a.intersection(b).count();
    let union = a.len() + b.len() - common;
    common as f64 / union as f64
}

/// Recursive correspondence between two matched subtrees: which child of `a`
/// pairs with which child of `b`, and how their subtrees pair below.
#[derive(Debug, Clone, Default)]
pub struct Pairing {
    /// Affinity of the two paired nodes themselves.
    pub affinity: f64,
    /// Matched child pairs as (a_index, b_index, sub-pairing), ordered by
    /// a_index.
    pub pairs: Vec<(usize, usize, Pairing)>,
}

/// Merges structurally similar sibling subtrees.
///
/// `pairing_floor` is the per-node-pair affinity below which two nodes never
/// pair; `min_similarity` is the whole-subtree similarity below which a
/// sibling pair is left untouched.
#[derive(Debug)]
pub struct SubtreeMerger {
    pairing_floor: f64,
    min_similarity: f64,
    delimiters: BTreeSet<char>,
    detector: DatatypeDetector,
}

impl SubtreeMerger {
    pub fn new(pairing_floor: f64, min_similarity: f64, delimiters: &[char]) -> Self {
        Self {
            pairing_floor,
            min_similarity,
            delimiters: delimiters.iter().copied().collect(),
            detector: DatatypeDetector::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.merge_similarity,
            settings.merge_subtrees_min_similarity,
            &settings.delimiters,
        )
    }

    /// Merge similar children of `parent`, pairwise.
    ///
    /// Indices run from the end backwards: for each child j the best partner
    /// among the children before it is selected (ties to the lowest index),
    /// and on a merge child j is removed. Children not yet visited keep their
    /// positions, so removal never disturbs the scan.
    pub fn merge_siblings(&self, parent: &mut Node) {
        let mut j = parent.children.len();
        while j > 1 {
            j -= 1;
            let mut best: Option<(f64, usize, Pairing)> = None;
            for i in 0..j {
                let (similarity, pairing) =
                    self.match_subtrees(&parent.children[i], &parent.children[j]);
                let better = match &best {
                    Some((score, _, _)) => similarity > *score,
                    None => true,
                };
                if better {
                    best = Some((similarity, i, pairing));
                }
            }
            if let Some((similarity, i, pairing)) = best {
                if similarity >= self.min_similarity && similarity > 0.0 {
                    debug!(
                        "merging sibling {} into {} (similarity {:.3})",
                        j, i, similarity
                    );
                    let subtree = parent.children.remove(j);
                    self.merge_pair(&mut parent.children[i], subtree, &pairing);
                }
            }
        }
    }

    /// Similarity of two subtrees in [0, 1] plus the pairing that produced
    /// it: total affinity over all greedily matched node pairs, normalized by
    /// the larger node count.
    pub fn match_subtrees(&self, a: &Node, b: &Node) -> (f64, Pairing) {
        match self.score_pair(a, b) {
            Some((total, pairing)) => {
                let larger = a.node_count().max(b.node_count()) as f64;
                (total / larger, pairing)
            }
            None => (0.0, Pairing::default()),
        }
    }

    /// Total affinity of the subtree pair rooted at (a, b), or None when the
    /// two roots cannot pair at all.
    fn score_pair(&self, a: &Node, b: &Node) -> Option<(f64, Pairing)> {
        let own = self.node_affinity(a, b)?;
        if own < self.pairing_floor {
            return None;
        }

        // Score all cross pairs, then greedily take the best ones. Ties go
        // to the lowest indices so the pairing is deterministic.
        let mut candidates: Vec<(f64, usize, usize, Pairing)> = Vec::new();
        for (i, ca) in a.children.iter().enumerate() {
            for (k, cb) in b.children.iter().enumerate() {
                if let Some((score, pairing)) = self.score_pair(ca, cb) {
                    candidates.push((score, i, k, pairing));
                }
            }
        }
        candidates.sort_by(|x, y| {
            y.0.total_cmp(&x.0)
                .then(x.1.cmp(&y.1))
                .then(x.2.cmp(&y.2))
        });

        let mut used_a = vec![false; a.children.len()];
        let mut used_b = vec![false; b.children.len()];
        let mut total = own;
        let mut pairs = Vec::new();
        for (score, i, k, pairing) in candidates {
            if used_a[i] || used_b[k] {
                continue;
            }
            used_a[i] = true;
            used_b[k] = true;
            total += score;
            pairs.push((i, k, pairing));
        }
        pairs.sort_by_key(|(i, _, _)| *i);

        Some((total, Pairing { affinity: own, pairs }))
    }

    /// Affinity of two nodes viewed in isolation, or None when the kinds can
    /// never pair. Delimiter tokens only ever match the same delimiter;
    /// non-delimiter literals resemble each other by bigram overlap.
    fn node_affinity(&self, a: &Node, b: &Node) -> Option<f64> {
        match (&a.kind, &b.kind) {
            (NodeKind::Fixed(x), NodeKind::Fixed(y)) => {
                if x == y {
                    Some(1.0)
                } else if self.is_delimiter(x) || self.is_delimiter(y) {
                    None
                } else {
                    Some(dice_bigrams(x, y))
                }
            }
            (NodeKind::Variable(_), NodeKind::Variable(_)) => Some(1.0),
            (NodeKind::Variable(_), NodeKind::List(_))
            | (NodeKind::List(_), NodeKind::Variable(_)) => Some(1.0),
            (NodeKind::List(x), NodeKind::List(y)) => Some(jaccard(x, y)),
            _ => None,
        }
    }

    /// Merge subtree `b` into `a` along a previously computed pairing.
    ///
    /// Occurrences and end flags union on every matched pair; kinds union
    /// (unequal literals widen to a list, a wildcard absorbs values by
    /// intersecting datatypes). Unmatched children of `b` are appended in
    /// their original relative order.
    pub fn merge_pair(&self, a: &mut Node, mut b: Node, pairing: &Pairing) {
        a.occurrence += b.occurrence;
        a.end |= b.end;
        let b_kind = std::mem::replace(&mut b.kind, NodeKind::Fixed(String::new()));
        self.union_kind(&mut a.kind, b_kind);

        // Detach matched b-children by descending index so the remaining
        // indices stay valid, then merge each into its partner.
        let mut by_b_desc: Vec<&(usize, usize, Pairing)> = pairing.pairs.iter().collect();
        by_b_desc.sort_by(|x, y| y.1.cmp(&x.1));
        let mut matched: Vec<(usize, Node, &Pairing)> = Vec::new();
        for (i, k, sub) in by_b_desc {
            matched.push((*i, b.children.remove(*k), sub));
        }
        for (i, subtree, sub) in matched {
            self.merge_pair(&mut a.children[i], subtree, sub);
        }
        a.children.append(&mut b.children);
    }

    fn union_kind(&self, a: &mut NodeKind, b: NodeKind) {
        let merged = match (&*a, b) {
            (NodeKind::Fixed(x), NodeKind::Fixed(y)) => {
                if *x == y {
                    return;
                }
                let mut values = BTreeSet::new();
                values.insert(x.clone());
                values.insert(y);
                NodeKind::List(values)
            }
            (NodeKind::Fixed(x), NodeKind::List(mut values)) => {
                values.insert(x.clone());
                NodeKind::List(values)
            }
            (NodeKind::List(values), NodeKind::Fixed(y)) => {
                let mut values = values.clone();
                values.insert(y);
                NodeKind::List(values)
            }
            (NodeKind::List(x), NodeKind::List(y)) => {
                NodeKind::List(x.union(&y).cloned().collect())
            }
            (NodeKind::Variable(x), NodeKind::Variable(y)) => {
                NodeKind::Variable(x.intersection(&y).copied().collect())
            }
            // A wildcard absorbs enumerated values; the datatype set narrows
            // to tags that also hold for every absorbed value.
            (NodeKind::Variable(tags), NodeKind::List(values)) => {
                let value_tags = self.detector.detect_common(values.iter().map(String::as_str));
                NodeKind::Variable(tags.intersection(&value_tags).copied().collect())
            }
            (NodeKind::List(values), NodeKind::Variable(tags)) => {
                let value_tags = self.detector.detect_common(values.iter().map(String::as_str));
                NodeKind::Variable(tags.intersection(&value_tags).copied().collect())
            }
            // Unpairable kind combinations never reach a merge.
            (NodeKind::Fixed(_), NodeKind::Variable(tags)) => NodeKind::Variable(tags),
            (NodeKind::Variable(tags), NodeKind::Fixed(_)) => NodeKind::Variable(tags.clone()),
        };
        *a = merged;
    }

    fn is_delimiter(&self, token: &str) -> bool {
        let mut chars = token.chars();
        matches!(
            (chars.next(), chars.next()),
            (Some(ch), None) if self.delimiters.contains(&ch)
        )
    }
}
