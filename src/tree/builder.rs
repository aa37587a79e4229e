//! Tree construction from tokenized lines.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::Settings;
use crate::model::{DatatypeDetector, LogLine, Node, NodeKind};

/// Per-depth generalization thresholds.
///
/// The six named thresholds cover depths 0..=5; beyond that the last one
/// decays geometrically with `damping`, so deep positions generalize more
/// readily.
#[derive(Debug, Clone)]
pub struct Thresholds {
    theta: [f64; 6],
    damping: f64,
}

impl Thresholds {
    pub fn new(theta: [f64; 6], damping: f64) -> Self {
        Self { theta, damping }
    }

    pub fn at(&self, depth: usize) -> f64 {
        if depth < self.theta.len() {
            self.theta[depth]
        } else {
            let beyond = (depth - self.theta.len() + 1) as i32;
            self.theta[self.theta.len() - 1] * self.damping.powi(beyond)
        }
    }
}

/// Hard overrides for the branch-or-generalize decision.
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub branch_tokens: Vec<String>,
    pub branch_depths: Vec<usize>,
    pub variable_tokens: Vec<String>,
    pub variable_depths: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Branch,
    Generalize,
}

/// Element of the root node; all lines hang below it.
pub const ROOT_ELEMENT: &str = "root";

/// Builds the initial tree by recursively partitioning lines per token
/// position.
///
/// Construction is driven by an explicit work stack instead of recursion, so
/// token count never bounds the call stack. Never fails: every line is
/// representable, worst case as its own single-occurrence literal path.
#[derive(Debug)]
pub struct TreeBuilder {
    thresholds: Thresholds,
    overrides: BuildOverrides,
    detector: DatatypeDetector,
}

/// Flat node under construction; assembled into owned [`Node`]s at the end.
struct Slot {
    kind: NodeKind,
    occurrence: usize,
    end: bool,
    parent: usize,
}

/// Pending partitioning work: which lines continue below `slot`, at token
/// position `depth`.
struct WorkItem {
    slot: usize,
    depth: usize,
    rows: Vec<usize>,
}

impl TreeBuilder {
    pub fn new(thresholds: Thresholds, overrides: BuildOverrides) -> Self {
        Self {
            thresholds,
            overrides,
            detector: DatatypeDetector::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.thresholds(), settings.build_overrides())
    }

    pub fn build(&self, lines: &[LogLine]) -> Node {
        let mut slots = vec![Slot {
            kind: NodeKind::Fixed(ROOT_ELEMENT.to_string()),
            occurrence: lines.len(),
            end: false,
            parent: usize::MAX,
        }];
        let mut stack = vec![WorkItem {
            slot: 0,
            depth: 0,
            rows: (0..lines.len()).collect(),
        }];

        while let Some(item) = stack.pop() {
            // Partition rows by the token at this position. BTreeMap keeps
            // sibling creation order lexicographic, hence deterministic.
            let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
            for &row in &item.rows {
                match lines[row].tokens.get(item.depth) {
                    Some(token) => groups.entry(token).or_default().push(row),
                    None => slots[item.slot].end = true,
                }
            }
            if groups.is_empty() {
                continue;
            }

            let total: usize = groups.values().map(Vec::len).sum();
            match self.decide(item.depth, &groups, total) {
                Decision::Branch => {
                    for (token, rows) in groups {
                        trace!("depth {}: literal branch {:?}", item.depth, token);
                        let slot = slots.len();
                        slots.push(Slot {
                            kind: NodeKind::Fixed(token.to_string()),
                            occurrence: rows.len(),
                            end: false,
                            parent: item.slot,
                        });
                        stack.push(WorkItem {
                            slot,
                            depth: item.depth + 1,
                            rows,
                        });
                    }
                }
                Decision::Generalize => {
                    let datatypes = self.detector.detect_common(groups.keys().copied());
                    trace!(
                        "depth {}: wildcard over {} values, datatypes {:?}",
                        item.depth,
                        groups.len(),
                        datatypes
                    );
                    let slot = slots.len();
                    slots.push(Slot {
                        kind: NodeKind::Variable(datatypes),
                        occurrence: total,
                        end: false,
                        parent: item.slot,
                    });
                    let rows = groups.into_values().flatten().collect();
                    stack.push(WorkItem {
                        slot,
                        depth: item.depth + 1,
                        rows,
                    });
                }
            }
        }

        debug!("{} nodes built from {} lines", slots.len(), lines.len());
        assemble(slots)
    }

    /// Branch-or-generalize policy for one token position.
    ///
    /// Force-branch wins over force-variable when both apply. Otherwise the
    /// branching score `(k - 1) / n` over k distinct values and n lines is
    /// compared against the depth threshold: strictly above means the
    /// position is unstable enough to generalize. A single observed value
    /// scores 0 and always branches.
    fn decide(&self, depth: usize, groups: &BTreeMap<&str, Vec<usize>>, total: usize) -> Decision {
        let forced_branch = self.overrides.branch_depths.contains(&depth)
            || groups
                .keys()
                .any(|t| self.overrides.branch_tokens.iter().any(|f| f == t));
        if forced_branch {
            return Decision::Branch;
        }

        let forced_variable = self.overrides.variable_depths.contains(&depth)
            || groups
                .keys()
                .any(|t| self.overrides.variable_tokens.iter().any(|f| f == t));
        if forced_variable {
            return Decision::Generalize;
        }

        let score = (groups.len() - 1) as f64 / total as f64;
        if score > self.thresholds.at(depth) {
            Decision::Generalize
        } else {
            Decision::Branch
        }
    }
}

/// Turn the flat slot table into an owned tree. Children always carry a
/// higher index than their parent, so walking indices backwards guarantees
/// every child is assembled before its parent.
fn assemble(slots: Vec<Slot>) -> Node {
    let mut child_indices: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    for (idx, slot) in slots.iter().enumerate().skip(1) {
        child_indices[slot.parent].push(idx);
    }

    let mut built: Vec<Option<Node>> = Vec::with_capacity(slots.len());
    built.resize_with(slots.len(), || None);
    for (idx, slot) in slots.into_iter().enumerate().rev() {
        let children = child_indices[idx]
            .iter()
            .map(|&c| built[c].take().unwrap())
            .collect();
        built[idx] = Some(Node {
            kind: slot.kind,
            children,
            occurrence: slot.occurrence,
            end: slot.end,
            id: None,
        });
    }
    built[0].take().unwrap()
}
