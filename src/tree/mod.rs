//! Construction and refinement of the template tree.
//!
//! The stages run in a fixed order: [`TreeBuilder`] grows the initial trie,
//! [`sort_tree`] normalizes sibling order, [`SubtreeMerger`] folds similar
//! sibling branches, [`ListCollapser`] and [`ListGeneralizer`] introduce and
//! widen list nodes, [`SubtreeExtractor`] registers repeated subtrees and
//! [`Aggregator`] collapses single-child token runs.

pub mod aggregate;
pub mod builder;
pub mod lists;
pub mod merge;
pub mod sorter;
pub mod subtrees;

pub use aggregate::Aggregator;
pub use builder::{BuildOverrides, Thresholds, TreeBuilder, ROOT_ELEMENT};
pub use lists::{ListCollapser, ListGeneralizer};
pub use merge::{dice_bigrams, jaccard, SubtreeMerger};
pub use sorter::sort_tree;
pub use subtrees::{
    fingerprint, subtree_shape, Fingerprint, SharedSubtree, SharedSubtreeRegistry, SubtreeExtractor,
};
