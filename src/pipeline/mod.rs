//! Pipeline orchestration: ingest, tree stages, artifact emission.

pub mod error;
pub mod miner;

pub use error::{PipelineError, PipelineResult};
pub use miner::{MineOutput, MinedTree, Miner, RunSummary, TreeStats};
