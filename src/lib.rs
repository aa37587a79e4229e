//! Log template mining: learns a generalized template tree from raw log
//! files and emits templates, line clusters, and a parser specification.

pub mod cli;
pub mod config;
pub mod emit;
pub mod exitcode;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod tree;
pub mod util;

pub use config::Settings;
pub use model::{Datatype, LogLine, Node, NodeKind};
pub use pipeline::{MineOutput, MinedTree, Miner};
