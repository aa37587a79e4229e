//! Domain model: log lines, tree nodes, and datatype inference.
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod datatype;
pub mod line;
pub mod node;

pub use datatype::{Datatype, DatatypeDetector};
pub use line::LogLine;
pub use node::{Node, NodeId, NodeKind, WILDCARD};
