//! Artifact emission: tree dump, templates, clusters, parser specification,
//! optional DOT rendering. All outputs are deterministic for a given tree.

pub mod dot;
pub mod dump;
pub mod id;
pub mod parser_model;
pub mod templates;

pub use dot::render_dot;
pub use dump::dump_tree;
pub use id::{assign_ids, IdIssuer};
pub use parser_model::{
    build_parser_spec, MatchPrimitive, ParserNode, ParserSpec, SubtreeDef, PARSER_SPEC_VERSION,
};
pub use templates::{
    assign_clusters, collect_templates, render_clusters, render_templates, ClusterAssignment,
    Template,
};
