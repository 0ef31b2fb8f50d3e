//! MetaGraph Core: node schema, graph store, diff engine, patches and validation

pub mod diff;
pub mod error;
pub mod graph;
pub mod hash;
pub mod model;
pub mod patch;
pub mod schema;
pub mod store;
pub mod validation;

#[cfg(test)]
pub mod tests;

#[cfg(test)]
pub mod test_utils;

pub use diff::diff_graphs;
pub use error::{Error, Result, SchemaViolations, Violation};
pub use graph::Graph;
pub use hash::{ContentHash, checksum};
pub use model::{Edge, EdgeTriple, Node, NodeId, NodeKind, Props, Provenance};
pub use patch::{ApplySummary, Patch, PatchOp, apply_json, apply_patch, dump_patch, load_patch};
pub use schema::node_schema;
pub use store::{GRAPH_FILE, dump_graph, load_graph};
pub use validation::{validate_graph, validate_node};
