//! Graph diff computation between two snapshots

use std::collections::BTreeSet;

use tracing::debug;

use crate::graph::Graph;
use crate::model::NodeId;
use crate::patch::{Patch, PatchOp};

/// Compute the patch turning `old` into `new`.
///
/// Only membership is compared: nodes by id, edges by `(from, type, to)`.
/// A node whose id exists in both snapshots is never patched, even if its
/// props differ. Edges kept by both snapshots are re-added when they touch
/// a removed node, since applying `remove-node` drops incident edges.
///
/// Output order is fixed so equal inputs give byte-identical patches: added
/// nodes, removed nodes, added edges, removed edges, each ascending by id or
/// triple.
pub fn diff_graphs(old: &Graph, new: &Graph) -> Patch {
    let old_nodes = old.node_ids();
    let new_nodes = new.node_ids();
    let old_edges = old.edge_triples();
    let new_edges = new.edge_triples();

    let mut patch = Patch::new();

    for id in new_nodes.difference(&old_nodes) {
        if let Some(node) = new.node(id) {
            patch.push(PatchOp::AddNode(node));
        }
    }
    let removed: BTreeSet<&NodeId> = old_nodes.difference(&new_nodes).collect();
    for id in &removed {
        patch.push(PatchOp::RemoveNode((*id).clone()));
    }
    // Removing a node cascades to its edges, so shared edges that touch a
    // removed id must be added back.
    let added_edges = new_edges.iter().filter(|e| {
        !old_edges.contains(e) || removed.contains(&e.from) || removed.contains(&e.to)
    });
    for edge in added_edges {
        patch.push(PatchOp::AddEdge(edge.clone()));
    }
    for edge in old_edges.difference(&new_edges) {
        patch.push(PatchOp::RemoveEdge(edge.clone()));
    }

    debug!(
        "Diff: {} ops ({} -> {} nodes, {} -> {} edges)",
        patch.len(),
        old_nodes.len(),
        new_nodes.len(),
        old_edges.len(),
        new_edges.len()
    );
    patch
}
