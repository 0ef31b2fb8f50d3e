//! Test utilities for MetaGraph core

use proptest::prelude::*;
use serde_json::Value;

use crate::graph::Graph;
use crate::hash::checksum;
use crate::model::{EdgeTriple, Node, NodeId, NodeKind, Provenance};
use crate::patch::{Patch, PatchOp};

pub fn story(id: &str) -> Node {
    Node::new(NodeId::from(id), NodeKind::Story)
}

pub fn table(id: &str, name: &str) -> Node {
    Node::new(NodeId::from(id), NodeKind::Table).with_prop("name", name)
}

pub fn column(id: &str, name: &str) -> Node {
    Node::new(NodeId::from(id), NodeKind::Column).with_prop("name", name)
}

pub fn triple(from: &str, ty: &str, to: &str) -> EdgeTriple {
    EdgeTriple::new(NodeId::from(from), ty, NodeId::from(to))
}

/// A users table with two columns and a story that references it.
pub fn sample_graph() -> Graph {
    [
        table("users", "users")
            .with_edge("has_column", "users.id".into())
            .with_edge("has_column", "users.name".into())
            .with_prov(Provenance::new("schema.sql#L1-L4", checksum("CREATE TABLE users"))),
        column("users.id", "id"),
        column("users.name", "name"),
        story("login")
            .with_prop("title", "Login")
            .with_prop("body", "As a user I sign in.")
            .with_edge("relates_to", "users".into()),
    ]
    .into_iter()
    .collect()
}

// Small alphabets so generated graphs collide on ids and edges often.

pub fn arb_id() -> impl Strategy<Value = NodeId> {
    "[a-f]".prop_map(NodeId::new)
}

pub fn arb_edge_type() -> impl Strategy<Value = String> {
    "[tu]".prop_map(String::from)
}

pub fn arb_prop_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z ]{0,6}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        prop::collection::vec("[a-z]{0,3}", 0..3).prop_map(Value::from),
    ]
}

pub fn arb_node() -> impl Strategy<Value = Node> {
    (
        arb_id(),
        prop::sample::select(NodeKind::ALL.to_vec()),
        prop::collection::btree_map("[a-c]", arb_prop_value(), 0..3),
        prop::collection::vec((arb_edge_type(), arb_id()), 0..4),
        prop::option::of("[a-z]{1,5}\\.(sql|md)"),
    )
        .prop_map(|(id, kind, props, edges, source)| {
            let mut node = Node::new(id, kind);
            node.props = props;
            for (ty, to) in edges {
                node = node.with_edge(ty, to);
            }
            if let Some(source) = source {
                let sum = checksum(&source);
                node = node.with_prov(Provenance::new(source, sum));
            }
            node
        })
}

pub fn arb_graph() -> impl Strategy<Value = Graph> {
    prop::collection::vec(arb_node(), 0..8).prop_map(|nodes| nodes.into_iter().collect())
}

pub fn arb_op() -> impl Strategy<Value = PatchOp> {
    prop_oneof![
        arb_node().prop_map(PatchOp::AddNode),
        arb_id().prop_map(PatchOp::RemoveNode),
        (arb_id(), arb_edge_type(), arb_id())
            .prop_map(|(from, ty, to)| PatchOp::AddEdge(EdgeTriple::new(from, ty, to))),
        (arb_id(), arb_edge_type(), arb_id())
            .prop_map(|(from, ty, to)| PatchOp::RemoveEdge(EdgeTriple::new(from, ty, to))),
    ]
}

pub fn arb_patch() -> impl Strategy<Value = Patch> {
    prop::collection::vec(arb_op(), 0..10).prop_map(Patch)
}
