//! Graph-level properties and end-to-end scenarios for metagraph-core

use proptest::prelude::*;
use serde_json::json;

use crate::test_utils::*;
use crate::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn dump_then_load_preserves_graph(graph in arb_graph()) {
        let mut buf = Vec::new();
        let skipped = store::write_graph(&graph, &mut buf).unwrap();
        prop_assert_eq!(skipped, 0);
        let loaded = store::read_graph(buf.as_slice(), std::path::Path::new("mem")).unwrap();
        prop_assert_eq!(loaded, graph);
    }

    #[test]
    fn diff_of_graph_with_itself_is_empty(graph in arb_graph()) {
        prop_assert!(diff_graphs(&graph, &graph).is_empty());
    }

    #[test]
    fn applying_diff_reaches_target_membership(old in arb_graph(), new in arb_graph()) {
        let patch = diff_graphs(&old, &new);
        let mut graph = old.clone();
        apply_patch(&mut graph, &patch);
        prop_assert_eq!(graph.node_ids(), new.node_ids());
        prop_assert_eq!(graph.edge_triples(), new.edge_triples());
    }

    #[test]
    fn applying_a_patch_twice_equals_once(graph in arb_graph(), patch in arb_patch()) {
        let mut once = graph.clone();
        apply_patch(&mut once, &patch);
        let mut twice = once.clone();
        apply_patch(&mut twice, &patch);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn diff_is_deterministic(old in arb_graph(), new in arb_graph()) {
        let a = diff_graphs(&old, &new).to_json_string().unwrap();
        let b = diff_graphs(&old, &new).to_json_string().unwrap();
        prop_assert_eq!(a, b);
    }
}

#[test]
fn test_apply_patch_to_empty_graph_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.graphson");
    dump_graph(&Graph::new(), &path).unwrap();

    let mut graph = load_graph(&path).unwrap();
    let patch = json!([{
        "op": "add",
        "path": "/nodes/-",
        "value": {"id": "1", "kind": "Story", "props": {}, "edges": [], "prov": {}}
    }]);
    apply_json(&mut graph, &patch).unwrap();
    validate_graph(&graph).unwrap();
    assert_eq!(graph.node_count(), 1);
}

#[test]
fn test_forward_reference_resolves_once_target_is_added() {
    let mut graph = Graph::new();
    let patch = Patch(vec![
        PatchOp::AddNode(story("a").with_edge("t", "b".into())),
        PatchOp::AddNode(story("b")),
    ]);
    apply_patch(&mut graph, &patch);

    assert!(graph.contains_edge(&triple("a", "t", "b")));
    assert!(graph.unresolved().is_empty());
    assert_eq!(graph.node_count(), 2);
}

#[test]
fn test_removing_node_drops_edges_but_keeps_neighbour() {
    let mut graph: Graph = [story("a").with_edge("t", "b".into()), story("b")]
        .into_iter()
        .collect();
    apply_patch(&mut graph, &Patch(vec![PatchOp::RemoveNode("a".into())]));

    assert!(graph.contains_node(&"b".into()));
    assert!(!graph.contains_edge(&triple("a", "t", "b")));
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_sample_graph_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(GRAPH_FILE);
    let graph = sample_graph();
    dump_graph(&graph, &path).unwrap();

    let loaded = load_graph(&path).unwrap();
    assert_eq!(loaded, graph);
    let ids: Vec<String> = loaded.nodes().map(|n| n.id.0).collect();
    assert_eq!(ids, vec!["users", "users.id", "users.name", "login"]);
}

#[test]
fn test_diff_then_patch_file_then_apply() {
    let dir = tempfile::tempdir().unwrap();
    let old = sample_graph();
    let mut new = sample_graph();
    new.remove_node(&"users.name".into());
    new.insert_node(column("users.email", "email"));
    new.insert_edge(triple("users", "has_column", "users.email"));

    let patch_path = dir.path().join("change.json");
    dump_patch(&diff_graphs(&old, &new), &patch_path).unwrap();

    let mut graph = old.clone();
    let summary = apply_patch(&mut graph, &load_patch(&patch_path).unwrap());
    assert_eq!(summary.nodes_added, 1);
    assert_eq!(summary.nodes_removed, 1);
    assert_eq!(graph, new);
}

#[test]
fn test_validation_failure_lists_first_violation() {
    let mut graph = sample_graph();
    graph.insert_node(story("bad").with_prop("title", serde_json::Value::Null));
    let err = validate_graph(&graph).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"schema violation: node bad field props.title: must not be null"
    );
}
