//! Patch operations, their JSON dialect, and application to a live graph
//!
//! On the wire a patch is a JSON array of RFC-6902-shaped objects restricted
//! to four `(op, path)` forms:
//!
//! | op       | path                        | value        |
//! |----------|-----------------------------|--------------|
//! | `add`    | `/nodes/-`                  | node record  |
//! | `remove` | `/nodes/<id>`               |              |
//! | `add`    | `/edges/-`                  | `{from,type,to}` |
//! | `remove` | `/edges/<from>/<type>/<to>` |              |
//!
//! Path segments are escaped as in JSON Pointer: `~` is `~0` and `/` is `~1`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::model::{EdgeTriple, Node, NodeId};

const NODES_APPEND: &str = "/nodes/-";
const NODES_PREFIX: &str = "/nodes/";
const EDGES_APPEND: &str = "/edges/-";
const EDGES_PREFIX: &str = "/edges/";

/// A single graph mutation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawOp")]
pub enum PatchOp {
    AddNode(Node),
    RemoveNode(NodeId),
    AddEdge(EdgeTriple),
    RemoveEdge(EdgeTriple),
}

/// Untyped wire form of an operation, as decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOp {
    pub op: String,
    pub path: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// Borrowed wire form used for encoding, so values keep record field order.
#[derive(Serialize)]
struct WireOp<'a> {
    op: &'static str,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<WireValue<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireValue<'a> {
    Node(&'a Node),
    Edge(&'a EdgeTriple),
}

impl Serialize for PatchOp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let wire = match self {
            PatchOp::AddNode(node) => WireOp {
                op: "add",
                path: NODES_APPEND.into(),
                value: Some(WireValue::Node(node)),
            },
            PatchOp::RemoveNode(id) => WireOp {
                op: "remove",
                path: format!("{NODES_PREFIX}{}", escape(id.as_str())),
                value: None,
            },
            PatchOp::AddEdge(edge) => WireOp {
                op: "add",
                path: EDGES_APPEND.into(),
                value: Some(WireValue::Edge(edge)),
            },
            PatchOp::RemoveEdge(edge) => WireOp {
                op: "remove",
                path: format!(
                    "{EDGES_PREFIX}{}/{}/{}",
                    escape(edge.from.as_str()),
                    escape(&edge.ty),
                    escape(edge.to.as_str())
                ),
                value: None,
            },
        };
        wire.serialize(serializer)
    }
}

/// Escape a path segment (`~` as `~0`, `/` as `~1`).
fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Undo [`escape`]. Empty segments and stray `~` are rejected.
fn unescape(segment: &str) -> Option<String> {
    if segment.is_empty() {
        return None;
    }
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return None,
        }
    }
    Some(out)
}

impl TryFrom<RawOp> for PatchOp {
    type Error = String;

    fn try_from(raw: RawOp) -> std::result::Result<Self, Self::Error> {
        match raw.op.as_str() {
            "add" => {
                let value = raw
                    .value
                    .ok_or_else(|| format!("add {} is missing \"value\"", raw.path))?;
                match raw.path.as_str() {
                    NODES_APPEND => serde_json::from_value(value)
                        .map(PatchOp::AddNode)
                        .map_err(|e| format!("invalid node value: {e}")),
                    EDGES_APPEND => serde_json::from_value(value)
                        .map(PatchOp::AddEdge)
                        .map_err(|e| format!("invalid edge value: {e}")),
                    other => Err(format!("unsupported add path: {other}")),
                }
            }
            "remove" => {
                // `-` only means "append" for add; here it is an ordinary id.
                if let Some(segment) = raw.path.strip_prefix(NODES_PREFIX) {
                    return (!segment.contains('/'))
                        .then(|| unescape(segment))
                        .flatten()
                        .map(|id| PatchOp::RemoveNode(NodeId::new(id)))
                        .ok_or_else(|| format!("invalid node path: {}", raw.path));
                }
                if let Some(rest) = raw.path.strip_prefix(EDGES_PREFIX) {
                    let parts: Vec<Option<String>> = rest.split('/').map(unescape).collect();
                    return match parts.as_slice() {
                        [Some(from), Some(ty), Some(to)] => Ok(PatchOp::RemoveEdge(EdgeTriple::new(
                            NodeId::new(from.as_str()),
                            ty.as_str(),
                            NodeId::new(to.as_str()),
                        ))),
                        _ => Err(format!("invalid edge path: {}", raw.path)),
                    };
                }
                Err(format!("unsupported remove path: {}", raw.path))
            }
            other => Err(format!("unknown op: {other:?}")),
        }
    }
}

/// An ordered sequence of operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(pub Vec<PatchOp>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: PatchOp) {
        self.0.push(op);
    }

    pub fn extend(&mut self, other: Patch) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.0
    }

    /// Decode a JSON array of operations, reporting the index of the first
    /// malformed one.
    pub fn from_json(value: serde_json::Value) -> Result<Patch> {
        let serde_json::Value::Array(items) = value else {
            return Err(Error::MalformedPatch {
                index: 0,
                reason: "patch must be a JSON array".into(),
            });
        };
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| decode_op(index, item))
            .collect::<Result<Vec<_>>>()
            .map(Patch)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl IntoIterator for Patch {
    type Item = PatchOp;
    type IntoIter = std::vec::IntoIter<PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<PatchOp> for Patch {
    fn from_iter<I: IntoIterator<Item = PatchOp>>(iter: I) -> Self {
        Patch(iter.into_iter().collect())
    }
}

fn decode_op(index: usize, value: serde_json::Value) -> Result<PatchOp> {
    let raw: RawOp = serde_json::from_value(value).map_err(|e| Error::MalformedPatch {
        index,
        reason: e.to_string(),
    })?;
    PatchOp::try_from(raw).map_err(|reason| Error::MalformedPatch { index, reason })
}

/// Load a patch file. Every operation is decoded before returning.
pub fn load_patch(path: &Path) -> Result<Patch> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| Error::MalformedPatch {
        index: 0,
        reason: e.to_string(),
    })?;
    Patch::from_json(value)
}

/// Write a patch as a pretty-printed JSON array.
pub fn dump_patch(patch: &Patch, path: &Path) -> Result<()> {
    let mut text = patch.to_json_pretty()?;
    text.push('\n');
    std::fs::write(path, text).map_err(|e| Error::io(path, e))
}

/// Effective changes made by an application. No-op operations are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub nodes_added: usize,
    pub nodes_removed: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
}

impl ApplySummary {
    pub fn is_noop(&self) -> bool {
        *self == ApplySummary::default()
    }
}

/// Apply one operation in place.
pub fn apply_op(graph: &mut Graph, op: PatchOp, summary: &mut ApplySummary) {
    match op {
        PatchOp::AddNode(node) => {
            let edges_before = graph.edge_count();
            if graph.insert_node(node) {
                summary.nodes_added += 1;
            }
            summary.edges_added += graph.edge_count() - edges_before;
        }
        PatchOp::RemoveNode(id) => {
            let edges_before = graph.edge_count();
            if graph.remove_node(&id).is_some() {
                summary.nodes_removed += 1;
            }
            summary.edges_removed += edges_before - graph.edge_count();
        }
        PatchOp::AddEdge(edge) => {
            if graph.insert_edge(edge) {
                summary.edges_added += 1;
            }
        }
        PatchOp::RemoveEdge(edge) => {
            if graph.remove_edge(&edge) {
                summary.edges_removed += 1;
            }
        }
    }
}

/// Apply every operation in order. Missing targets are no-ops, so this never fails.
pub fn apply_patch(graph: &mut Graph, patch: &Patch) -> ApplySummary {
    let mut summary = ApplySummary::default();
    for op in patch.ops() {
        apply_op(graph, op.clone(), &mut summary);
    }
    debug!("Applied {} ops: {:?}", patch.len(), summary);
    summary
}

/// Decode and apply operations one at a time from an untyped JSON array.
///
/// A malformed operation stops the application with `MalformedPatch`;
/// operations before it stay applied.
pub fn apply_json(graph: &mut Graph, value: &serde_json::Value) -> Result<ApplySummary> {
    let items = value.as_array().ok_or_else(|| Error::MalformedPatch {
        index: 0,
        reason: "patch must be a JSON array".into(),
    })?;
    let mut summary = ApplySummary::default();
    for (index, item) in items.iter().enumerate() {
        let op = decode_op(index, item.clone())?;
        apply_op(graph, op, &mut summary);
    }
    debug!("Applied {} ops: {:?}", items.len(), summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let patch = Patch(vec![
            PatchOp::AddNode(Node::new("a".into(), NodeKind::Story)),
            PatchOp::RemoveNode("b".into()),
            PatchOp::AddEdge(EdgeTriple::new("a".into(), "t", "b".into())),
            PatchOp::RemoveEdge(EdgeTriple::new("a".into(), "t", "c".into())),
        ]);
        insta::assert_snapshot!(
            patch.to_json_string().unwrap(),
            @r#"[{"op":"add","path":"/nodes/-","value":{"id":"a","kind":"Story","props":{},"edges":[],"prov":{"source":"","checksum":""}}},{"op":"remove","path":"/nodes/b"},{"op":"add","path":"/edges/-","value":{"from":"a","type":"t","to":"b"}},{"op":"remove","path":"/edges/a/t/c"}]"#
        );
        let decoded: Patch = serde_json::from_str(&patch.to_json_string().unwrap()).unwrap();
        assert_eq!(decoded, patch);
    }

    #[test]
    fn test_malformed_ops_are_rejected_with_index() {
        let cases = [
            json!([{"op": "replace", "path": "/nodes/a"}]),
            json!([{"op": "add", "path": "/nodes/-"}]),
            json!([{"op": "add", "path": "/things/-", "value": {}}]),
            json!([{"op": "remove", "path": "/edges/a/t"}]),
            json!([{"op": "remove", "path": "/nodes/"}]),
            json!([{"path": "/nodes/a"}]),
            json!([{"op": "add", "path": "/nodes/-", "value": {"kind": "Story"}}]),
        ];
        for case in cases {
            let err = Patch::from_json(case.clone()).unwrap_err();
            assert!(
                matches!(err, Error::MalformedPatch { index: 0, .. }),
                "{case} -> {err}"
            );
        }
    }

    #[test]
    fn test_apply_json_keeps_ops_before_malformed_one() {
        let mut graph = Graph::new();
        let value = json!([
            {"op": "add", "path": "/nodes/-", "value": {"id": "a", "kind": "Story"}},
            {"op": "frobnicate", "path": "/nodes/-"},
            {"op": "add", "path": "/nodes/-", "value": {"id": "b", "kind": "Story"}},
        ]);
        let err = apply_json(&mut graph, &value).unwrap_err();
        assert!(matches!(err, Error::MalformedPatch { index: 1, .. }));
        assert!(graph.contains_node(&"a".into()));
        assert!(!graph.contains_node(&"b".into()));
    }

    #[test]
    fn test_removals_of_missing_targets_are_noops() {
        let mut graph = Graph::new();
        let patch = Patch(vec![
            PatchOp::RemoveNode("nobody".into()),
            PatchOp::RemoveEdge(EdgeTriple::new("x".into(), "t", "y".into())),
        ]);
        let summary = apply_patch(&mut graph, &patch);
        assert!(summary.is_noop());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_summary_counts_effective_changes() {
        let mut graph = Graph::new();
        let patch = Patch(vec![
            PatchOp::AddNode(Node::new("a".into(), NodeKind::Story).with_edge("t", "b".into())),
            PatchOp::AddEdge(EdgeTriple::new("a".into(), "t", "b".into())),
            PatchOp::AddNode(Node::new("b".into(), NodeKind::Story)),
            PatchOp::RemoveNode("a".into()),
        ]);
        let summary = apply_patch(&mut graph, &patch);
        assert_eq!(
            summary,
            ApplySummary {
                nodes_added: 2,
                nodes_removed: 1,
                edges_added: 1,
                edges_removed: 1,
            }
        );
    }

    #[test]
    fn test_patch_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("change.json");
        let patch = Patch(vec![
            PatchOp::AddNode(Node::new("a".into(), NodeKind::Table).with_prop("name", "users")),
            PatchOp::RemoveEdge(EdgeTriple::new("a".into(), "has_column", "b".into())),
        ]);
        dump_patch(&patch, &path).unwrap();
        assert_eq!(load_patch(&path).unwrap(), patch);
    }

    #[test]
    fn test_awkward_ids_survive_the_patch_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("awkward.json");
        let patch = Patch(vec![
            PatchOp::RemoveNode("-".into()),
            PatchOp::RemoveNode("a/b".into()),
            PatchOp::RemoveNode("x~1y".into()),
            PatchOp::RemoveEdge(EdgeTriple::new("-".into(), "t/u", "~".into())),
        ]);
        dump_patch(&patch, &path).unwrap();
        assert_eq!(load_patch(&path).unwrap(), patch);

        insta::assert_snapshot!(
            patch.to_json_string().unwrap(),
            @r#"[{"op":"remove","path":"/nodes/-"},{"op":"remove","path":"/nodes/a~1b"},{"op":"remove","path":"/nodes/x~01y"},{"op":"remove","path":"/edges/-/t~1u/~0"}]"#
        );
    }

    #[test]
    fn test_diff_of_valid_graph_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diff.json");
        let old: Graph = [Node::new("-".into(), NodeKind::Story).with_edge("t", "b".into())]
            .into_iter()
            .collect();
        crate::validation::validate_graph(&old).unwrap();

        let patch = crate::diff::diff_graphs(&old, &Graph::new());
        dump_patch(&patch, &path).unwrap();
        let loaded = load_patch(&path).unwrap();
        assert_eq!(loaded, patch);

        let mut graph = old.clone();
        apply_patch(&mut graph, &loaded);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_bad_escapes_are_malformed() {
        for path in ["/nodes/a~2", "/nodes/a~", "/edges/a//b", "/nodes/a/b"] {
            let err = Patch::from_json(json!([{"op": "remove", "path": path}])).unwrap_err();
            assert!(matches!(err, Error::MalformedPatch { index: 0, .. }), "{path} -> {err}");
        }
    }
}
