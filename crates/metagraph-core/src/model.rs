//! Core data structures for the design-artefact graph

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a node.
///
/// Ids are opaque strings. Extractors derive them deterministically with
/// [`NodeId::derive`] so re-importing the same logical entity yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    /// Namespaced, name-based id: `uuid5(URL, "<Kind>:<name>")`.
    pub fn derive(kind: NodeKind, name: &str) -> Self {
        let key = format!("{}:{}", kind.as_str(), name);
        NodeId(Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

/// Discriminates what kind of design artefact a node represents.
///
/// Closed set: adding a kind means adding a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    // ── Data model ──────────────────────────────────────────
    Table,
    Column,

    // ── Requirements ────────────────────────────────────────
    Story,
}

impl NodeKind {
    pub const ALL: [NodeKind; 3] = [NodeKind::Table, NodeKind::Column, NodeKind::Story];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Table => "Table",
            NodeKind::Column => "Column",
            NodeKind::Story => "Story",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown node kind: {s}"))
    }
}

/// Semantic payload of a node. Key-sorted so serialization is deterministic.
pub type Props = BTreeMap<String, serde_json::Value>;

/// An outgoing, typed edge as declared on a node record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "type")]
    pub ty: String,
    pub to: NodeId,
}

impl Edge {
    pub fn new(ty: impl Into<String>, to: NodeId) -> Self {
        Edge { ty: ty.into(), to }
    }
}

/// Edge identity: `(from, type, to)`. Ordering is lexicographic over the triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeTriple {
    pub from: NodeId,
    #[serde(rename = "type")]
    pub ty: String,
    pub to: NodeId,
}

impl EdgeTriple {
    pub fn new(from: NodeId, ty: impl Into<String>, to: NodeId) -> Self {
        EdgeTriple { from, ty: ty.into(), to }
    }
}

impl fmt::Display for EdgeTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.from, self.ty, self.to)
    }
}

/// Where a node came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// `path` or `path#span`.
    #[serde(default)]
    pub source: String,
    /// Lowercase hex SHA-256 of the originating content.
    #[serde(default)]
    pub checksum: String,
}

impl Provenance {
    pub fn new(source: impl Into<String>, checksum: impl Into<String>) -> Self {
        Provenance {
            source: source.into(),
            checksum: checksum.into(),
        }
    }
}

/// A design-artefact vertex, in its persisted/wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default)]
    pub props: Props,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub prov: Provenance,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Node {
            id,
            kind,
            props: Props::new(),
            edges: Vec::new(),
            prov: Provenance::default(),
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn with_edge(mut self, ty: impl Into<String>, to: NodeId) -> Self {
        self.edges.push(Edge::new(ty, to));
        self
    }

    pub fn with_prov(mut self, prov: Provenance) -> Self {
        self.prov = prov;
        self
    }

    /// String-valued prop lookup.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(|v| v.as_str())
    }

    /// The node's declared edges as triples.
    pub fn edge_triples(&self) -> impl Iterator<Item = EdgeTriple> + '_ {
        self.edges
            .iter()
            .map(|e| EdgeTriple::new(self.id.clone(), e.ty.clone(), e.to.clone()))
    }
}
