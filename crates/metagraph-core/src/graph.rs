//! Graph wrapper using petgraph::StableDiGraph keyed by string NodeId

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::model::*;

/// Kind, props and provenance of a defined node. Edges live in petgraph.
#[derive(Debug, Clone, PartialEq)]
struct NodeBody {
    kind: NodeKind,
    props: Props,
    prov: Provenance,
}

/// A vertex is either a defined node or a placeholder anchoring edges that
/// reference an id nobody has defined yet.
#[derive(Debug, Clone)]
struct Vertex {
    id: NodeId,
    body: Option<NodeBody>,
}

/// The design-artefact graph: a directed multigraph keyed by `(from, type, to)`.
///
/// Edge targets need not exist; they are anchored on placeholder vertices
/// which are invisible to node iteration and vanish once no edge touches them.
#[derive(Clone, Default)]
pub struct Graph {
    inner: StableDiGraph<Vertex, String>,
    index: HashMap<NodeId, NodeIndex>,
    /// Defined nodes in insertion order.
    order: Vec<NodeId>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.node_count())
            .field("edge_count", &self.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of defined nodes.
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Number of edges, including those touching undefined ids.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty() && self.inner.edge_count() == 0
    }

    fn vertex(&mut self, id: &NodeId) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.inner.add_node(Vertex {
            id: id.clone(),
            body: None,
        });
        self.index.insert(id.clone(), idx);
        idx
    }

    /// Insert a node, overwriting kind/props/prov if the id exists, then insert
    /// each declared edge. Returns true if the id was not defined before.
    pub fn insert_node(&mut self, node: Node) -> bool {
        let Node {
            id,
            kind,
            props,
            edges,
            prov,
        } = node;
        let idx = self.vertex(&id);
        let is_new = self.inner[idx].body.is_none();
        self.inner[idx].body = Some(NodeBody { kind, props, prov });
        if is_new {
            self.order.push(id.clone());
        }
        for edge in edges {
            self.insert_edge(EdgeTriple::new(id.clone(), edge.ty, edge.to));
        }
        is_new
    }

    /// Insert an edge if absent. Returns true if it was inserted.
    pub fn insert_edge(&mut self, edge: EdgeTriple) -> bool {
        if self.find_edge(&edge).is_some() {
            return false;
        }
        let from = self.vertex(&edge.from);
        let to = self.vertex(&edge.to);
        self.inner.add_edge(from, to, edge.ty);
        true
    }

    /// Remove `id` and every edge incident to it, in both directions.
    ///
    /// Returns the node if it was defined. An id that is only referenced by
    /// edges loses those edges and yields `None`; an unknown id is a no-op.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let idx = *self.index.get(id)?;
        let removed = self.materialize(idx);
        let neighbours: Vec<NodeIndex> = self
            .inner
            .neighbors_undirected(idx)
            .filter(|&n| n != idx)
            .collect();
        self.inner.remove_node(idx);
        self.index.remove(id);
        if removed.is_some() {
            self.order.retain(|o| o != id);
        }
        for n in neighbours {
            self.prune(n);
        }
        removed
    }

    /// Remove an edge if present. Returns true if it was removed.
    pub fn remove_edge(&mut self, edge: &EdgeTriple) -> bool {
        let Some(idx) = self.find_edge(edge) else {
            return false;
        };
        let endpoints = self.inner.edge_endpoints(idx);
        self.inner.remove_edge(idx);
        if let Some((from, to)) = endpoints {
            self.prune(from);
            self.prune(to);
        }
        true
    }

    /// Drop a placeholder once nothing references it.
    fn prune(&mut self, idx: NodeIndex) {
        let dangling = self
            .inner
            .node_weight(idx)
            .is_some_and(|v| v.body.is_none())
            && self.inner.neighbors_undirected(idx).next().is_none();
        if dangling {
            if let Some(vertex) = self.inner.remove_node(idx) {
                self.index.remove(&vertex.id);
            }
        }
    }

    fn find_edge(&self, edge: &EdgeTriple) -> Option<EdgeIndex> {
        let from = *self.index.get(&edge.from)?;
        let to = *self.index.get(&edge.to)?;
        self.inner
            .edges_directed(from, Direction::Outgoing)
            .find(|e| e.target() == to && *e.weight() == edge.ty)
            .map(|e| e.id())
    }

    fn materialize(&self, idx: NodeIndex) -> Option<Node> {
        let vertex = self.inner.node_weight(idx)?;
        let body = vertex.body.as_ref()?;
        Some(Node {
            id: vertex.id.clone(),
            kind: body.kind,
            props: body.props.clone(),
            edges: self.outgoing(idx),
            prov: body.prov.clone(),
        })
    }

    fn outgoing(&self, idx: NodeIndex) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| Edge::new(e.weight().clone(), self.inner[e.target()].id.clone()))
            .collect();
        // petgraph walks outgoing edges newest-first.
        edges.reverse();
        edges
    }

    /// A defined node with its outgoing edges materialized.
    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.index.get(id).and_then(|&idx| self.materialize(idx))
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.index
            .get(id)
            .is_some_and(|&idx| self.inner[idx].body.is_some())
    }

    pub fn contains_edge(&self, edge: &EdgeTriple) -> bool {
        self.find_edge(edge).is_some()
    }

    /// Defined nodes in insertion order, edges materialized.
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.order.iter().filter_map(move |id| self.node(id))
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = Node> + '_ {
        self.nodes().filter(move |n| n.kind == kind)
    }

    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.order.iter().cloned().collect()
    }

    /// Every edge as a triple, in no particular order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeTriple> + '_ {
        self.inner.edge_references().map(move |e| {
            EdgeTriple::new(
                self.inner[e.source()].id.clone(),
                e.weight().clone(),
                self.inner[e.target()].id.clone(),
            )
        })
    }

    pub fn edge_triples(&self) -> BTreeSet<EdgeTriple> {
        self.edges().collect()
    }

    /// Outgoing edges of `id`, in insertion order.
    pub fn edges_from(&self, id: &NodeId) -> Vec<Edge> {
        self.index
            .get(id)
            .map(|&idx| self.outgoing(idx))
            .unwrap_or_default()
    }

    /// Incoming edges of `id` as triples.
    pub fn edges_to(&self, id: &NodeId) -> Vec<EdgeTriple> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        self.inner
            .edges_directed(idx, Direction::Incoming)
            .map(|e| EdgeTriple::new(self.inner[e.source()].id.clone(), e.weight().clone(), id.clone()))
            .collect()
    }

    /// Ids referenced by some edge but not defined as nodes.
    pub fn unresolved(&self) -> BTreeSet<NodeId> {
        self.inner
            .node_indices()
            .filter_map(|idx| self.inner.node_weight(idx))
            .filter(|v| v.body.is_none())
            .map(|v| v.id.clone())
            .collect()
    }
}

impl FromIterator<Node> for Graph {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        let mut graph = Graph::new();
        graph.extend(iter);
        graph
    }
}

impl Extend<Node> for Graph {
    fn extend<I: IntoIterator<Item = Node>>(&mut self, iter: I) {
        for node in iter {
            self.insert_node(node);
        }
    }
}

/// Node-set and edge-set equality; insertion order is not compared.
impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.node_count() == other.node_count()
            && self.nodes().all(|n| {
                other.node(&n.id).is_some_and(|o| {
                    o.kind == n.kind && o.props == n.props && o.prov == n.prov
                })
            })
            && self.edge_triples() == other.edge_triples()
    }
}
