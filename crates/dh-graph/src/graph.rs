//! Road graph: coordinates as nodes, segments as weighted edges.

use std::collections::HashMap;

use dh_core::geometry::{Coord, CoordKey, distance};
use dh_core::FeatureId;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

/// Payload of one graph edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphEdge {
    /// Euclidean length of the segment.
    pub weight: f64,
    /// Road feature the segment came from; `None` for connectors.
    pub feature: Option<FeatureId>,
}

/// Undirected weighted graph keyed by exact coordinates.
///
/// Every node is reached by at least one edge: nodes are only created
/// while adding an edge. Parallel edges (two features sharing a segment)
/// are allowed.
#[derive(Debug, Clone, Default)]
pub struct RoadGraph {
    pub(crate) graph: UnGraph<Coord, GraphEdge>,
    pub(crate) index: HashMap<CoordKey, NodeIndex>,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Node sitting exactly at `c`, if any.
    pub fn node_at(&self, c: Coord) -> Option<NodeIndex> {
        self.index.get(&CoordKey::from_coord(c)).copied()
    }

    pub fn coord(&self, node: NodeIndex) -> Coord {
        self.graph[node]
    }

    pub fn key(&self, node: NodeIndex) -> CoordKey {
        CoordKey::from_coord(self.graph[node])
    }

    pub fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges(node).count()
    }

    /// Borrow the underlying petgraph graph.
    pub fn inner(&self) -> &UnGraph<Coord, GraphEdge> {
        &self.graph
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// All edges as `(a, b, payload)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &GraphEdge)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), e.weight()))
    }

    /// Sum of all edge weights.
    pub fn total_weight(&self) -> f64 {
        self.graph.edge_weights().map(|e| e.weight).sum()
    }

    /// Cheapest edge between two nodes; ties go to the lower feature id
    /// (connectors first).
    pub fn cheapest_edge(&self, a: NodeIndex, b: NodeIndex) -> Option<(EdgeIndex, GraphEdge)> {
        self.graph
            .edges_connecting(a, b)
            .map(|e| (e.id(), *e.weight()))
            .min_by(|x, y| {
                x.1.weight
                    .total_cmp(&y.1.weight)
                    .then_with(|| x.1.feature.cmp(&y.1.feature))
            })
    }

    pub(crate) fn ensure_node(&mut self, c: Coord) -> NodeIndex {
        let key = CoordKey::from_coord(c);
        if let Some(&n) = self.index.get(&key) {
            return n;
        }
        let n = self.graph.add_node(key.coord());
        self.index.insert(key, n);
        n
    }

    /// Add a segment, creating its end nodes as needed. Zero-length segments
    /// are skipped and return `None`.
    pub(crate) fn add_segment(
        &mut self,
        a: Coord,
        b: Coord,
        feature: Option<FeatureId>,
    ) -> Option<EdgeIndex> {
        if CoordKey::from_coord(a) == CoordKey::from_coord(b) {
            return None;
        }
        let weight = distance(a, b);
        let na = self.ensure_node(a);
        let nb = self.ensure_node(b);
        Some(self.graph.add_edge(na, nb, GraphEdge { weight, feature }))
    }

    pub(crate) fn remove_edge(&mut self, edge: EdgeIndex) -> Option<GraphEdge> {
        self.graph.remove_edge(edge)
    }
}
