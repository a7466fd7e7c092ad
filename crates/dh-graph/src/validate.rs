//! Graph invariant checks.

use dh_core::CoordKey;
use petgraph::visit::EdgeRef;

use crate::error::{GraphError, GraphResult};
use crate::graph::RoadGraph;

/// Check the structural invariants of a built graph: no self-loops,
/// finite positive weights and a coordinate index that agrees with the
/// stored nodes.
pub(crate) fn validate_graph(graph: &RoadGraph) -> GraphResult<()> {
    for edge in graph.graph.edge_references() {
        let (a, b) = (edge.source(), edge.target());
        if a == b {
            return Err(GraphError::SelfLoop { at: graph.key(a) });
        }
        let weight = edge.weight().weight;
        if !weight.is_finite() || weight <= 0.0 {
            return Err(GraphError::InvalidWeight {
                from: graph.key(a),
                to: graph.key(b),
                weight,
            });
        }
    }

    if graph.index.len() != graph.graph.node_count() {
        let orphan = graph
            .graph
            .node_indices()
            .map(|n| graph.key(n))
            .find(|k| !graph.index.contains_key(k));
        if let Some(key) = orphan {
            return Err(GraphError::KeyMismatch { key });
        }
    }
    for (key, &node) in &graph.index {
        let stored = graph.graph.node_weight(node).map(|&c| CoordKey::from_coord(c));
        if stored != Some(*key) {
            return Err(GraphError::KeyMismatch { key: *key });
        }
    }

    Ok(())
}
