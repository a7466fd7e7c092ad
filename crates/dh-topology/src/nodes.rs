//! Node derivation from endpoint multiplicity.

use dh_core::geometry::Coord;
use dh_core::FeatureId;
use dh_layer::{FeatureRequest, Geometry, LayerProvider, NewFeature, NodeRecord, transaction};

use crate::endpoints::EndpointIndex;
use crate::error::TopologyResult;

/// Coordinates that become nodes: junctions (three or more edge ends)
/// and dead ends (exactly one), in coordinate order.
pub fn node_coords(index: &EndpointIndex) -> Vec<Coord> {
    index
        .degrees()
        .filter(|&(_, degree)| degree == 1 || degree >= 3)
        .map(|(key, _)| key.coord())
        .collect()
}

/// Rewrite the node layer from the current network edges.
#[tracing::instrument(skip_all, fields(nodes = nodes.name()))]
pub fn derive_nodes<R>(
    network: &dyn LayerProvider<R>,
    nodes: &mut dyn LayerProvider<NodeRecord>,
) -> TopologyResult<Vec<FeatureId>> {
    let coords = node_coords(&EndpointIndex::from_layer(network));
    let ids = transaction(nodes, |layer| -> TopologyResult<Vec<FeatureId>> {
        let stale: Vec<FeatureId> = layer.features(&FeatureRequest::all()).map(|f| f.id).collect();
        layer.delete_features(&stale)?;
        let drafts = coords
            .iter()
            .map(|&c| NewFeature::new(Geometry::Point(c), NodeRecord::default()))
            .collect();
        Ok(layer.add_features(drafts)?)
    })?;
    tracing::debug!(count = ids.len(), "nodes derived");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::geometry::coord;
    use dh_layer::{EdgeRecord, MemoryLayer};

    #[test]
    fn junctions_and_dead_ends_become_nodes() {
        let edge = |a: Coord, b: Coord| NewFeature::new(Geometry::line(vec![a, b]), EdgeRecord::default());
        let network = MemoryLayer::from_features(
            "network",
            vec![
                edge(coord(0.0, 0.0), coord(10.0, 0.0)),
                edge(coord(10.0, 0.0), coord(20.0, 0.0)),
                edge(coord(20.0, 0.0), coord(30.0, 0.0)),
                edge(coord(20.0, 0.0), coord(20.0, 10.0)),
            ],
        );
        let mut nodes: MemoryLayer<NodeRecord> = MemoryLayer::new("nodes");
        derive_nodes(&network, &mut nodes).unwrap();
        let at: Vec<Coord> = nodes
            .features(&FeatureRequest::all())
            .filter_map(|f| f.point())
            .collect();
        // (10, 0) is a pass-through and gets no node.
        assert_eq!(
            at,
            vec![coord(0.0, 0.0), coord(20.0, 0.0), coord(20.0, 10.0), coord(30.0, 0.0)]
        );

        derive_nodes(&network, &mut nodes).unwrap();
        assert_eq!(nodes.feature_count(), 4);
    }
}
