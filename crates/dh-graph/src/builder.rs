//! Incremental graph builder.

use dh_core::geometry::Coord;
use dh_core::FeatureId;
use dh_layer::{Feature, FeatureRequest, LayerProvider};

use crate::error::GraphResult;
use crate::graph::RoadGraph;
use crate::validate;

/// Builder for a [`RoadGraph`].
///
/// Feed it segments, features or whole layers, then call `build()` to
/// validate and hand over the graph.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: RoadGraph,
    skipped_degenerate: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one segment; returns `false` if it was zero-length and skipped.
    pub fn add_segment(&mut self, a: Coord, b: Coord, feature: Option<FeatureId>) -> bool {
        let added = self.graph.add_segment(a, b, feature).is_some();
        if !added {
            self.skipped_degenerate += 1;
        }
        added
    }

    /// Add every consecutive vertex pair of every part of a polyline
    /// feature. Point features contribute nothing. Returns the number of
    /// edges added.
    pub fn add_feature<R>(&mut self, feature: &Feature<R>) -> usize {
        let mut added = 0;
        for part in feature.geometry.parts() {
            for pair in part.windows(2) {
                if self.add_segment(pair[0], pair[1], Some(feature.id)) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Add every feature of a layer, in id order.
    pub fn add_layer<R>(&mut self, layer: &dyn LayerProvider<R>) -> usize {
        layer
            .features(&FeatureRequest::all())
            .map(|f| self.add_feature(f))
            .sum()
    }

    /// Zero-length segments skipped so far.
    pub fn skipped_degenerate(&self) -> usize {
        self.skipped_degenerate
    }

    /// Validate and return the graph.
    pub fn build(self) -> GraphResult<RoadGraph> {
        validate::validate_graph(&self.graph)?;
        if self.skipped_degenerate > 0 {
            tracing::debug!(
                skipped = self.skipped_degenerate,
                "zero-length segments skipped"
            );
        }
        Ok(self.graph)
    }
}

/// Build the graph of a whole layer.
#[tracing::instrument(skip_all, fields(layer = layer.name()))]
pub fn build_graph<R>(layer: &dyn LayerProvider<R>) -> GraphResult<RoadGraph> {
    let mut builder = GraphBuilder::new();
    builder.add_layer(layer);
    let graph = builder.build()?;
    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "road graph built"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::geometry::coord;
    use dh_layer::{Geometry, MemoryLayer, NewFeature, RoadRecord};

    #[test]
    fn multipart_polyline_adds_every_segment() {
        let layer = MemoryLayer::from_features(
            "roads",
            vec![NewFeature::new(
                Geometry::Lines(vec![
                    vec![coord(0.0, 0.0), coord(1.0, 0.0), coord(2.0, 0.0)],
                    vec![coord(5.0, 5.0), coord(5.0, 6.0)],
                ]),
                RoadRecord::default(),
            )],
        );
        let graph = build_graph(&layer).unwrap();
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.node_count(), 5);
        assert!(graph.edges().all(|(_, _, e)| e.feature == Some(FeatureId::from_index(0))));
    }

    #[test]
    fn repeated_vertices_are_skipped() {
        let mut builder = GraphBuilder::new();
        let road = Feature {
            id: FeatureId::from_index(0),
            geometry: Geometry::line(vec![coord(0.0, 0.0), coord(0.0, 0.0), coord(1.0, 0.0)]),
            record: RoadRecord::default(),
        };
        assert_eq!(builder.add_feature(&road), 1);
        assert_eq!(builder.skipped_degenerate(), 1);
        assert_eq!(builder.build().unwrap().edge_count(), 1);
    }

    #[test]
    fn empty_layer_gives_empty_graph() {
        let layer: MemoryLayer<RoadRecord> = MemoryLayer::new("roads");
        assert!(build_graph(&layer).unwrap().is_empty());
    }
}
