//! Endpoint multiplicity of network edges.

use std::collections::BTreeMap;

use dh_core::geometry::{Coord, CoordKey};
use dh_core::FeatureId;
use dh_layer::{FeatureRequest, LayerProvider};

/// Which end of an edge touches a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum End {
    Start,
    End,
}

/// For every endpoint coordinate, the edges that start or end there.
///
/// Only the first and last vertex of an edge count; interior vertices do
/// not make an edge "touch" anything.
#[derive(Debug, Clone, Default)]
pub struct EndpointIndex {
    at: BTreeMap<CoordKey, Vec<(FeatureId, End)>>,
    ends: BTreeMap<FeatureId, (Coord, Coord)>,
}

impl EndpointIndex {
    pub fn from_layer<R>(layer: &dyn LayerProvider<R>) -> Self {
        let mut index = Self::default();
        for feature in layer.features(&FeatureRequest::all()) {
            if let Some((a, b)) = feature.geometry.terminal_points() {
                index.add(feature.id, a, b);
            }
        }
        index
    }

    pub fn add(&mut self, id: FeatureId, start: Coord, end: Coord) {
        self.at
            .entry(CoordKey::from_coord(start))
            .or_default()
            .push((id, End::Start));
        self.at
            .entry(CoordKey::from_coord(end))
            .or_default()
            .push((id, End::End));
        self.ends.insert(id, (start, end));
    }

    /// Number of edge ends at `key`.
    pub fn degree(&self, key: CoordKey) -> usize {
        self.at.get(&key).map_or(0, Vec::len)
    }

    /// Used by three or more edges.
    pub fn is_junction(&self, key: CoordKey) -> bool {
        self.degree(key) >= 3
    }

    pub fn edges_at(&self, key: CoordKey) -> &[(FeatureId, End)] {
        self.at.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Start and end coordinate of an edge.
    pub fn ends(&self, id: FeatureId) -> Option<(Coord, Coord)> {
        self.ends.get(&id).copied()
    }

    /// All endpoint coordinates with their degree, in coordinate order.
    pub fn degrees(&self) -> impl Iterator<Item = (CoordKey, usize)> + '_ {
        self.at.iter().map(|(k, v)| (*k, v.len()))
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.ends.keys().copied()
    }

    pub fn edge_count(&self) -> usize {
        self.ends.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::geometry::coord;

    #[test]
    fn degree_counts_edge_ends() {
        let mut index = EndpointIndex::default();
        let hub = coord(0.0, 0.0);
        for (i, far) in [coord(1.0, 0.0), coord(0.0, 1.0), coord(-1.0, 0.0)]
            .into_iter()
            .enumerate()
        {
            index.add(FeatureId::from_index(i as u32), hub, far);
        }
        assert_eq!(index.degree(CoordKey::from_coord(hub)), 3);
        assert!(index.is_junction(CoordKey::from_coord(hub)));
        assert_eq!(index.degree(CoordKey::from_coord(coord(1.0, 0.0))), 1);
        assert_eq!(index.degree(CoordKey::from_coord(coord(5.0, 5.0))), 0);
        assert_eq!(index.edge_count(), 3);
    }
}
