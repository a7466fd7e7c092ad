//! Spatial index over layer features.
//!
//! Polylines are indexed segment by segment so nearest queries measure the
//! true distance to the geometry, not to a bounding box or centroid. A
//! second tree holds one bounding box per feature for window queries.

use std::collections::HashSet;

use dh_core::geometry::{Bbox, Coord, coord, project_onto_segment};
use dh_core::FeatureId;
use dh_layer::{Feature, FeatureRequest, Geometry, LayerProvider};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, PointDistance, RTree, RTreeObject};

/// One indexed piece of a feature: a segment, or a point when `a == b`.
#[derive(Debug, Clone, PartialEq)]
struct Piece {
    id: FeatureId,
    a: [f64; 2],
    b: [f64; 2],
}

impl RTreeObject for Piece {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a, self.b)
    }
}

impl PointDistance for Piece {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let p = coord(point[0], point[1]);
        let proj = project_onto_segment(p, coord(self.a[0], self.a[1]), coord(self.b[0], self.b[1]));
        proj.distance * proj.distance
    }
}

type Extent = GeomWithData<Rectangle<[f64; 2]>, FeatureId>;

/// Nearest-neighbour and window queries over features.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    pieces: RTree<Piece>,
    extents: RTree<Extent>,
    ids: HashSet<FeatureId>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every feature of a layer.
    pub fn from_layer<R>(layer: &dyn LayerProvider<R>) -> Self {
        let mut index = Self::new();
        for feature in layer.features(&FeatureRequest::all()) {
            index.insert(feature);
        }
        index
    }

    /// Add a feature. Features without vertices are ignored.
    pub fn insert<R>(&mut self, feature: &Feature<R>) {
        self.insert_geometry(feature.id, &feature.geometry);
    }

    pub fn insert_geometry(&mut self, id: FeatureId, geometry: &Geometry) {
        let Some(bbox) = geometry.bbox() else {
            return;
        };
        match geometry {
            Geometry::Point(c) => self.insert_piece(id, *c, *c),
            Geometry::Lines(parts) => {
                for part in parts {
                    match part.as_slice() {
                        [] => {}
                        [only] => self.insert_piece(id, *only, *only),
                        _ => {
                            for pair in part.windows(2) {
                                self.insert_piece(id, pair[0], pair[1]);
                            }
                        }
                    }
                }
            }
        }
        self.extents.insert(GeomWithData::new(
            Rectangle::from_corners(bbox.min_corner(), bbox.max_corner()),
            id,
        ));
        self.ids.insert(id);
    }

    fn insert_piece(&mut self, id: FeatureId, a: Coord, b: Coord) {
        self.pieces.insert(Piece {
            id,
            a: [a.x, a.y],
            b: [b.x, b.y],
        });
    }

    /// Number of indexed features.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Up to `k` nearest feature ids, closest first; equal distances are
    /// ordered by feature id ascending.
    pub fn nearest(&self, point: Coord, k: usize) -> Vec<FeatureId> {
        self.nearest_with_distance(point, k)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Like [`nearest`](Self::nearest), with the distance to each feature.
    pub fn nearest_with_distance(&self, point: Coord, k: usize) -> Vec<(FeatureId, f64)> {
        if k == 0 {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        let mut found: Vec<(FeatureId, f64)> = Vec::new();
        let mut cutoff: Option<f64> = None;
        // Pieces arrive by increasing distance, so the first piece of a
        // feature gives its distance. Keep reading past the k-th feature
        // while distances tie so the id order can break the tie.
        for (piece, d2) in self
            .pieces
            .nearest_neighbor_iter_with_distance_2(&[point.x, point.y])
        {
            if cutoff.is_some_and(|c| d2 > c) {
                break;
            }
            if seen.insert(piece.id) {
                found.push((piece.id, d2));
                if found.len() == k {
                    cutoff = Some(d2);
                }
            }
        }
        found.sort_by(|x, y| x.1.total_cmp(&y.1).then_with(|| x.0.cmp(&y.0)));
        found.truncate(k);
        found.into_iter().map(|(id, d2)| (id, d2.sqrt())).collect()
    }

    /// Ids of all features whose bounding box intersects `bbox`, ascending.
    pub fn intersecting(&self, bbox: &Bbox) -> Vec<FeatureId> {
        let query = AABB::from_corners(bbox.min_corner(), bbox.max_corner());
        let mut ids: Vec<FeatureId> = self
            .extents
            .locate_in_envelope_intersecting(&query)
            .map(|e| e.data)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_layer::{MemoryLayer, NewFeature, RoadRecord};

    fn roads() -> MemoryLayer<RoadRecord> {
        MemoryLayer::from_features(
            "roads",
            vec![
                NewFeature::new(
                    Geometry::line(vec![coord(0.0, 0.0), coord(10.0, 0.0)]),
                    RoadRecord::default(),
                ),
                NewFeature::new(
                    Geometry::line(vec![coord(0.0, 4.0), coord(10.0, 4.0)]),
                    RoadRecord::default(),
                ),
                NewFeature::new(
                    Geometry::line(vec![coord(0.0, 10.0), coord(10.0, 10.0)]),
                    RoadRecord::default(),
                ),
            ],
        )
    }

    #[test]
    fn nearest_measures_to_the_segment() {
        let index = SpatialIndex::from_layer(&roads());
        let hits = index.nearest_with_distance(coord(5.0, 7.5), 2);
        assert_eq!(hits[0].0.index(), 2);
        assert!((hits[0].1 - 2.5).abs() < 1e-12);
        assert_eq!(hits[1].0.index(), 1);
    }

    #[test]
    fn ties_break_by_id() {
        let index = SpatialIndex::from_layer(&roads());
        // Equidistant (2.0) from roads 0 and 1.
        let hits = index.nearest(coord(5.0, 2.0), 1);
        assert_eq!(hits, vec![FeatureId::from_index(0)]);
        let hits = index.nearest(coord(5.0, 2.0), 5);
        let order: Vec<u32> = hits.iter().map(|id| id.index()).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn empty_index_answers_empty() {
        let index = SpatialIndex::new();
        assert!(index.is_empty());
        assert!(index.nearest(coord(0.0, 0.0), 3).is_empty());
        assert!(index.intersecting(&Bbox::around(coord(0.0, 0.0), 100.0)).is_empty());
    }

    #[test]
    fn window_query_uses_feature_boxes() {
        let index = SpatialIndex::from_layer(&roads());
        let hits = index.intersecting(&Bbox::new(coord(9.0, 3.0), coord(20.0, 11.0)));
        let order: Vec<u32> = hits.iter().map(|id| id.index()).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn point_features_are_indexed() {
        let mut index = SpatialIndex::new();
        index.insert_geometry(FeatureId::from_index(7), &Geometry::Point(coord(3.0, 3.0)));
        assert_eq!(index.len(), 1);
        let hits = index.nearest_with_distance(coord(0.0, -1.0), 1);
        assert_eq!(hits[0].0.index(), 7);
        assert!((hits[0].1 - 5.0).abs() < 1e-12);
    }
}
