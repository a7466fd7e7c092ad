//! Connectivity cleaner: snap near-coincident endpoints, keep the largest
//! connected component and remove every feature outside it.

use std::collections::{BTreeMap, HashMap};

use dh_core::geometry::{Coord, CoordKey};
use dh_core::FeatureId;
use dh_layer::{Feature, FeatureRequest, Geometry, LayerProvider, transaction};
use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::builder::build_graph;
use crate::error::{GraphError, GraphResult};
use crate::graph::RoadGraph;

/// Outcome of one cleaning run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    /// Endpoints moved onto their cluster representative.
    pub snapped_endpoints: usize,
    /// Features whose geometry changed while snapping.
    pub snapped_features: Vec<FeatureId>,
    /// Connected components before pruning.
    pub components: usize,
    /// Features removed because no part touched the kept component.
    pub deleted_features: Vec<FeatureId>,
    /// Multi-part features that lost the parts outside the kept component.
    pub trimmed_features: Vec<FeatureId>,
    pub kept_edges: usize,
    pub kept_weight: f64,
}

/// Endpoint of one polyline part.
#[derive(Debug, Clone, Copy)]
struct EndpointRef {
    feature: FeatureId,
    part: usize,
    vertex: usize,
    at: Coord,
}

fn check_tolerance(tolerance: f64) -> GraphResult<()> {
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(())
    } else {
        Err(GraphError::InvalidTolerance { value: tolerance })
    }
}

fn collect_endpoints<R>(layer: &dyn LayerProvider<R>) -> Vec<EndpointRef> {
    let mut endpoints = Vec::new();
    for feature in layer.features(&FeatureRequest::all()) {
        for (part_idx, part) in feature.geometry.parts().iter().enumerate() {
            let Some(last) = part.len().checked_sub(1) else {
                continue;
            };
            endpoints.push(EndpointRef {
                feature: feature.id,
                part: part_idx,
                vertex: 0,
                at: part[0],
            });
            if last > 0 {
                endpoints.push(EndpointRef {
                    feature: feature.id,
                    part: part_idx,
                    vertex: last,
                    at: part[last],
                });
            }
        }
    }
    endpoints
}

/// Cluster endpoints strictly closer than `tolerance` (transitively) and
/// move each onto the smallest coordinate of its cluster. Running it again
/// on the result changes nothing.
///
/// Returns the number of moved endpoints and the ids of edited features.
pub fn snap_endpoints<R: Clone>(
    layer: &mut dyn LayerProvider<R>,
    tolerance: f64,
) -> GraphResult<(usize, Vec<FeatureId>)> {
    check_tolerance(tolerance)?;
    let endpoints = collect_endpoints(layer);
    if endpoints.is_empty() || tolerance == 0.0 {
        return Ok((0, Vec::new()));
    }

    let tree = RTree::bulk_load(
        endpoints
            .iter()
            .enumerate()
            .map(|(i, e)| GeomWithData::new([e.at.x, e.at.y], i))
            .collect(),
    );
    let tol2 = tolerance * tolerance;
    let mut clusters = UnionFind::<usize>::new(endpoints.len());
    for (i, e) in endpoints.iter().enumerate() {
        for near in tree.locate_within_distance([e.at.x, e.at.y], tol2) {
            let other = endpoints[near.data].at;
            let d2 = (other.x - e.at.x).powi(2) + (other.y - e.at.y).powi(2);
            if d2 < tol2 {
                clusters.union(i, near.data);
            }
        }
    }

    let mut representative: HashMap<usize, CoordKey> = HashMap::new();
    for (i, e) in endpoints.iter().enumerate() {
        let key = CoordKey::from_coord(e.at);
        representative
            .entry(clusters.find(i))
            .and_modify(|r| {
                if key < *r {
                    *r = key;
                }
            })
            .or_insert(key);
    }

    let mut edits: BTreeMap<FeatureId, Vec<(usize, usize, Coord)>> = BTreeMap::new();
    for (i, e) in endpoints.iter().enumerate() {
        let target = representative[&clusters.find(i)];
        if target != CoordKey::from_coord(e.at) {
            edits
                .entry(e.feature)
                .or_default()
                .push((e.part, e.vertex, target.coord()));
        }
    }

    let moved = edits.values().map(Vec::len).sum();
    let mut updated = Vec::with_capacity(edits.len());
    for (id, moves) in edits {
        let Some(feature) = layer.feature(id) else {
            continue;
        };
        let mut feature = feature.clone();
        if let Geometry::Lines(parts) = &mut feature.geometry {
            for (part, vertex, to) in moves {
                parts[part][vertex] = to;
            }
        }
        layer.update_feature(feature)?;
        updated.push(id);
    }
    Ok((moved, updated))
}

/// Statistics of one connected component.
#[derive(Debug, Clone, Copy)]
struct ComponentStats {
    root: usize,
    edges: usize,
    weight: f64,
    min_key: CoordKey,
}

/// Component to keep: most edges, then most weight, then smallest
/// minimum coordinate.
fn pick_component(graph: &RoadGraph, sets: &UnionFind<usize>) -> (usize, Option<usize>) {
    let mut stats: BTreeMap<usize, ComponentStats> = BTreeMap::new();
    for node in graph.nodes() {
        let root = sets.find(node.index());
        let key = graph.key(node);
        stats
            .entry(root)
            .and_modify(|s| {
                if key < s.min_key {
                    s.min_key = key;
                }
            })
            .or_insert(ComponentStats {
                root,
                edges: 0,
                weight: 0.0,
                min_key: key,
            });
    }
    for (a, _, edge) in graph.edges() {
        if let Some(s) = stats.get_mut(&sets.find(a.index())) {
            s.edges += 1;
            s.weight += edge.weight;
        }
    }
    let best = stats
        .values()
        .max_by(|x, y| {
            x.edges
                .cmp(&y.edges)
                .then_with(|| x.weight.total_cmp(&y.weight))
                .then_with(|| y.min_key.cmp(&x.min_key))
        })
        .map(|s| s.root);
    (stats.len(), best)
}

fn component_sets(graph: &RoadGraph) -> UnionFind<usize> {
    let mut sets = UnionFind::new(graph.node_count());
    for (a, b, _) in graph.edges() {
        sets.union(a.index(), b.index());
    }
    sets
}

/// Component of the first non-degenerate segment of a part, if any.
fn part_component(
    graph: &RoadGraph,
    sets: &UnionFind<usize>,
    part: &[Coord],
) -> Option<usize> {
    part.windows(2)
        .find(|w| CoordKey::from_coord(w[0]) != CoordKey::from_coord(w[1]))
        .and_then(|w| graph.node_at(w[0]))
        .map(|n: NodeIndex| sets.find(n.index()))
}

/// Snap, rebuild the graph, keep the largest component and remove the
/// rest from the layer, all inside one edit session. Returns the graph of
/// the kept component.
///
/// An empty layer yields an empty graph and a default report.
#[tracing::instrument(skip_all, fields(layer = layer.name(), tolerance))]
pub fn clean<R: Clone>(
    layer: &mut dyn LayerProvider<R>,
    tolerance: f64,
) -> GraphResult<(RoadGraph, CleanReport)> {
    check_tolerance(tolerance)?;
    if layer.feature_count() == 0 {
        tracing::warn!("road layer is empty; nothing to clean");
        return Ok((RoadGraph::new(), CleanReport::default()));
    }

    let mut report = transaction(layer, |layer| -> GraphResult<CleanReport> {
        let (snapped_endpoints, snapped_features) = snap_endpoints(layer, tolerance)?;
        let graph = build_graph(layer)?;
        let sets = component_sets(&graph);
        let (components, keep) = pick_component(&graph, &sets);
        let mut report = CleanReport {
            snapped_endpoints,
            snapped_features,
            components,
            ..CleanReport::default()
        };
        let Some(keep) = keep else {
            return Ok(report);
        };
        if components <= 1 {
            return Ok(report);
        }

        let mut trimmed: Vec<Feature<R>> = Vec::new();
        for feature in layer.features(&FeatureRequest::all()) {
            let parts = feature.geometry.parts();
            let owners: Vec<Option<usize>> = parts
                .iter()
                .map(|p| part_component(&graph, &sets, p))
                .collect();
            let touches_keep = owners.contains(&Some(keep));
            let touches_other = owners.iter().any(|o| o.is_some_and(|c| c != keep));
            if !touches_keep {
                report.deleted_features.push(feature.id);
            } else if touches_other {
                let kept_parts: Vec<Vec<Coord>> = parts
                    .iter()
                    .zip(&owners)
                    .filter(|(_, owner)| owner.is_none_or(|c| c == keep))
                    .map(|(p, _)| p.clone())
                    .collect();
                trimmed.push(Feature {
                    id: feature.id,
                    geometry: Geometry::Lines(kept_parts),
                    record: feature.record.clone(),
                });
            }
        }
        layer.delete_features(&report.deleted_features)?;
        for feature in trimmed {
            report.trimmed_features.push(feature.id);
            layer.update_feature(feature)?;
        }
        Ok(report)
    })?;

    let graph = build_graph(layer)?;
    report.kept_edges = graph.edge_count();
    report.kept_weight = graph.total_weight();
    tracing::info!(
        components = report.components,
        snapped = report.snapped_endpoints,
        deleted = report.deleted_features.len(),
        trimmed = report.trimmed_features.len(),
        kept_edges = report.kept_edges,
        "road layer cleaned"
    );
    Ok((graph, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::geometry::coord;
    use dh_layer::{MemoryLayer, NewFeature, RoadRecord};

    fn line(points: &[(f64, f64)]) -> NewFeature<RoadRecord> {
        NewFeature::new(
            Geometry::line(points.iter().map(|&(x, y)| coord(x, y)).collect()),
            RoadRecord::default(),
        )
    }

    #[test]
    fn near_endpoints_are_snapped_to_smallest() {
        let mut layer = MemoryLayer::from_features(
            "roads",
            vec![
                line(&[(0.0, 0.0), (10.0, 0.0)]),
                line(&[(10.05, 0.0), (20.0, 0.0)]),
            ],
        );
        let (moved, updated) = snap_endpoints(&mut layer, 0.1).unwrap();
        assert_eq!(moved, 1);
        assert_eq!(updated, vec![FeatureId::from_index(1)]);
        let second = layer.feature(FeatureId::from_index(1)).unwrap();
        assert_eq!(second.geometry.parts()[0][0], coord(10.0, 0.0));

        let (moved, updated) = snap_endpoints(&mut layer, 0.1).unwrap();
        assert_eq!(moved, 0);
        assert!(updated.is_empty());
    }

    #[test]
    fn exact_tolerance_distance_is_not_snapped() {
        let mut layer = MemoryLayer::from_features(
            "roads",
            vec![line(&[(0.0, 0.0), (1.0, 0.0)]), line(&[(1.5, 0.0), (3.0, 0.0)])],
        );
        let (moved, _) = snap_endpoints(&mut layer, 0.5).unwrap();
        assert_eq!(moved, 0);
    }

    #[test]
    fn keeps_component_with_most_edges() {
        let mut layer = MemoryLayer::from_features(
            "roads",
            vec![
                line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
                line(&[(100.0, 0.0), (150.0, 0.0)]),
                line(&[(2.0, 0.0), (2.0, 1.0)]),
            ],
        );
        let (graph, report) = clean(&mut layer, 0.1).unwrap();
        assert_eq!(report.components, 2);
        assert_eq!(report.deleted_features, vec![FeatureId::from_index(1)]);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(layer.feature_count(), 2);
        assert!(!layer.is_editing());
    }

    #[test]
    fn equal_edge_counts_fall_back_to_weight() {
        let mut layer = MemoryLayer::from_features(
            "roads",
            vec![line(&[(0.0, 0.0), (1.0, 0.0)]), line(&[(10.0, 0.0), (15.0, 0.0)])],
        );
        let (_, report) = clean(&mut layer, 0.1).unwrap();
        assert_eq!(report.deleted_features, vec![FeatureId::from_index(0)]);
    }

    #[test]
    fn full_tie_keeps_lowest_coordinate() {
        let mut layer = MemoryLayer::from_features(
            "roads",
            vec![line(&[(10.0, 0.0), (11.0, 0.0)]), line(&[(0.0, 0.0), (1.0, 0.0)])],
        );
        let (_, report) = clean(&mut layer, 0.1).unwrap();
        assert_eq!(report.deleted_features, vec![FeatureId::from_index(0)]);
    }

    #[test]
    fn straddling_multipart_is_trimmed() {
        let mut layer = MemoryLayer::from_features(
            "roads",
            vec![
                NewFeature::new(
                    Geometry::Lines(vec![
                        vec![coord(0.0, 0.0), coord(5.0, 0.0)],
                        vec![coord(50.0, 0.0), coord(51.0, 0.0)],
                    ]),
                    RoadRecord::default(),
                ),
                line(&[(5.0, 0.0), (5.0, 5.0)]),
            ],
        );
        let (graph, report) = clean(&mut layer, 0.1).unwrap();
        assert_eq!(report.trimmed_features, vec![FeatureId::from_index(0)]);
        assert!(report.deleted_features.is_empty());
        assert_eq!(graph.edge_count(), 2);
        let kept = layer.feature(FeatureId::from_index(0)).unwrap();
        assert_eq!(kept.geometry.parts().len(), 1);
    }

    #[test]
    fn empty_layer_is_not_an_error() {
        let mut layer: MemoryLayer<RoadRecord> = MemoryLayer::new("roads");
        let (graph, report) = clean(&mut layer, 0.1).unwrap();
        assert!(graph.is_empty());
        assert_eq!(report, CleanReport::default());
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let mut layer: MemoryLayer<RoadRecord> = MemoryLayer::new("roads");
        assert!(matches!(
            clean(&mut layer, -1.0),
            Err(GraphError::InvalidTolerance { .. })
        ));
    }
}
