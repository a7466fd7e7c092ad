//! Integration tests for dh-topology.

use std::collections::BTreeSet;

use approx::assert_relative_eq;
use dh_core::geometry::{Coord, CoordKey, coord};
use dh_core::FeatureId;
use dh_layer::{
    BuildingRecord, EdgeRecord, FeatureRequest, Geometry, LayerProvider, MemoryLayer, NewFeature,
    NodeRecord, TopologyTag,
};
use dh_topology::{
    DemandConfig, EndpointIndex, FilterBounds, Operator, aggregate_demand, chaikin, derive_nodes,
    flag_edges, group_edges, simplify_groups, smooth_corners,
};
use proptest::prelude::*;

fn edge(a: Coord, b: Coord) -> NewFeature<EdgeRecord> {
    NewFeature::new(Geometry::line(vec![a, b]), EdgeRecord::default())
}

fn building(at: Coord, kw: f64) -> NewFeature<BuildingRecord> {
    NewFeature::new(Geometry::Point(at), BuildingRecord { heat_kw: Some(kw) })
}

fn node_at<'a>(nodes: &'a MemoryLayer<NodeRecord>, at: Coord) -> &'a NodeRecord {
    &nodes
        .features(&FeatureRequest::all())
        .find(|f| f.point() == Some(at))
        .unwrap()
        .record
}

/// Source at (0, 0) feeding a branch at (10, 0) with four leaves.
fn star() -> (MemoryLayer<EdgeRecord>, [Coord; 4]) {
    let branch = coord(10.0, 0.0);
    let leaves = [
        coord(20.0, 5.0),
        coord(20.0, -5.0),
        coord(10.0, 10.0),
        coord(10.0, -10.0),
    ];
    let mut edges = vec![edge(coord(0.0, 0.0), branch)];
    edges.extend(leaves.iter().map(|&l| edge(branch, l)));
    (MemoryLayer::from_features("network", edges), leaves)
}

#[test]
fn branch_sums_non_zero_leaf_demand() {
    let (network, leaves) = star();
    let buildings = MemoryLayer::from_features(
        "buildings",
        leaves
            .iter()
            .zip([5.0, 3.0, 0.0, 7.0])
            .map(|(&l, kw)| building(coord(l.x + 1.0, l.y), kw))
            .collect(),
    );
    let mut nodes: MemoryLayer<NodeRecord> = MemoryLayer::new("nodes");
    derive_nodes(&network, &mut nodes).unwrap();
    assert_eq!(nodes.feature_count(), 6);

    let report = aggregate_demand(
        &network,
        &mut nodes,
        &buildings,
        coord(0.0, 0.0),
        &DemandConfig::default(),
    )
    .unwrap();

    let branch = node_at(&nodes, coord(10.0, 0.0));
    assert_eq!(branch.nr_con, 3);
    assert_relative_eq!(branch.heat_kw, 15.0);
    let root = node_at(&nodes, coord(0.0, 0.0));
    assert_eq!(root.nr_con, 3);
    assert_relative_eq!(report.total_demand_kw, 15.0);

    let served = node_at(&nodes, leaves[0]);
    assert_eq!(served.nr_con, 1);
    assert_relative_eq!(served.heat_kw, 5.0);
    let idle = node_at(&nodes, leaves[2]);
    assert_eq!(idle.nr_con, 0);
    assert_eq!(idle.heat_kw, 0.0);

    // Every building went to its own leaf, not to the branch or source.
    assert_eq!(report.matched.len(), 4);
    assert!(branch.building_id.is_none());

    // The trunk feeds the branch node.
    let trunk = FeatureId::from_index(0);
    let branch_id = nodes
        .features(&FeatureRequest::all())
        .find(|f| f.point() == Some(coord(10.0, 0.0)))
        .unwrap()
        .id;
    assert_eq!(report.edge_nodes[&trunk], branch_id);
    assert!(report.unreached_edges.is_empty());
}

#[test]
fn aggregation_does_not_depend_on_digitizing_direction() {
    let (network, leaves) = star();
    let reversed = MemoryLayer::from_features(
        "network",
        network
            .features(&FeatureRequest::all())
            .map(|f| {
                let mut pts = f.geometry.parts()[0].clone();
                pts.reverse();
                NewFeature::new(Geometry::line(pts), EdgeRecord::default())
            })
            .collect(),
    );
    let buildings = MemoryLayer::from_features(
        "buildings",
        leaves.iter().map(|&l| building(l, 2.0)).collect(),
    );
    let mut forward: MemoryLayer<NodeRecord> = MemoryLayer::new("nodes");
    let mut backward: MemoryLayer<NodeRecord> = MemoryLayer::new("nodes");
    derive_nodes(&network, &mut forward).unwrap();
    derive_nodes(&reversed, &mut backward).unwrap();
    let cfg = DemandConfig::default();
    aggregate_demand(&network, &mut forward, &buildings, coord(0.0, 0.0), &cfg).unwrap();
    aggregate_demand(&reversed, &mut backward, &buildings, coord(0.0, 0.0), &cfg).unwrap();
    let a: Vec<_> = forward.features(&FeatureRequest::all()).cloned().collect();
    let b: Vec<_> = backward.features(&FeatureRequest::all()).cloned().collect();
    assert_eq!(a, b);
    assert_eq!(node_at(&forward, coord(10.0, 0.0)).nr_con, 4);
}

#[test]
fn match_distance_limits_inheritance() {
    let (network, leaves) = star();
    let buildings = MemoryLayer::from_features(
        "buildings",
        vec![building(coord(leaves[0].x + 50.0, leaves[0].y), 9.0)],
    );
    let mut nodes: MemoryLayer<NodeRecord> = MemoryLayer::new("nodes");
    derive_nodes(&network, &mut nodes).unwrap();
    let cfg = DemandConfig {
        max_match_distance: Some(10.0),
    };
    let report = aggregate_demand(&network, &mut nodes, &buildings, coord(0.0, 0.0), &cfg).unwrap();
    assert!(report.matched.is_empty());
    assert_eq!(report.total_demand_kw, 0.0);
}

#[test]
fn kinked_junction_artifact_is_grouped_and_collapsed() {
    // A main line with a short dog-leg artifact in the middle.
    let mut network = MemoryLayer::from_features(
        "network",
        vec![
            edge(coord(0.0, 0.0), coord(50.0, 0.0)),
            edge(coord(50.0, 0.0), coord(50.3, 0.2)),
            edge(coord(50.3, 0.2), coord(50.4, 0.0)),
            edge(coord(50.4, 0.0), coord(100.0, 0.0)),
        ],
    );
    let index = EndpointIndex::from_layer(&network);
    let flags = flag_edges(&index, &FilterBounds::default());
    assert!(flags.contains_key(&FeatureId::from_index(1)));
    assert!(flags.contains_key(&FeatureId::from_index(2)));

    let protected: BTreeSet<CoordKey> = BTreeSet::new();
    let groups = group_edges(&index, &flags, &protected);
    assert_eq!(groups.len(), 1);
    let members: Vec<u32> = groups[0].members.iter().map(|id| id.index()).collect();
    assert_eq!(members, vec![1, 2]);

    let report = simplify_groups(&mut network, &groups, Operator::CollapseToChord).unwrap();
    assert_eq!(report.replaced.len(), 1);
    assert_eq!(network.feature_count(), 3);
    let (_, new_id) = report.replaced[0];
    let replacement = network.feature(new_id).unwrap();
    assert_eq!(replacement.record.topology, Some(TopologyTag::Simplified));
    assert_eq!(
        replacement.geometry.parts()[0],
        vec![coord(50.0, 0.0), coord(50.4, 0.0)]
    );
}

proptest! {
    #[test]
    fn smoothing_keeps_straight_segments(
        ax in -1000.0_f64..1000.0, ay in -1000.0_f64..1000.0,
        bx in -1000.0_f64..1000.0, by in -1000.0_f64..1000.0,
    ) {
        let (a, b) = (coord(ax, ay), coord(bx, by));
        prop_assume!((ax - bx).abs() + (ay - by).abs() > 1.0);
        prop_assert_eq!(smooth_corners(vec![a, b]), vec![a, b]);
    }

    #[test]
    fn smoothing_keeps_short_straight_segments_at_projected_offsets(
        ox in 4.0e5_f64..6.0e5, oy in 5.4e6_f64..5.6e6,
        dx in -50.0_f64..50.0, dy in -50.0_f64..50.0,
    ) {
        let a = coord(ox, oy);
        let b = coord(ox + dx, oy + dy);
        prop_assume!(dx.hypot(dy) > 1e-3 && a != b);
        prop_assert_eq!(Operator::CornerSmoothing.reshape(vec![a, b]), vec![a, b]);
    }

    #[test]
    fn chaikin_pins_endpoints(
        pts in prop::collection::vec((-100.0_f64..100.0, -100.0_f64..100.0), 2..8)
    ) {
        let line: Vec<Coord> = pts.iter().map(|&(x, y)| coord(x, y)).collect();
        let smoothed = chaikin(&line, 2);
        prop_assert_eq!(smoothed.first(), line.first());
        prop_assert_eq!(smoothed.last(), line.last());
    }
}
