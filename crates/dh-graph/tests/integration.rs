//! Integration tests for dh-graph.

use std::collections::{BTreeSet, HashMap};

use approx::assert_relative_eq;
use dh_core::geometry::{Coord, CoordKey, coord};
use dh_core::FeatureId;
use dh_graph::{
    GraphBuilder, RoadGraph, SpatialIndex, build_graph, clean, connect_buildings, synthesize,
    write_network,
};
use dh_layer::{
    BuildingRecord, EdgeRecord, FeatureRequest, Geometry, LayerProvider, MemoryLayer, NewFeature,
    RoadRecord, ServiceLineRecord,
};
use petgraph::algo::dijkstra;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use proptest::prelude::*;

fn road(a: (f64, f64), b: (f64, f64)) -> NewFeature<RoadRecord> {
    NewFeature::new(
        Geometry::line(vec![coord(a.0, a.1), coord(b.0, b.1)]),
        RoadRecord::default(),
    )
}

fn lattice(n: usize, spacing: f64) -> RoadGraph {
    let mut builder = GraphBuilder::new();
    for i in 0..n {
        for j in 0..n {
            let (x, y) = (i as f64 * spacing, j as f64 * spacing);
            if i + 1 < n {
                builder.add_segment(coord(x, y), coord(x + spacing, y), None);
            }
            if j + 1 < n {
                builder.add_segment(coord(x, y), coord(x, y + spacing), None);
            }
        }
    }
    builder.build().unwrap()
}

/// Number of edges in the largest component, by edge count.
fn largest_component_edges(graph: &RoadGraph) -> usize {
    let mut sets = UnionFind::new(graph.node_count());
    for (a, b, _) in graph.edges() {
        sets.union(a.index(), b.index());
    }
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for (a, _, _) in graph.edges() {
        *counts.entry(sets.find(a.index())).or_default() += 1;
    }
    counts.values().copied().max().unwrap_or(0)
}

fn component_count(graph: &RoadGraph) -> usize {
    let mut sets = UnionFind::new(graph.node_count());
    for (a, b, _) in graph.edges() {
        sets.union(a.index(), b.index());
    }
    graph
        .nodes()
        .map(|n| sets.find(n.index()))
        .collect::<BTreeSet<_>>()
        .len()
}

fn shortest(graph: &RoadGraph, from: Coord, to: Coord) -> f64 {
    let start = graph.node_at(from).unwrap();
    let goal = graph.node_at(to).unwrap();
    let costs = dijkstra(graph.inner(), start, Some(goal), |e| e.weight().weight);
    costs[&goal]
}

/// Greedy chain from the source through the nearest unvisited terminal.
fn nearest_neighbour_chain(graph: &RoadGraph, terminals: &[Coord]) -> f64 {
    let mut remaining: Vec<Coord> = terminals[1..].to_vec();
    let mut current = terminals[0];
    let mut total = 0.0;
    while !remaining.is_empty() {
        let (idx, d) = remaining
            .iter()
            .enumerate()
            .map(|(i, &t)| (i, shortest(graph, current, t)))
            .min_by(|x, y| x.1.total_cmp(&y.1))
            .unwrap();
        total += d;
        current = remaining.swap_remove(idx);
    }
    total
}

#[test]
fn clean_then_synthesize_on_a_street_plan() {
    let mut roads = MemoryLayer::from_features(
        "roads",
        vec![
            road((0.0, 0.0), (50.0, 0.0)),
            road((50.05, 0.0), (100.0, 0.0)),
            road((50.0, 0.0), (50.0, 40.0)),
            road((300.0, 300.0), (310.0, 300.0)),
        ],
    );
    let (graph, report) = clean(&mut roads, 0.1).unwrap();
    assert_eq!(report.snapped_endpoints, 1);
    assert_eq!(report.components, 2);
    assert_eq!(report.deleted_features, vec![FeatureId::from_index(3)]);
    assert_eq!(graph.edge_count(), 3);

    let buildings = vec![
        (FeatureId::from_index(0), coord(90.0, 6.0)),
        (FeatureId::from_index(1), coord(46.0, 30.0)),
    ];
    let tree = synthesize(&graph, coord(0.0, 0.0), &buildings, 0.1);
    assert!(tree.excluded.is_empty());
    // 50 to the junction, 40 east plus a 6 m connector, 30 north plus 4 m.
    assert_relative_eq!(tree.total_weight(), 50.0 + 46.0 + 34.0, epsilon = 1e-9);

    let mut network: MemoryLayer<EdgeRecord> = MemoryLayer::new("network");
    let written = write_network(&tree, &mut network).unwrap();
    assert_eq!(written.edge_count, tree.edges.len());
    let connectors = network
        .features(&FeatureRequest::all())
        .filter(|f| f.record.road_id.is_none())
        .count();
    assert_eq!(connectors, 2);
}

#[test]
fn service_lines_feed_the_graph() {
    let roads = MemoryLayer::from_features("roads", vec![road((0.0, 0.0), (100.0, 0.0))]);
    let buildings = MemoryLayer::from_features(
        "buildings",
        vec![NewFeature::new(
            Geometry::Point(coord(40.0, 12.0)),
            BuildingRecord { heat_kw: Some(25.0) },
        )],
    );
    let mut service: MemoryLayer<ServiceLineRecord> = MemoryLayer::new("service");
    let report = connect_buildings(&buildings, &roads, &mut service).unwrap();
    assert_eq!(report.created.len(), 1);

    let mut builder = GraphBuilder::new();
    builder.add_layer(&roads);
    builder.add_layer(&service);
    let graph = builder.build().unwrap();
    // The service line ends mid-road, so the road is not split: two parts.
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(component_count(&graph), 2);
}

#[test]
fn spatial_index_from_road_layer() {
    let roads = MemoryLayer::from_features(
        "roads",
        vec![road((0.0, 0.0), (10.0, 0.0)), road((0.0, 20.0), (10.0, 20.0))],
    );
    let index = SpatialIndex::from_layer(&roads);
    assert_eq!(index.len(), 2);
    assert_eq!(index.nearest(coord(5.0, 15.0), 1), vec![FeatureId::from_index(1)]);
}

proptest! {
    #[test]
    fn cleaner_keeps_largest_component_and_is_a_fixed_point(
        segments in prop::collection::vec(((0u8..6, 0u8..6), (0u8..6, 0u8..6)), 1..25)
    ) {
        let drafts: Vec<NewFeature<RoadRecord>> = segments
            .iter()
            .filter(|(a, b)| a != b)
            .map(|&((ax, ay), (bx, by))| {
                road((f64::from(ax), f64::from(ay)), (f64::from(bx), f64::from(by)))
            })
            .collect();
        prop_assume!(!drafts.is_empty());
        let mut layer = MemoryLayer::from_features("roads", drafts);
        let expected = largest_component_edges(&build_graph(&layer).unwrap());

        let (graph, _) = clean(&mut layer, 0.1).unwrap();
        prop_assert_eq!(component_count(&graph), 1);
        prop_assert_eq!(graph.edge_count(), expected);

        let before: Vec<_> = layer.features(&FeatureRequest::all()).cloned().collect();
        let (again, report) = clean(&mut layer, 0.1).unwrap();
        let after: Vec<_> = layer.features(&FeatureRequest::all()).cloned().collect();
        prop_assert_eq!(report.snapped_endpoints, 0);
        prop_assert!(report.deleted_features.is_empty());
        prop_assert_eq!(again.edge_count(), graph.edge_count());
        prop_assert_eq!(before, after);
    }

    #[test]
    fn steiner_tree_spans_terminals_and_beats_the_greedy_chain(
        picks in prop::collection::btree_set((0u8..5, 0u8..5), 2..7)
    ) {
        let graph = lattice(5, 10.0);
        let terminals: Vec<Coord> = picks
            .iter()
            .map(|&(i, j)| coord(f64::from(i) * 10.0, f64::from(j) * 10.0))
            .collect();
        let buildings: Vec<(FeatureId, Coord)> = terminals[1..]
            .iter()
            .enumerate()
            .map(|(i, &c)| (FeatureId::from_index(i as u32), c))
            .collect();
        let tree = synthesize(&graph, terminals[0], &buildings, 0.1);
        prop_assert!(tree.excluded.is_empty());

        // Connected and acyclic: |E| = |V| - 1 with a single component.
        let mut ids: HashMap<CoordKey, usize> = HashMap::new();
        for e in &tree.edges {
            for c in [e.a, e.b] {
                let next = ids.len();
                ids.entry(CoordKey::from_coord(c)).or_insert(next);
            }
        }
        prop_assert_eq!(tree.edges.len() + 1, ids.len());
        let mut sets = UnionFind::new(ids.len());
        for e in &tree.edges {
            sets.union(ids[&CoordKey::from_coord(e.a)], ids[&CoordKey::from_coord(e.b)]);
        }
        let roots: BTreeSet<usize> = (0..ids.len()).map(|i| sets.find(i)).collect();
        prop_assert_eq!(roots.len(), 1);
        for t in &terminals {
            prop_assert!(ids.contains_key(&CoordKey::from_coord(*t)));
        }

        let baseline = nearest_neighbour_chain(&graph, &terminals);
        prop_assert!(tree.total_weight() <= baseline + 1e-9);
    }
}
