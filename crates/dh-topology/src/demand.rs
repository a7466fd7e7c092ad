//! Demand aggregation over the network rooted at the source.
//!
//! Each node inherits the demand of its nearest building. Edges are then
//! oriented away from the source by breadth-first traversal, and every node
//! receives the count and sum of the non-zero demand in its subtree.

use std::collections::{BTreeMap, HashMap, VecDeque};

use dh_core::geometry::{Coord, cmp_coords, distance};
use dh_core::FeatureId;
use dh_graph::{RoadGraph, SpatialIndex, build_graph};
use dh_layer::{BuildingRecord, EdgeRecord, FeatureRequest, LayerProvider, NodeRecord, transaction};
use petgraph::graph::NodeIndex;

use crate::error::TopologyResult;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DemandConfig {
    /// Buildings farther than this from a node are not matched to it.
    pub max_match_distance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandReport {
    /// (node, building) pairs that passed a building's demand to a node.
    pub matched: Vec<(FeatureId, FeatureId)>,
    /// First node downstream of each reached network edge.
    pub edge_nodes: BTreeMap<FeatureId, FeatureId>,
    pub unreached_edges: Vec<FeatureId>,
    pub unreached_nodes: Vec<FeatureId>,
    /// Demand collected at the root, kW.
    pub total_demand_kw: f64,
}

/// Breadth-first orientation from a root; neighbours are visited in
/// coordinate order.
struct Rooted {
    order: Vec<NodeIndex>,
    position: Vec<Option<usize>>,
    parent: Vec<Option<NodeIndex>>,
}

impl Rooted {
    fn new(graph: &RoadGraph, root: NodeIndex) -> Self {
        let n = graph.node_count();
        let mut rooted = Self {
            order: Vec::with_capacity(n),
            position: vec![None; n],
            parent: vec![None; n],
        };
        let mut queue = VecDeque::from([root]);
        rooted.position[root.index()] = Some(0);
        while let Some(current) = queue.pop_front() {
            rooted.order.push(current);
            let mut next: Vec<NodeIndex> = graph
                .inner()
                .neighbors(current)
                .filter(|nb| rooted.position[nb.index()].is_none())
                .collect();
            next.sort_by(|a, b| cmp_coords(graph.coord(*a), graph.coord(*b)));
            next.dedup();
            for nb in next {
                rooted.position[nb.index()] = Some(rooted.order.len() + queue.len());
                rooted.parent[nb.index()] = Some(current);
                queue.push_back(nb);
            }
        }
        rooted
    }

    fn reached(&self, node: NodeIndex) -> bool {
        self.position[node.index()].is_some()
    }
}

/// Graph node at the source, or the nearest one if the source is off the
/// network.
fn root_node(graph: &RoadGraph, source: Coord) -> Option<NodeIndex> {
    graph.node_at(source).or_else(|| {
        graph.nodes().min_by(|a, b| {
            distance(graph.coord(*a), source)
                .total_cmp(&distance(graph.coord(*b), source))
                .then_with(|| cmp_coords(graph.coord(*a), graph.coord(*b)))
        })
    })
}

/// Building demand credited to each node: every node looks up its nearest
/// building, and a building claimed by several nodes goes to the closest
/// (lowest node id on ties).
fn match_buildings(
    nodes: &dyn LayerProvider<NodeRecord>,
    buildings: &dyn LayerProvider<BuildingRecord>,
    config: &DemandConfig,
) -> BTreeMap<FeatureId, (FeatureId, f64)> {
    let index = SpatialIndex::from_layer(buildings);
    let mut claims: BTreeMap<FeatureId, (f64, FeatureId)> = BTreeMap::new();
    for node in nodes.features(&FeatureRequest::all()) {
        let Some(at) = node.point() else { continue };
        let Some(&(building, d)) = index.nearest_with_distance(at, 1).first() else {
            continue;
        };
        if config.max_match_distance.is_some_and(|max| d > max) {
            continue;
        }
        claims
            .entry(building)
            .and_modify(|best| {
                if (d, node.id) < *best {
                    *best = (d, node.id);
                }
            })
            .or_insert((d, node.id));
    }
    claims
        .into_iter()
        .filter_map(|(building, (_, node))| {
            let demand = buildings.feature(building)?.record.demand_kw();
            Some((node, (building, demand)))
        })
        .collect()
}

/// Annotate every node with `heat_kw` and `nr_con`, and map every edge to
/// the first node downstream of it.
///
/// `nr_con` counts the nodes with non-zero own demand in the node's
/// subtree (itself included); `heat_kw` becomes the sum of that demand.
/// Nodes and edges not connected to the source keep their own demand and
/// are reported.
#[tracing::instrument(skip_all)]
pub fn aggregate_demand(
    network: &dyn LayerProvider<EdgeRecord>,
    nodes: &mut dyn LayerProvider<NodeRecord>,
    buildings: &dyn LayerProvider<BuildingRecord>,
    source: Coord,
    config: &DemandConfig,
) -> TopologyResult<DemandReport> {
    let graph = build_graph(network)?;
    let mut report = DemandReport::default();
    let Some(root) = root_node(&graph, source) else {
        tracing::warn!("network is empty; no demand to aggregate");
        return Ok(report);
    };
    let rooted = Rooted::new(&graph, root);

    let own = match_buildings(nodes, buildings, config);
    report.matched = own.iter().map(|(node, (b, _))| (*node, *b)).collect();

    let mut node_at: HashMap<NodeIndex, FeatureId> = HashMap::new();
    let mut graph_node: HashMap<FeatureId, NodeIndex> = HashMap::new();
    let mut demand = vec![0.0_f64; graph.node_count()];
    for node in nodes.features(&FeatureRequest::all()) {
        let Some(g) = node.point().and_then(|p| graph.node_at(p)) else {
            continue;
        };
        node_at.insert(g, node.id);
        graph_node.insert(node.id, g);
        if let Some(&(_, kw)) = own.get(&node.id) {
            demand[g.index()] = kw;
        }
    }

    let mut count = vec![0_u32; graph.node_count()];
    let mut sum = vec![0.0_f64; graph.node_count()];
    let mut children: Vec<Vec<NodeIndex>> = vec![Vec::new(); graph.node_count()];
    for &n in rooted.order.iter().rev() {
        let i = n.index();
        if demand[i] > 0.0 {
            count[i] += 1;
            sum[i] += demand[i];
        }
        if let Some(p) = rooted.parent[i] {
            count[p.index()] += count[i];
            sum[p.index()] += sum[i];
            children[p.index()].push(n);
        }
    }
    report.total_demand_kw = sum[root.index()];

    // First node at or below each graph node; children were pushed in
    // reverse order, so the last one is the smallest coordinate.
    let mut downstream: Vec<Option<FeatureId>> = vec![None; graph.node_count()];
    for &n in rooted.order.iter().rev() {
        downstream[n.index()] = match node_at.get(&n) {
            Some(&id) => Some(id),
            None => children[n.index()]
                .last()
                .and_then(|c| downstream[c.index()]),
        };
    }

    for edge in network.features(&FeatureRequest::all()) {
        let ends = edge
            .geometry
            .terminal_points()
            .and_then(|(a, b)| Some((graph.node_at(a)?, graph.node_at(b)?)));
        let Some((a, b)) = ends.filter(|&(a, b)| rooted.reached(a) && rooted.reached(b)) else {
            report.unreached_edges.push(edge.id);
            continue;
        };
        let child = if rooted.position[a.index()] > rooted.position[b.index()] { a } else { b };
        if let Some(node) = downstream[child.index()] {
            report.edge_nodes.insert(edge.id, node);
        }
    }

    let updates: Vec<_> = nodes
        .features(&FeatureRequest::all())
        .map(|node| {
            let mut feature = node.clone();
            let matched = own.get(&node.id);
            feature.record.building_id = matched.map(|(b, _)| *b);
            let own_kw = matched.map_or(0.0, |(_, kw)| *kw);
            match graph_node.get(&node.id).copied() {
                Some(g) if rooted.reached(g) => {
                    feature.record.nr_con = count[g.index()];
                    feature.record.heat_kw = if count[g.index()] > 0 {
                        sum[g.index()]
                    } else {
                        own_kw
                    };
                }
                _ => {
                    report.unreached_nodes.push(node.id);
                    feature.record.nr_con = u32::from(own_kw > 0.0);
                    feature.record.heat_kw = own_kw;
                }
            }
            feature
        })
        .collect();
    transaction(nodes, |layer| -> TopologyResult<()> {
        for feature in updates {
            layer.update_feature(feature)?;
        }
        Ok(())
    })?;

    tracing::info!(
        matched = report.matched.len(),
        total_kw = report.total_demand_kw,
        unreached_edges = report.unreached_edges.len(),
        "demand aggregated"
    );
    Ok(report)
}
