//! Approximate minimum Steiner tree over the cleaned road graph.
//!
//! Metric-closure construction: shortest paths between every pair of
//! terminals, minimum spanning tree of the complete terminal graph,
//! expansion of each tree edge back into its road path. The expanded union
//! is reduced to a spanning tree and stripped of non-terminal leaves.
//!
//! Every tie (equal path lengths, equal edge weights) is broken by
//! coordinate order, so identical inputs give identical trees.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};

use dh_core::geometry::{Coord, CoordKey, distance, project_onto_segment};
use dh_core::FeatureId;
use dh_layer::{EdgeRecord, FeatureRequest, Geometry, LayerProvider, NewFeature, transaction};
use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::error::GraphResult;
use crate::graph::{GraphEdge, RoadGraph};

/// Which terminal a coordinate stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TerminalKind {
    Source,
    Building(FeatureId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terminal {
    pub kind: TerminalKind,
    pub at: Coord,
}

impl Terminal {
    pub fn source(at: Coord) -> Self {
        Self {
            kind: TerminalKind::Source,
            at,
        }
    }

    pub fn building(id: FeatureId, at: Coord) -> Self {
        Self {
            kind: TerminalKind::Building(id),
            at,
        }
    }
}

/// Why a terminal was left out of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The graph has no edges to snap onto.
    NoGraph,
    /// No path between the terminal and the source.
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExcludedTerminal {
    pub terminal: TerminalKind,
    pub reason: ExclusionReason,
}

/// One selected edge of the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeEdge {
    pub a: Coord,
    pub b: Coord,
    pub weight: f64,
    /// Road feature the edge runs along; `None` for snap connectors.
    pub road: Option<FeatureId>,
}

/// Result of a synthesis run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SteinerTree {
    /// Edges ordered by their (smaller, larger) endpoint keys.
    pub edges: Vec<TreeEdge>,
    /// Terminals connected by the tree (or the lone resolvable terminal).
    pub resolved: Vec<TerminalKind>,
    pub excluded: Vec<ExcludedTerminal>,
}

impl SteinerTree {
    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Summary of a synthesis written into the network layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SteinerReport {
    pub resolved: usize,
    pub excluded: Vec<ExcludedTerminal>,
    pub edge_count: usize,
    pub total_length: f64,
    pub network_ids: Vec<FeatureId>,
}

/// Graph edge indexed for terminal snapping.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    a: [f64; 2],
    b: [f64; 2],
    na: NodeIndex,
    nb: NodeIndex,
    feature: Option<FeatureId>,
}

impl Segment {
    fn ends(&self) -> (Coord, Coord) {
        (
            Coord { x: self.a[0], y: self.a[1] },
            Coord { x: self.b[0], y: self.b[1] },
        )
    }

    fn order_key(&self) -> (CoordKey, CoordKey) {
        let (a, b) = self.ends();
        let (ka, kb) = (CoordKey::from_coord(a), CoordKey::from_coord(b));
        if ka <= kb { (ka, kb) } else { (kb, ka) }
    }
}

impl RTreeObject for Segment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a, self.b)
    }
}

impl PointDistance for Segment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let (a, b) = self.ends();
        let d = project_onto_segment(Coord { x: point[0], y: point[1] }, a, b).distance;
        d * d
    }
}

/// Working copy of the graph that terminals get spliced into.
struct SnapGraph {
    graph: RoadGraph,
    segments: RTree<Segment>,
    tolerance: f64,
}

impl SnapGraph {
    fn new(graph: &RoadGraph, tolerance: f64) -> Self {
        let segments = graph
            .edges()
            .map(|(na, nb, e)| {
                let (a, b) = (graph.coord(na), graph.coord(nb));
                Segment {
                    a: [a.x, a.y],
                    b: [b.x, b.y],
                    na,
                    nb,
                    feature: e.feature,
                }
            })
            .collect();
        Self {
            graph: graph.clone(),
            segments: RTree::bulk_load(segments),
            tolerance,
        }
    }

    /// Nearest segment; among equally near ones the smallest by endpoint
    /// keys, then feature id.
    fn nearest_segment(&self, p: Coord) -> Option<Segment> {
        let mut best: Option<(f64, &Segment)> = None;
        for (seg, d2) in self.segments.nearest_neighbor_iter_with_distance_2(&[p.x, p.y]) {
            match best {
                Some((bd, _)) if d2 > bd => break,
                Some((_, current))
                    if (seg.order_key(), seg.feature) >= (current.order_key(), current.feature) => {}
                _ => best = Some((d2, seg)),
            }
        }
        best.map(|(_, seg)| seg.clone())
    }

    /// Split `seg` at `p`, returning the new interior node.
    fn split(&mut self, seg: &Segment, p: Coord) -> NodeIndex {
        let target = self
            .graph
            .graph
            .edges_connecting(seg.na, seg.nb)
            .find(|e| e.weight().feature == seg.feature)
            .map(|e| e.id());
        if let Some(edge) = target {
            self.graph.remove_edge(edge);
        }
        self.segments.remove(seg);
        let (a, b) = seg.ends();
        self.graph.add_segment(a, p, seg.feature);
        self.graph.add_segment(p, b, seg.feature);
        let mid = self.graph.ensure_node(p);
        for (from, to, na, nb) in [(a, p, seg.na, mid), (p, b, mid, seg.nb)] {
            self.segments.insert(Segment {
                a: [from.x, from.y],
                b: [to.x, to.y],
                na,
                nb,
                feature: seg.feature,
            });
        }
        mid
    }

    /// Resolve a terminal to a node, splicing in a connector if it does
    /// not sit on the graph.
    fn attach(&mut self, at: Coord) -> Option<NodeIndex> {
        if let Some(node) = self.graph.node_at(at) {
            return Some(node);
        }
        let seg = self.nearest_segment(at)?;
        let (a, b) = seg.ends();
        let proj = project_onto_segment(at, a, b);
        let foot = if distance(proj.point, a) <= self.tolerance {
            seg.na
        } else if distance(proj.point, b) <= self.tolerance {
            seg.nb
        } else {
            self.split(&seg, proj.point)
        };
        let foot_at = self.graph.coord(foot);
        if CoordKey::from_coord(foot_at) == CoordKey::from_coord(at) {
            return Some(foot);
        }
        self.graph.add_segment(foot_at, at, None);
        self.graph.node_at(at)
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: f64,
    key: CoordKey,
    node: NodeIndex,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    // Reversed: BinaryHeap is a max-heap, we want the cheapest first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.key.cmp(&self.key))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-source shortest paths with a predecessor tree.
struct ShortestPaths {
    dist: Vec<f64>,
    pred: Vec<Option<NodeIndex>>,
}

impl ShortestPaths {
    fn reachable(&self, node: NodeIndex) -> bool {
        self.dist[node.index()].is_finite()
    }

    /// Nodes on the path from the start to `to`, start first.
    fn path_to(&self, to: NodeIndex) -> Vec<NodeIndex> {
        let mut path = vec![to];
        let mut current = to;
        while let Some(prev) = self.pred[current.index()] {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        path
    }
}

/// Dijkstra where equal-cost predecessors resolve to the smaller coordinate.
fn shortest_paths(graph: &RoadGraph, start: NodeIndex) -> ShortestPaths {
    let n = graph.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut pred: Vec<Option<NodeIndex>> = vec![None; n];
    let mut done = vec![false; n];
    let mut heap = BinaryHeap::new();
    dist[start.index()] = 0.0;
    heap.push(Candidate {
        cost: 0.0,
        key: graph.key(start),
        node: start,
    });

    while let Some(Candidate { cost, node, .. }) = heap.pop() {
        if done[node.index()] {
            continue;
        }
        done[node.index()] = true;
        let node_key = graph.key(node);
        for edge in graph.inner().edges(node) {
            let next = edge.target();
            if done[next.index()] {
                continue;
            }
            let candidate = cost + edge.weight().weight;
            let slot = next.index();
            let better = candidate < dist[slot]
                || (candidate == dist[slot]
                    && pred[slot].is_some_and(|p| node_key < graph.key(p)));
            if better {
                dist[slot] = candidate;
                pred[slot] = Some(node);
                heap.push(Candidate {
                    cost: candidate,
                    key: graph.key(next),
                    node: next,
                });
            }
        }
    }
    ShortestPaths { dist, pred }
}

fn ordered_pair(graph: &RoadGraph, a: NodeIndex, b: NodeIndex) -> (CoordKey, CoordKey) {
    let (ka, kb) = (graph.key(a), graph.key(b));
    if ka <= kb { (ka, kb) } else { (kb, ka) }
}

/// Kruskal over `(weight, pair)` edges; ties go to the smaller pair.
fn spanning_edges<T: Copy>(
    mut edges: Vec<(f64, (CoordKey, CoordKey), usize, usize, T)>,
    node_count: usize,
) -> Vec<(f64, (CoordKey, CoordKey), usize, usize, T)> {
    edges.sort_by(|x, y| x.0.total_cmp(&y.0).then_with(|| x.1.cmp(&y.1)));
    let mut sets = UnionFind::<usize>::new(node_count);
    edges
        .into_iter()
        .filter(|&(_, _, a, b, _)| sets.union(a, b))
        .collect()
}

/// Compute the tree connecting `source` and `buildings` over `graph`.
///
/// Terminals off the graph are snapped onto the nearest edge (split at
/// the foot point) and joined by a connector edge. Terminals with no path
/// to the source are excluded. Fewer than two resolvable terminals give
/// an empty tree.
#[tracing::instrument(skip_all, fields(terminals = buildings.len() + 1))]
pub fn synthesize(
    graph: &RoadGraph,
    source: Coord,
    buildings: &[(FeatureId, Coord)],
    snap_tolerance: f64,
) -> SteinerTree {
    let mut terminals = vec![Terminal::source(source)];
    let mut sorted: Vec<(FeatureId, Coord)> = buildings.to_vec();
    sorted.sort_by_key(|(id, _)| *id);
    terminals.extend(sorted.into_iter().map(|(id, at)| Terminal::building(id, at)));

    let mut tree = SteinerTree::default();
    if graph.is_empty() {
        tracing::warn!("graph has no edges; no terminal can be resolved");
        tree.excluded = terminals
            .iter()
            .map(|t| ExcludedTerminal {
                terminal: t.kind,
                reason: ExclusionReason::NoGraph,
            })
            .collect();
        return tree;
    }

    let mut working = SnapGraph::new(graph, snap_tolerance);
    let mut attached: Vec<(TerminalKind, NodeIndex)> = Vec::with_capacity(terminals.len());
    for t in &terminals {
        match working.attach(t.at) {
            Some(node) => attached.push((t.kind, node)),
            None => tree.excluded.push(ExcludedTerminal {
                terminal: t.kind,
                reason: ExclusionReason::NoGraph,
            }),
        }
    }
    let graph = working.graph;

    let Some(&(_, source_node)) = attached.iter().find(|(k, _)| *k == TerminalKind::Source)
    else {
        return tree;
    };
    let from_source = shortest_paths(&graph, source_node);
    let mut terminal_nodes: BTreeSet<NodeIndex> = BTreeSet::new();
    for &(kind, node) in &attached {
        if from_source.reachable(node) {
            tree.resolved.push(kind);
            terminal_nodes.insert(node);
        } else {
            tracing::warn!(terminal = ?kind, "terminal has no path to the source; excluded");
            tree.excluded.push(ExcludedTerminal {
                terminal: kind,
                reason: ExclusionReason::Unreachable,
            });
        }
    }
    if terminal_nodes.len() < 2 {
        tracing::info!(resolved = terminal_nodes.len(), "fewer than two terminals; no tree");
        return tree;
    }

    // Metric closure over the terminals.
    let nodes: Vec<NodeIndex> = terminal_nodes.iter().copied().collect();
    let paths: Vec<ShortestPaths> = nodes
        .iter()
        .map(|&n| {
            if n == source_node {
                ShortestPaths {
                    dist: from_source.dist.clone(),
                    pred: from_source.pred.clone(),
                }
            } else {
                shortest_paths(&graph, n)
            }
        })
        .collect();
    let mut closure = Vec::new();
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let d = paths[i].dist[nodes[j].index()];
            closure.push((d, ordered_pair(&graph, nodes[i], nodes[j]), i, j, ()));
        }
    }

    // Expand the closure tree into road paths; parallel edges collapse to
    // the cheapest one.
    let mut union: BTreeMap<(CoordKey, CoordKey), (f64, NodeIndex, NodeIndex, GraphEdge)> =
        BTreeMap::new();
    for (_, _, i, j, ()) in spanning_edges(closure, nodes.len()) {
        let path = paths[i].path_to(nodes[j]);
        for step in path.windows(2) {
            let (a, b) = (step[0], step[1]);
            if let Some((_, edge)) = graph.cheapest_edge(a, b) {
                union
                    .entry(ordered_pair(&graph, a, b))
                    .or_insert((edge.weight, a, b, edge));
            }
        }
    }

    // Spanning tree of the union, then strip non-terminal leaves.
    let candidates = union
        .into_iter()
        .map(|(pair, (w, a, b, edge))| (w, pair, a.index(), b.index(), edge))
        .collect();
    let mut kept: BTreeMap<(CoordKey, CoordKey), (usize, usize, GraphEdge)> =
        spanning_edges(candidates, graph.node_count())
            .into_iter()
            .map(|(_, pair, a, b, edge)| (pair, (a, b, edge)))
            .collect();
    let terminal_idx: BTreeSet<usize> = terminal_nodes.iter().map(|n| n.index()).collect();
    loop {
        let mut degree: HashMap<usize, usize> = HashMap::new();
        for &(a, b, _) in kept.values() {
            *degree.entry(a).or_default() += 1;
            *degree.entry(b).or_default() += 1;
        }
        let before = kept.len();
        kept.retain(|_, &mut (a, b, _)| {
            let dangling = |n: usize| degree[&n] == 1 && !terminal_idx.contains(&n);
            !dangling(a) && !dangling(b)
        });
        if kept.len() == before {
            break;
        }
    }

    tree.edges = kept
        .values()
        .map(|&(a, b, edge)| {
            let (ca, cb) = (
                graph.coord(NodeIndex::new(a)),
                graph.coord(NodeIndex::new(b)),
            );
            TreeEdge {
                a: ca,
                b: cb,
                weight: edge.weight,
                road: edge.feature,
            }
        })
        .collect();
    tracing::info!(
        edges = tree.edges.len(),
        length = tree.total_weight(),
        resolved = tree.resolved.len(),
        excluded = tree.excluded.len(),
        "steiner tree synthesized"
    );
    tree
}

/// Replace the contents of the network layer with the tree's edges, one
/// feature per edge, in one edit session.
#[tracing::instrument(skip_all, fields(layer = network.name()))]
pub fn write_network(
    tree: &SteinerTree,
    network: &mut dyn LayerProvider<EdgeRecord>,
) -> GraphResult<SteinerReport> {
    let network_ids = transaction(network, |layer| -> GraphResult<Vec<FeatureId>> {
        let stale: Vec<FeatureId> = layer.features(&FeatureRequest::all()).map(|f| f.id).collect();
        layer.delete_features(&stale)?;
        let drafts = tree
            .edges
            .iter()
            .map(|e| {
                NewFeature::new(
                    Geometry::line(vec![e.a, e.b]),
                    EdgeRecord::along_road(e.road),
                )
            })
            .collect();
        Ok(layer.add_features(drafts)?)
    })?;
    Ok(SteinerReport {
        resolved: tree.resolved.len(),
        excluded: tree.excluded.clone(),
        edge_count: network_ids.len(),
        total_length: tree.total_weight(),
        network_ids,
    })
}
