//! Grouping of flagged edges into simplification candidates.

use std::collections::{BTreeMap, BTreeSet};

use dh_core::geometry::CoordKey;
use dh_core::{FeatureId, GroupId};
use petgraph::unionfind::UnionFind;

use crate::endpoints::EndpointIndex;
use crate::filter::EdgeFlags;

/// A set of network edges to be replaced by one edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    /// Member edge ids, ascending.
    pub members: Vec<FeatureId>,
    /// Unflagged edges that joined because they bridge two flagged groups.
    pub bridges: Vec<FeatureId>,
}

/// Partition flagged edges into disjoint groups.
///
/// Flagged edges are joined across shared endpoints, except at junctions
/// (three or more edge ends) and at the `protected` coordinates. Two
/// groups touched by the same unflagged edge are then merged together
/// with that edge. Groups with a single member are dropped.
///
/// Merges are computed on a snapshot of the first-pass groups and applied
/// afterwards, so the result does not depend on iteration order.
pub fn group_edges(
    index: &EndpointIndex,
    flags: &EdgeFlags,
    protected: &BTreeSet<CoordKey>,
) -> Vec<Group> {
    let edges: Vec<FeatureId> = index.edge_ids().collect();
    let slot: BTreeMap<FeatureId, usize> =
        edges.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let is_flagged = |id: &FeatureId| flags.contains_key(id);
    let open = |key: &CoordKey| !index.is_junction(*key) && !protected.contains(key);

    // Joints: open endpoints with the flagged edges meeting there.
    let mut joints: BTreeMap<CoordKey, Vec<usize>> = BTreeMap::new();
    for (key, _) in index.degrees() {
        if !open(&key) {
            continue;
        }
        let flagged: Vec<usize> = index
            .edges_at(key)
            .iter()
            .filter(|(id, _)| is_flagged(id))
            .map(|(id, _)| slot[id])
            .collect();
        joints.insert(key, flagged);
    }

    let mut first = UnionFind::<usize>::new(edges.len());
    for members in joints.values() {
        for pair in members.windows(2) {
            first.union(pair[0], pair[1]);
        }
    }
    let snapshot: Vec<usize> = (0..edges.len()).map(|i| first.find(i)).collect();

    // Unflagged edges touching two distinct snapshot groups.
    let mut bridges: Vec<(usize, BTreeSet<usize>)> = Vec::new();
    for (i, id) in edges.iter().enumerate() {
        if is_flagged(id) {
            continue;
        }
        let Some((a, b)) = index.ends(*id) else {
            continue;
        };
        let touched: BTreeSet<usize> = [CoordKey::from_coord(a), CoordKey::from_coord(b)]
            .iter()
            .filter_map(|k| joints.get(k))
            .flatten()
            .map(|&member| snapshot[member])
            .collect();
        if touched.len() >= 2 {
            bridges.push((i, touched));
        }
    }

    let mut merged = UnionFind::<usize>::new(edges.len());
    for (i, &root) in snapshot.iter().enumerate() {
        merged.union(i, root);
    }
    let mut bridge_slots = BTreeSet::new();
    for (bridge, touched) in &bridges {
        for &root in touched {
            merged.union(*bridge, root);
        }
        bridge_slots.insert(*bridge);
    }

    let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, id) in edges.iter().enumerate() {
        if is_flagged(id) || bridge_slots.contains(&i) {
            by_root.entry(merged.find(i)).or_default().push(i);
        }
    }
    let mut members: Vec<Vec<usize>> = by_root.into_values().filter(|m| m.len() >= 2).collect();
    members.sort_by_key(|m| m[0]);

    let groups: Vec<Group> = members
        .into_iter()
        .enumerate()
        .map(|(n, slots)| Group {
            id: GroupId::from_index(n as u32),
            members: slots.iter().map(|&s| edges[s]).collect(),
            bridges: slots
                .iter()
                .filter(|&&s| bridge_slots.contains(&s))
                .map(|&s| edges[s])
                .collect(),
        })
        .collect();
    tracing::debug!(groups = groups.len(), bridges = bridges.len(), "edges grouped");
    groups
}
