//! Simultaneity and pipe-size assignment.

use std::collections::BTreeMap;

use dh_core::FeatureId;
use dh_layer::{EdgeFlag, EdgeRecord, FeatureRequest, LayerProvider, NodeRecord, transaction};

use crate::capacity::CapacityTable;
use crate::error::{HydraulicsError, HydraulicsResult};

/// Default simultaneity constant D_s.
pub const DEFAULT_SIMULTANEITY: f64 = 0.62;

/// Diversified load: `heat_kw * (D_s + (1 - D_s) / n)`, zero when `n = 0`.
pub fn simultaneous_load_kw(heat_kw: f64, nr_con: u32, simultaneity: f64) -> f64 {
    if nr_con == 0 {
        return 0.0;
    }
    heat_kw * (simultaneity + (1.0 - simultaneity) / f64::from(nr_con))
}

pub fn validate_simultaneity(simultaneity: f64) -> HydraulicsResult<()> {
    if !(0.0..=1.0).contains(&simultaneity) {
        return Err(HydraulicsError::config(format!(
            "simultaneity {simultaneity} outside [0, 1]"
        )));
    }
    Ok(())
}

/// Outcome of a sizing run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizingReport {
    /// Edge and the nominal size it received.
    pub assigned: Vec<(FeatureId, u32)>,
    /// Edges whose load exceeds every catalog size (left without a size).
    pub over_capacity: Vec<FeatureId>,
    /// Edges with no downstream node.
    pub unreached: Vec<FeatureId>,
}

impl SizingReport {
    pub fn is_complete(&self) -> bool {
        self.over_capacity.is_empty() && self.unreached.is_empty()
    }
}

/// Write `qs_kw` on every node, then give each edge the load of its
/// downstream node and the smallest sufficient catalog size.
///
/// `edge_nodes` maps each edge to the node it feeds. Edges absent from it
/// are flagged unreached. Both layers are edited in their own transaction;
/// the node transaction commits before edges are touched.
#[tracing::instrument(skip_all)]
pub fn assign_sizes(
    network: &mut dyn LayerProvider<EdgeRecord>,
    nodes: &mut dyn LayerProvider<NodeRecord>,
    edge_nodes: &BTreeMap<FeatureId, FeatureId>,
    table: &CapacityTable,
    simultaneity: f64,
) -> HydraulicsResult<SizingReport> {
    validate_simultaneity(simultaneity)?;
    if table.entries().is_empty() {
        return Err(HydraulicsError::EmptyCatalog);
    }

    let node_load = transaction(nodes, |layer| -> HydraulicsResult<BTreeMap<FeatureId, f64>> {
        let mut updated: Vec<_> = layer.features(&FeatureRequest::all()).cloned().collect();
        let mut loads = BTreeMap::new();
        for node in &mut updated {
            node.record.qs_kw =
                simultaneous_load_kw(node.record.heat_kw, node.record.nr_con, simultaneity);
            loads.insert(node.id, node.record.qs_kw);
        }
        for node in updated {
            layer.update_feature(node)?;
        }
        Ok(loads)
    })?;

    let report = transaction(network, |layer| -> HydraulicsResult<SizingReport> {
        let mut report = SizingReport::default();
        let edges: Vec<_> = layer.features(&FeatureRequest::all()).cloned().collect();
        for mut edge in edges {
            edge.record.clear_sizing();
            let load = edge_nodes
                .get(&edge.id)
                .and_then(|node| node_load.get(node).copied());
            match load {
                None => {
                    edge.record.set_flag(EdgeFlag::Unreached);
                    report.unreached.push(edge.id);
                }
                Some(qs_kw) => {
                    edge.record.qs_kw = Some(qs_kw);
                    match table.smallest_sufficient(qs_kw) {
                        Some(entry) => {
                            edge.record.dn = Some(entry.dn);
                            edge.record.capacity_kw = Some(entry.max_heat_kw);
                            report.assigned.push((edge.id, entry.dn));
                        }
                        None => {
                            tracing::warn!(edge = %edge.id, qs_kw, "load exceeds largest pipe");
                            edge.record.set_flag(EdgeFlag::CapacityExceeded);
                            report.over_capacity.push(edge.id);
                        }
                    }
                }
            }
            layer.update_feature(edge)?;
        }
        Ok(report)
    })?;

    tracing::info!(
        assigned = report.assigned.len(),
        over_capacity = report.over_capacity.len(),
        unreached = report.unreached.len(),
        "pipe sizes assigned"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn simultaneity_discounts_many_connections() {
        assert_eq!(simultaneous_load_kw(100.0, 0, 0.62), 0.0);
        assert_relative_eq!(simultaneous_load_kw(100.0, 1, 0.62), 100.0, max_relative = 1e-12);
        assert_relative_eq!(simultaneous_load_kw(100.0, 2, 0.62), 81.0, max_relative = 1e-12);
        assert_relative_eq!(simultaneous_load_kw(100.0, 1000, 0.62), 62.038, max_relative = 1e-12);
    }

    #[test]
    fn simultaneity_bounds() {
        assert!(validate_simultaneity(0.0).is_ok());
        assert!(validate_simultaneity(1.0).is_ok());
        assert!(validate_simultaneity(1.2).is_err());
        assert!(validate_simultaneity(f64::NAN).is_err());
    }
}
