//! Serializable design summary for hosts.

use dh_graph::{ExclusionReason, TerminalKind};
use dh_hydraulics::CapacityTable;
use dh_layer::{EdgeRecord, FeatureRequest, LayerProvider, NodeRecord};
use serde::Serialize;

use crate::design_service::DesignResponse;

#[derive(Debug, Clone, Serialize)]
pub struct CapacityRow {
    pub dn: u32,
    pub inner_diameter_m: f64,
    pub max_velocity_m_s: f64,
    pub max_heat_kw: f64,
}

pub fn capacity_rows(table: &CapacityTable) -> Vec<CapacityRow> {
    table
        .entries()
        .iter()
        .map(|e| CapacityRow {
            dn: e.dn,
            inner_diameter_m: e.inner_diameter_m,
            max_velocity_m_s: e.max_velocity_mps,
            max_heat_kw: e.max_heat_kw,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeRow {
    pub id: u32,
    pub length_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<&'static str>,
    pub dn: Option<u32>,
    pub qs_kw: Option<f64>,
    pub capacity_kw: Option<f64>,
    pub loss_w: Option<f64>,
    pub flags: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeRow {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub heat_kw: f64,
    pub nr_con: u32,
    pub qs_kw: f64,
    pub building_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DesignSummary {
    pub terminals_resolved: usize,
    pub terminals_excluded: Vec<String>,
    pub network_edges: usize,
    pub network_length_m: f64,
    pub groups: usize,
    pub groups_replaced: usize,
    pub total_demand_kw: f64,
    pub over_capacity: usize,
    pub unreached: usize,
    pub supply_loss_w_m: f64,
    pub return_loss_w_m: f64,
    pub total_heat_loss_w: f64,
    pub total_time_s: f64,
    pub capacity: Vec<CapacityRow>,
    pub edges: Vec<EdgeRow>,
    pub nodes: Vec<NodeRow>,
}

fn describe_exclusion(kind: TerminalKind, reason: ExclusionReason) -> String {
    let who = match kind {
        TerminalKind::Source => "source".to_string(),
        TerminalKind::Building(id) => format!("building {id}"),
    };
    let why = match reason {
        ExclusionReason::NoGraph => "no road graph",
        ExclusionReason::Unreachable => "unreachable from the source",
    };
    format!("{who}: {why}")
}

/// Collect the response and the annotated output layers into one summary.
pub fn summarize(
    response: &DesignResponse,
    network: &dyn LayerProvider<EdgeRecord>,
    nodes: &dyn LayerProvider<NodeRecord>,
) -> DesignSummary {
    let edges: Vec<EdgeRow> = network
        .features(&FeatureRequest::all())
        .map(|f| EdgeRow {
            id: f.id.index(),
            length_m: f.geometry.length(),
            topology: f.record.topology.map(|t| t.as_str()),
            dn: f.record.dn,
            qs_kw: f.record.qs_kw,
            capacity_kw: f.record.capacity_kw,
            loss_w: f.record.loss_w,
            flags: f.record.flags.iter().map(|flag| flag.as_str()).collect(),
        })
        .collect();
    let node_rows = nodes
        .features(&FeatureRequest::all())
        .filter_map(|f| {
            let at = f.point()?;
            Some(NodeRow {
                id: f.id.index(),
                x: at.x,
                y: at.y,
                heat_kw: f.record.heat_kw,
                nr_con: f.record.nr_con,
                qs_kw: f.record.qs_kw,
                building_id: f.record.building_id.map(|b| b.index()),
            })
        })
        .collect();

    DesignSummary {
        terminals_resolved: response.steiner.resolved,
        terminals_excluded: response
            .steiner
            .excluded
            .iter()
            .map(|e| describe_exclusion(e.terminal, e.reason))
            .collect(),
        network_edges: edges.len(),
        network_length_m: edges.iter().map(|e| e.length_m).sum(),
        groups: response.groups.len(),
        groups_replaced: response.simplify.as_ref().map_or(0, |s| s.replaced.len()),
        total_demand_kw: response.demand.total_demand_kw,
        over_capacity: response.sizing.over_capacity.len(),
        unreached: response.sizing.unreached.len(),
        supply_loss_w_m: response.thermal_loss.supply_w_m,
        return_loss_w_m: response.thermal_loss.return_w_m,
        total_heat_loss_w: response.thermal.total_loss_w,
        total_time_s: response.timing.total_time_s,
        capacity: capacity_rows(&response.capacity),
        edges,
        nodes: node_rows,
    }
}
