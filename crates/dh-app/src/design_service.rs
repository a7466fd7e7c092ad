//! Design pipeline: road layer in, sized and annotated network out.

use std::collections::BTreeSet;
use std::time::Instant;

use dh_core::geometry::Coord;
use dh_core::{CoordKey, FeatureId};
use dh_graph::{
    CleanReport, RoadGraph, ServiceReport, SteinerReport, connect_buildings, synthesize,
    write_network,
};
use dh_hydraulics::{
    CapacityTable, SizingReport, ThermalLoss, ThermalReport, apply_thermal_losses, assign_sizes,
};
use dh_layer::{
    BuildingRecord, EdgeRecord, FeatureRequest, LayerProvider, NodeRecord, RoadRecord,
    ServiceLineRecord,
};
use dh_project::DesignConfig;
use dh_topology::{
    DemandReport, EndpointIndex, Group, SimplifyReport, aggregate_demand, derive_nodes,
    flag_edges, group_edges, simplify_groups,
};

use crate::compile::{DesignParams, compile_config};
use crate::error::AppResult;
use crate::progress::{DesignProgressEvent, DesignStage};

/// Layers a design run reads and writes, injected by the host.
pub struct DesignLayers<'a> {
    /// Cleaned in place.
    pub roads: &'a mut dyn LayerProvider<RoadRecord>,
    pub buildings: &'a dyn LayerProvider<BuildingRecord>,
    /// Written only when service lines are enabled.
    pub service_lines: &'a mut dyn LayerProvider<ServiceLineRecord>,
    /// Replaced by the synthesized network.
    pub network: &'a mut dyn LayerProvider<EdgeRecord>,
    /// Rewritten from the network's endpoints.
    pub nodes: &'a mut dyn LayerProvider<NodeRecord>,
}

/// Wall time per stage.
#[derive(Debug, Clone, Default)]
pub struct DesignTiming {
    pub stages: Vec<(DesignStage, f64)>,
    pub total_time_s: f64,
}

/// Reports from every stage of a run.
#[derive(Debug, Clone)]
pub struct DesignResponse {
    pub clean: CleanReport,
    pub service: Option<ServiceReport>,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub steiner: SteinerReport,
    pub groups: Vec<Group>,
    pub simplify: Option<SimplifyReport>,
    pub nodes: Vec<FeatureId>,
    pub demand: DemandReport,
    pub capacity: CapacityTable,
    pub sizing: SizingReport,
    pub thermal_loss: ThermalLoss,
    pub thermal: ThermalReport,
    pub timing: DesignTiming,
}

struct Progress<'cb> {
    cb: Option<&'cb mut dyn FnMut(DesignProgressEvent)>,
    started: Instant,
    stage_started: Instant,
    timing: DesignTiming,
}

impl<'cb> Progress<'cb> {
    fn new(cb: Option<&'cb mut dyn FnMut(DesignProgressEvent)>) -> Self {
        let now = Instant::now();
        Self {
            cb,
            started: now,
            stage_started: now,
            timing: DesignTiming::default(),
        }
    }

    fn begin(&mut self, stage: DesignStage) {
        self.stage_started = Instant::now();
        self.emit(stage, None);
    }

    fn finish(&mut self, stage: DesignStage, message: String) {
        self.timing
            .stages
            .push((stage, self.stage_started.elapsed().as_secs_f64()));
        tracing::info!(stage = stage.label(), "{message}");
        self.emit(stage, Some(message));
    }

    fn emit(&mut self, stage: DesignStage, message: Option<String>) {
        if let Some(cb) = self.cb.as_deref_mut() {
            cb(DesignProgressEvent {
                stage,
                elapsed_wall_s: self.started.elapsed().as_secs_f64(),
                message,
            });
        }
    }

    fn into_timing(mut self) -> DesignTiming {
        self.timing.total_time_s = self.started.elapsed().as_secs_f64();
        self.emit(DesignStage::Completed, None);
        self.timing
    }
}

fn building_points(buildings: &dyn LayerProvider<BuildingRecord>) -> Vec<(FeatureId, Coord)> {
    buildings
        .features(&FeatureRequest::all())
        .filter_map(|b| b.point().map(|at| (b.id, at)))
        .collect()
}

/// Junctions of the road graph and terminal locations; grouping never
/// merges edges across them.
fn protected_points(
    graph: &RoadGraph,
    source: Coord,
    terminals: &[(FeatureId, Coord)],
) -> BTreeSet<CoordKey> {
    let mut protected: BTreeSet<CoordKey> = graph
        .nodes()
        .filter(|&n| graph.degree(n) >= 3)
        .map(|n| CoordKey::from_coord(graph.coord(n)))
        .collect();
    protected.insert(CoordKey::from_coord(source));
    protected.extend(terminals.iter().map(|(_, at)| CoordKey::from_coord(*at)));
    protected
}

/// Run the full design pipeline.
pub fn run_design(
    config: &DesignConfig,
    source: Coord,
    layers: DesignLayers<'_>,
) -> AppResult<DesignResponse> {
    run_design_with_progress(config, source, layers, None)
}

/// Run the full design pipeline and stream stage events.
#[tracing::instrument(skip_all, fields(name = %config.name))]
pub fn run_design_with_progress(
    config: &DesignConfig,
    source: Coord,
    layers: DesignLayers<'_>,
    progress_cb: Option<&mut dyn FnMut(DesignProgressEvent)>,
) -> AppResult<DesignResponse> {
    let mut progress = Progress::new(progress_cb);

    progress.begin(DesignStage::ValidatingConfig);
    let params: DesignParams = compile_config(config)?;
    progress.finish(
        DesignStage::ValidatingConfig,
        format!("{} catalog sizes", params.catalog.len()),
    );

    // The cleaner's rebuilt graph of the retained roads is the graph every
    // later stage routes on.
    progress.begin(DesignStage::Cleaning);
    let (graph, clean) = dh_graph::clean(&mut *layers.roads, params.snap_tolerance)?;
    let graph_nodes = graph.node_count();
    let graph_edges = graph.edge_count();
    progress.finish(
        DesignStage::Cleaning,
        format!(
            "{} endpoints snapped, {} components, {} features deleted, graph {graph_nodes} nodes / {graph_edges} edges",
            clean.snapped_endpoints,
            clean.components,
            clean.deleted_features.len()
        ),
    );

    let service = if params.service_lines {
        progress.begin(DesignStage::ServiceLines);
        let report =
            connect_buildings(layers.buildings, &*layers.roads, &mut *layers.service_lines)?;
        progress.finish(
            DesignStage::ServiceLines,
            format!(
                "{} service lines, {} buildings unmatched",
                report.created.len(),
                report.unmatched.len()
            ),
        );
        Some(report)
    } else {
        None
    };

    progress.begin(DesignStage::Synthesizing);
    let terminals = building_points(layers.buildings);
    let tree = synthesize(&graph, source, &terminals, params.snap_tolerance);
    let steiner = write_network(&tree, &mut *layers.network)?;
    progress.finish(
        DesignStage::Synthesizing,
        format!(
            "{} terminals resolved, {} excluded, {:.1} m of pipe",
            steiner.resolved,
            steiner.excluded.len(),
            steiner.total_length
        ),
    );

    progress.begin(DesignStage::Grouping);
    let index = EndpointIndex::from_layer(&*layers.network);
    let flags = flag_edges(&index, &params.filter);
    let groups = group_edges(&index, &flags, &protected_points(&graph, source, &terminals));
    progress.finish(
        DesignStage::Grouping,
        format!("{} edges flagged, {} groups", flags.len(), groups.len()),
    );

    let simplify = match params.auto_simplify {
        Some(op) if !groups.is_empty() => {
            progress.begin(DesignStage::Simplifying);
            let report = simplify_groups(&mut *layers.network, &groups, op)?;
            progress.finish(
                DesignStage::Simplifying,
                format!("{} groups replaced ({})", report.replaced.len(), op.as_str()),
            );
            Some(report)
        }
        _ => None,
    };

    progress.begin(DesignStage::DerivingNodes);
    let nodes = derive_nodes(&*layers.network, &mut *layers.nodes)?;
    progress.finish(DesignStage::DerivingNodes, format!("{} nodes", nodes.len()));

    progress.begin(DesignStage::AggregatingDemand);
    let demand = aggregate_demand(
        &*layers.network,
        &mut *layers.nodes,
        layers.buildings,
        source,
        &params.demand,
    )?;
    progress.finish(
        DesignStage::AggregatingDemand,
        format!(
            "{:.1} kW from {} buildings",
            demand.total_demand_kw,
            demand.matched.len()
        ),
    );

    progress.begin(DesignStage::Sizing);
    let capacity = params.capacity_table()?;
    let sizing = assign_sizes(
        &mut *layers.network,
        &mut *layers.nodes,
        &demand.edge_nodes,
        &capacity,
        params.simultaneity,
    )?;
    progress.finish(
        DesignStage::Sizing,
        format!(
            "{} edges sized, {} over capacity",
            sizing.assigned.len(),
            sizing.over_capacity.len()
        ),
    );

    progress.begin(DesignStage::ThermalLosses);
    let thermal = apply_thermal_losses(&mut *layers.network, &params.thermal_loss)?;
    progress.finish(
        DesignStage::ThermalLosses,
        format!("{:.0} W total heat loss", thermal.total_loss_w),
    );

    Ok(DesignResponse {
        clean,
        service,
        graph_nodes,
        graph_edges,
        steiner,
        groups,
        simplify,
        nodes,
        demand,
        capacity,
        sizing,
        thermal_loss: params.thermal_loss,
        thermal,
        timing: progress.into_timing(),
    })
}
