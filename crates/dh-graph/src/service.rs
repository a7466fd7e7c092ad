//! Service lines: connect every building to the closest point of its
//! nearest road.

use dh_core::geometry::{Coord, CoordKey, closest_point_on_lines};
use dh_core::FeatureId;
use dh_layer::{FeatureRequest, Geometry, LayerProvider, NewFeature, ServiceLineRecord, transaction};

use crate::error::GraphResult;
use crate::spatial::SpatialIndex;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceReport {
    /// Service line features created, in building id order.
    pub created: Vec<FeatureId>,
    /// Buildings with no road to connect to, or without point geometry.
    pub unmatched: Vec<FeatureId>,
    /// Buildings already lying on their nearest road.
    pub on_road: Vec<FeatureId>,
}

/// Service line from a building to its nearest road, before insertion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceLine {
    pub building: FeatureId,
    pub road: FeatureId,
    pub from: Coord,
    pub to: Coord,
}

/// Plan service lines without touching any layer.
pub fn plan_service_lines<B, R>(
    buildings: &dyn LayerProvider<B>,
    roads: &dyn LayerProvider<R>,
) -> (Vec<ServiceLine>, ServiceReport) {
    let index = SpatialIndex::from_layer(roads);
    let mut report = ServiceReport::default();
    let mut lines = Vec::new();
    for building in buildings.features(&FeatureRequest::all()) {
        let Some(at) = building.point() else {
            tracing::debug!(building = %building.id, "building is not a point; skipped");
            report.unmatched.push(building.id);
            continue;
        };
        let target = index.nearest(at, 1).first().and_then(|&road_id| {
            let road = roads.feature(road_id)?;
            let (foot, _) = closest_point_on_lines(at, road.geometry.parts())?;
            Some((road_id, foot))
        });
        match target {
            None => report.unmatched.push(building.id),
            Some((_, foot)) if CoordKey::from_coord(foot) == CoordKey::from_coord(at) => {
                report.on_road.push(building.id);
            }
            Some((road, foot)) => lines.push(ServiceLine {
                building: building.id,
                road,
                from: at,
                to: foot,
            }),
        }
    }
    (lines, report)
}

/// Write one service line per building into `out` in a single edit
/// session. Buildings without a reachable road are reported, not fatal.
#[tracing::instrument(skip_all, fields(out = out.name()))]
pub fn connect_buildings<B, R>(
    buildings: &dyn LayerProvider<B>,
    roads: &dyn LayerProvider<R>,
    out: &mut dyn LayerProvider<ServiceLineRecord>,
) -> GraphResult<ServiceReport> {
    let (lines, mut report) = plan_service_lines(buildings, roads);
    if lines.is_empty() {
        tracing::warn!(unmatched = report.unmatched.len(), "no service lines to create");
        return Ok(report);
    }
    let drafts = lines
        .iter()
        .map(|l| {
            NewFeature::new(
                Geometry::line(vec![l.from, l.to]),
                ServiceLineRecord {
                    building_id: l.building,
                    road_id: l.road,
                },
            )
        })
        .collect();
    report.created = transaction(out, |layer| -> GraphResult<Vec<FeatureId>> {
        Ok(layer.add_features(drafts)?)
    })?;
    tracing::info!(
        created = report.created.len(),
        unmatched = report.unmatched.len(),
        on_road = report.on_road.len(),
        "service lines created"
    );
    Ok(report)
}
