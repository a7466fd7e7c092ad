//! Input features for a design run: roads, buildings and the heat source.

use std::collections::BTreeMap;

use dh_core::geometry::{Coord, coord};
use dh_layer::{
    AttrValue, Attributes, BuildingRecord, Geometry, LayerResult, NewFeature, Record, RoadRecord,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Heat source location `[x, y]`.
    pub source: [f64; 2],
    #[serde(default)]
    pub roads: Vec<RoadDef>,
    #[serde(default)]
    pub buildings: Vec<BuildingDef>,
}

/// A road centre line; one entry per part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoadDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub parts: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingDef {
    pub at: [f64; 2],
    /// Host attributes; `heat_kw` is the only one the engine reads.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
}

fn to_coord(p: [f64; 2]) -> Coord {
    coord(p[0], p[1])
}

impl Scenario {
    pub fn source(&self) -> Coord {
        to_coord(self.source)
    }

    pub fn road_features(&self) -> Vec<NewFeature<RoadRecord>> {
        self.roads
            .iter()
            .map(|road| {
                let parts = road
                    .parts
                    .iter()
                    .map(|part| part.iter().copied().map(to_coord).collect())
                    .collect();
                NewFeature::new(
                    Geometry::Lines(parts),
                    RoadRecord {
                        name: road.name.clone(),
                    },
                )
            })
            .collect()
    }

    /// Resolve building attributes into typed records.
    pub fn building_features(&self) -> LayerResult<Vec<NewFeature<BuildingRecord>>> {
        self.buildings
            .iter()
            .map(|b| {
                let attrs: Attributes = b.attributes.clone().into_iter().collect();
                let record = BuildingRecord::from_attributes(&attrs)?;
                Ok(NewFeature::new(Geometry::Point(to_coord(b.at)), record))
            })
            .collect()
    }
}
