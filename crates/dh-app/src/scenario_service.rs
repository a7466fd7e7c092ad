//! Load files and run a design over in-memory layers.

use std::path::Path;

use dh_layer::{
    BuildingRecord, EdgeRecord, MemoryLayer, NodeRecord, RoadRecord, ServiceLineRecord,
};
use dh_project::{DesignConfig, Scenario};

use crate::design_service::{DesignLayers, DesignResponse, run_design_with_progress};
use crate::error::{AppError, AppResult};
use crate::progress::DesignProgressEvent;

/// Load and validate a design configuration (YAML, or JSON by extension).
pub fn load_config(path: &Path) -> AppResult<DesignConfig> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = if is_json {
        dh_project::load_json(path)?
    } else {
        dh_project::load_yaml(path)?
    };
    Ok(config)
}

pub fn load_scenario(path: &Path) -> AppResult<Scenario> {
    if !path.exists() {
        return Err(AppError::FileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "scenario not found"),
        });
    }
    Ok(dh_project::load_scenario(path)?)
}

/// In-memory layers holding one scenario and the design outputs.
#[derive(Debug, Clone)]
pub struct ScenarioLayers {
    pub roads: MemoryLayer<RoadRecord>,
    pub buildings: MemoryLayer<BuildingRecord>,
    pub service_lines: MemoryLayer<ServiceLineRecord>,
    pub network: MemoryLayer<EdgeRecord>,
    pub nodes: MemoryLayer<NodeRecord>,
}

impl ScenarioLayers {
    pub fn from_scenario(scenario: &Scenario) -> AppResult<Self> {
        Ok(Self {
            roads: MemoryLayer::from_features("roads", scenario.road_features()),
            buildings: MemoryLayer::from_features("buildings", scenario.building_features()?),
            service_lines: MemoryLayer::new("service_lines"),
            network: MemoryLayer::new("network"),
            nodes: MemoryLayer::new("nodes"),
        })
    }

    pub fn layers(&mut self) -> DesignLayers<'_> {
        DesignLayers {
            roads: &mut self.roads,
            buildings: &self.buildings,
            service_lines: &mut self.service_lines,
            network: &mut self.network,
            nodes: &mut self.nodes,
        }
    }
}

/// Build layers from `scenario` and run the pipeline over them.
pub fn design_scenario(
    config: &DesignConfig,
    scenario: &Scenario,
    progress_cb: Option<&mut dyn FnMut(DesignProgressEvent)>,
) -> AppResult<(ScenarioLayers, DesignResponse)> {
    let mut layers = ScenarioLayers::from_scenario(scenario)?;
    let response = run_design_with_progress(config, scenario.source(), layers.layers(), progress_cb)?;
    Ok((layers, response))
}
