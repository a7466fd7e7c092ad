//! Design configuration schema.
//!
//! Every numeric field carries its SI unit in the name. Missing sections
//! and fields take the documented defaults, so an empty document is a
//! valid configuration.

use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DesignConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fluid: FluidDef,
    #[serde(default)]
    pub hydraulics: HydraulicsDef,
    #[serde(default = "default_catalog")]
    pub catalog: Vec<PipeSizeDef>,
    #[serde(default)]
    pub thermal: ThermalDef,
    #[serde(default)]
    pub topology: TopologyDef,
    #[serde(default)]
    pub network: NetworkDef,
    #[serde(default)]
    pub demand: DemandDef,
    #[serde(default)]
    pub pipeline: PipelineDef,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            version: LATEST_VERSION,
            name: String::new(),
            fluid: FluidDef::default(),
            hydraulics: HydraulicsDef::default(),
            catalog: default_catalog(),
            thermal: ThermalDef::default(),
            topology: TopologyDef::default(),
            network: NetworkDef::default(),
            demand: DemandDef::default(),
            pipeline: PipelineDef::default(),
        }
    }
}

fn default_version() -> u32 {
    LATEST_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FluidDef {
    #[serde(default = "default_density")]
    pub density_kg_m3: f64,
    #[serde(default = "default_viscosity")]
    pub viscosity_pa_s: f64,
    #[serde(default = "default_specific_heat")]
    pub specific_heat_j_kg_k: f64,
    #[serde(default = "default_delta_t")]
    pub delta_t_k: f64,
}

impl Default for FluidDef {
    fn default() -> Self {
        Self {
            density_kg_m3: default_density(),
            viscosity_pa_s: default_viscosity(),
            specific_heat_j_kg_k: default_specific_heat(),
            delta_t_k: default_delta_t(),
        }
    }
}

fn default_density() -> f64 {
    1000.0
}

fn default_viscosity() -> f64 {
    0.0009
}

fn default_specific_heat() -> f64 {
    4186.0
}

fn default_delta_t() -> f64 {
    30.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HydraulicsDef {
    #[serde(default = "default_roughness")]
    pub roughness_m: f64,
    #[serde(default = "default_length_basis")]
    pub length_basis_m: f64,
    #[serde(default = "default_max_pressure_loss")]
    pub max_pressure_loss_pa: f64,
    #[serde(default = "default_velocity_step")]
    pub velocity_step_m_s: f64,
    #[serde(default = "default_velocity_ceiling")]
    pub velocity_ceiling_m_s: f64,
    #[serde(default = "default_colebrook_max_iterations")]
    pub colebrook_max_iterations: usize,
    #[serde(default = "default_colebrook_tolerance")]
    pub colebrook_tolerance: f64,
}

impl Default for HydraulicsDef {
    fn default() -> Self {
        Self {
            roughness_m: default_roughness(),
            length_basis_m: default_length_basis(),
            max_pressure_loss_pa: default_max_pressure_loss(),
            velocity_step_m_s: default_velocity_step(),
            velocity_ceiling_m_s: default_velocity_ceiling(),
            colebrook_max_iterations: default_colebrook_max_iterations(),
            colebrook_tolerance: default_colebrook_tolerance(),
        }
    }
}

fn default_roughness() -> f64 {
    0.0001
}

fn default_length_basis() -> f64 {
    1000.0
}

fn default_max_pressure_loss() -> f64 {
    150_000.0
}

fn default_velocity_step() -> f64 {
    0.01
}

fn default_velocity_ceiling() -> f64 {
    5.0
}

fn default_colebrook_max_iterations() -> usize {
    50
}

fn default_colebrook_tolerance() -> f64 {
    1e-10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipeSizeDef {
    pub dn: u32,
    pub inner_diameter_m: f64,
}

/// Steel DN20 to DN300.
pub fn default_catalog() -> Vec<PipeSizeDef> {
    [
        (20, 0.0217),
        (25, 0.0285),
        (32, 0.0372),
        (40, 0.0431),
        (50, 0.0545),
        (65, 0.0703),
        (80, 0.0825),
        (100, 0.1071),
        (125, 0.1325),
        (150, 0.1603),
        (200, 0.2101),
        (250, 0.263),
        (300, 0.3127),
    ]
    .into_iter()
    .map(|(dn, inner_diameter_m)| PipeSizeDef {
        dn,
        inner_diameter_m,
    })
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalDef {
    #[serde(default = "default_depth")]
    pub depth_m: f64,
    #[serde(default = "default_surface_resistance")]
    pub surface_resistance_m2k_w: f64,
    #[serde(default = "default_soil_conductivity")]
    pub soil_conductivity_w_mk: f64,
    #[serde(default = "default_insulation_conductivity")]
    pub insulation_conductivity_w_mk: f64,
    #[serde(default = "default_spacing")]
    pub spacing_m: f64,
    #[serde(default = "default_casing_diameter")]
    pub casing_diameter_m: f64,
    #[serde(default = "default_insulation_diameter")]
    pub insulation_diameter_m: f64,
    #[serde(default = "default_carrier_diameter")]
    pub carrier_diameter_m: f64,
    #[serde(default = "default_supply_temp")]
    pub supply_temp_c: f64,
    #[serde(default = "default_return_temp")]
    pub return_temp_c: f64,
    #[serde(default = "default_soil_temp")]
    pub soil_temp_c: f64,
}

impl Default for ThermalDef {
    fn default() -> Self {
        Self {
            depth_m: default_depth(),
            surface_resistance_m2k_w: default_surface_resistance(),
            soil_conductivity_w_mk: default_soil_conductivity(),
            insulation_conductivity_w_mk: default_insulation_conductivity(),
            spacing_m: default_spacing(),
            casing_diameter_m: default_casing_diameter(),
            insulation_diameter_m: default_insulation_diameter(),
            carrier_diameter_m: default_carrier_diameter(),
            supply_temp_c: default_supply_temp(),
            return_temp_c: default_return_temp(),
            soil_temp_c: default_soil_temp(),
        }
    }
}

fn default_depth() -> f64 {
    0.8
}

fn default_surface_resistance() -> f64 {
    0.0685
}

fn default_soil_conductivity() -> f64 {
    1.5
}

fn default_insulation_conductivity() -> f64 {
    0.027
}

fn default_spacing() -> f64 {
    0.15
}

fn default_casing_diameter() -> f64 {
    0.225
}

fn default_insulation_diameter() -> f64 {
    0.11
}

fn default_carrier_diameter() -> f64 {
    0.0603
}

fn default_supply_temp() -> f64 {
    80.0
}

fn default_return_temp() -> f64 {
    50.0
}

fn default_soil_temp() -> f64 {
    10.0
}

/// Junction filter used to find simplification groups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopologyDef {
    #[serde(default = "default_min_length")]
    pub min_length_m: f64,
    #[serde(default = "default_angle_lower")]
    pub angle_lower_deg: f64,
    #[serde(default = "default_angle_upper")]
    pub angle_upper_deg: f64,
}

impl Default for TopologyDef {
    fn default() -> Self {
        Self {
            min_length_m: default_min_length(),
            angle_lower_deg: default_angle_lower(),
            angle_upper_deg: default_angle_upper(),
        }
    }
}

fn default_min_length() -> f64 {
    0.5
}

fn default_angle_lower() -> f64 {
    20.0
}

fn default_angle_upper() -> f64 {
    90.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkDef {
    /// Endpoint snapping and terminal attachment tolerance.
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance_m: f64,
}

impl Default for NetworkDef {
    fn default() -> Self {
        Self {
            snap_tolerance_m: default_snap_tolerance(),
        }
    }
}

fn default_snap_tolerance() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemandDef {
    /// Nodes farther than this from every building inherit nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_match_distance_m: Option<f64>,
    #[serde(default = "default_simultaneity")]
    pub simultaneity: f64,
}

impl Default for DemandDef {
    fn default() -> Self {
        Self {
            max_match_distance_m: None,
            simultaneity: default_simultaneity(),
        }
    }
}

fn default_simultaneity() -> f64 {
    0.62
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimplifyOperatorDef {
    Chord,
    Smooth,
    PassThrough,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineDef {
    /// Add building service lines to the road graph before synthesis.
    #[serde(default)]
    pub service_lines: bool,
    /// Operator applied to every junction group found after synthesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_simplify: Option<SimplifyOperatorDef>,
}
