//! Configuration validation.

use std::collections::HashSet;

use crate::schema::{DesignConfig, LATEST_VERSION};
use crate::scenario::Scenario;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Empty pipe catalog")]
    EmptyCatalog,

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: f64, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be non-negative"))
    }
}

pub fn validate_config(config: &DesignConfig) -> Result<(), ValidationError> {
    if config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    let fluid = &config.fluid;
    positive("fluid.density_kg_m3", fluid.density_kg_m3)?;
    positive("fluid.viscosity_pa_s", fluid.viscosity_pa_s)?;
    positive("fluid.specific_heat_j_kg_k", fluid.specific_heat_j_kg_k)?;
    positive("fluid.delta_t_k", fluid.delta_t_k)?;

    let h = &config.hydraulics;
    non_negative("hydraulics.roughness_m", h.roughness_m)?;
    positive("hydraulics.length_basis_m", h.length_basis_m)?;
    positive("hydraulics.max_pressure_loss_pa", h.max_pressure_loss_pa)?;
    positive("hydraulics.velocity_step_m_s", h.velocity_step_m_s)?;
    positive("hydraulics.velocity_ceiling_m_s", h.velocity_ceiling_m_s)?;
    if h.velocity_step_m_s > h.velocity_ceiling_m_s {
        return Err(invalid(
            "hydraulics.velocity_step_m_s",
            h.velocity_step_m_s,
            "exceeds velocity ceiling",
        ));
    }
    if h.colebrook_max_iterations == 0 {
        return Err(invalid("hydraulics.colebrook_max_iterations", 0.0, "must be at least 1"));
    }
    positive("hydraulics.colebrook_tolerance", h.colebrook_tolerance)?;

    validate_catalog(config)?;

    let t = &config.thermal;
    positive("thermal.depth_m", t.depth_m)?;
    non_negative("thermal.surface_resistance_m2k_w", t.surface_resistance_m2k_w)?;
    positive("thermal.soil_conductivity_w_mk", t.soil_conductivity_w_mk)?;
    positive("thermal.insulation_conductivity_w_mk", t.insulation_conductivity_w_mk)?;
    positive("thermal.spacing_m", t.spacing_m)?;
    positive("thermal.casing_diameter_m", t.casing_diameter_m)?;
    positive("thermal.insulation_diameter_m", t.insulation_diameter_m)?;
    positive("thermal.carrier_diameter_m", t.carrier_diameter_m)?;
    if t.insulation_diameter_m < t.carrier_diameter_m {
        return Err(invalid(
            "thermal.insulation_diameter_m",
            t.insulation_diameter_m,
            "smaller than the carrier pipe",
        ));
    }
    for (field, value) in [
        ("thermal.supply_temp_c", t.supply_temp_c),
        ("thermal.return_temp_c", t.return_temp_c),
        ("thermal.soil_temp_c", t.soil_temp_c),
    ] {
        if !value.is_finite() {
            return Err(invalid(field, value, "must be finite"));
        }
    }

    let topo = &config.topology;
    non_negative("topology.min_length_m", topo.min_length_m)?;
    non_negative("topology.angle_lower_deg", topo.angle_lower_deg)?;
    if !(topo.angle_upper_deg.is_finite() && topo.angle_upper_deg <= 180.0) {
        return Err(invalid(
            "topology.angle_upper_deg",
            topo.angle_upper_deg,
            "must be at most 180",
        ));
    }
    if topo.angle_lower_deg > topo.angle_upper_deg {
        return Err(invalid(
            "topology.angle_lower_deg",
            topo.angle_lower_deg,
            "exceeds angle_upper_deg",
        ));
    }

    non_negative("network.snap_tolerance_m", config.network.snap_tolerance_m)?;

    if let Some(d) = config.demand.max_match_distance_m {
        non_negative("demand.max_match_distance_m", d)?;
    }
    let ds = config.demand.simultaneity;
    if !(0.0..=1.0).contains(&ds) {
        return Err(invalid("demand.simultaneity", ds, "outside [0, 1]"));
    }

    Ok(())
}

fn validate_catalog(config: &DesignConfig) -> Result<(), ValidationError> {
    if config.catalog.is_empty() {
        return Err(ValidationError::EmptyCatalog);
    }
    let mut seen = HashSet::new();
    for size in &config.catalog {
        if !seen.insert(size.dn) {
            return Err(ValidationError::DuplicateId {
                id: format!("DN{}", size.dn),
                context: "catalog".to_string(),
            });
        }
        positive(&format!("catalog.DN{}.inner_diameter_m", size.dn), size.inner_diameter_m)?;
    }
    Ok(())
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    let finite = |p: [f64; 2]| p[0].is_finite() && p[1].is_finite();
    if !finite(scenario.source) {
        return Err(ValidationError::InvalidValue {
            field: "source".to_string(),
            value: format!("{:?}", scenario.source),
            reason: "must be finite".to_string(),
        });
    }
    for (i, road) in scenario.roads.iter().enumerate() {
        if road.parts.iter().flatten().any(|&p| !finite(p)) {
            return Err(ValidationError::InvalidValue {
                field: format!("roads[{i}]"),
                value: road.name.clone().unwrap_or_default(),
                reason: "non-finite vertex".to_string(),
            });
        }
    }
    for (i, building) in scenario.buildings.iter().enumerate() {
        if !finite(building.at) {
            return Err(ValidationError::InvalidValue {
                field: format!("buildings[{i}].at"),
                value: format!("{:?}", building.at),
                reason: "must be finite".to_string(),
            });
        }
    }
    Ok(())
}
