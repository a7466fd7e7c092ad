//! Turn a validated configuration into typed stage parameters.

use dh_core::units::{delta_k, j_per_kg_k, kg_per_m3, m, mps, pa, pa_s, w_per_m_k};
use dh_hydraulics::{
    CapacityTable, ColebrookConfig, FluidProperties, HydraulicLimits, PipeCatalog, PipeSize, ThermalLoss,
    TwinPipeModel,
};
use dh_project::{DesignConfig, SimplifyOperatorDef, validate_config};
use dh_topology::{DemandConfig, FilterBounds, Operator};

use crate::error::{AppError, AppResult};

/// Runtime parameters for every stage of a design run.
#[derive(Debug, Clone)]
pub struct DesignParams {
    pub fluid: FluidProperties,
    pub limits: HydraulicLimits,
    pub colebrook: ColebrookConfig,
    pub catalog: PipeCatalog,
    pub thermal: TwinPipeModel,
    /// Evaluated once; the model is uniform over the network.
    pub thermal_loss: ThermalLoss,
    pub filter: FilterBounds,
    pub demand: DemandConfig,
    pub simultaneity: f64,
    pub snap_tolerance: f64,
    pub service_lines: bool,
    pub auto_simplify: Option<Operator>,
}

impl DesignParams {
    pub fn capacity_table(&self) -> AppResult<CapacityTable> {
        Ok(CapacityTable::compute(
            &self.catalog,
            &self.fluid,
            &self.limits,
            &self.colebrook,
        )?)
    }
}

/// Capacity table for the configured catalog, fluid and limits.
pub fn capacity_table(config: &DesignConfig) -> AppResult<CapacityTable> {
    compile_config(config)?.capacity_table()
}

fn operator(def: SimplifyOperatorDef) -> Operator {
    match def {
        SimplifyOperatorDef::Chord => Operator::CollapseToChord,
        SimplifyOperatorDef::Smooth => Operator::CornerSmoothing,
        SimplifyOperatorDef::PassThrough => Operator::PassThrough,
    }
}

/// Validate `config` and build the stage parameters.
///
/// Every check that can fail a run happens here, before any layer is touched.
pub fn compile_config(config: &DesignConfig) -> AppResult<DesignParams> {
    validate_config(config)?;

    let fluid = FluidProperties {
        density: kg_per_m3(config.fluid.density_kg_m3),
        viscosity: pa_s(config.fluid.viscosity_pa_s),
        specific_heat: j_per_kg_k(config.fluid.specific_heat_j_kg_k),
        delta_t: delta_k(config.fluid.delta_t_k),
    };
    fluid.validate()?;

    let h = &config.hydraulics;
    let limits = HydraulicLimits {
        roughness: m(h.roughness_m),
        length_basis: m(h.length_basis_m),
        max_pressure_loss: pa(h.max_pressure_loss_pa),
        velocity_step: mps(h.velocity_step_m_s),
        velocity_ceiling: mps(h.velocity_ceiling_m_s),
    };
    limits.validate()?;
    let colebrook = ColebrookConfig {
        max_iterations: h.colebrook_max_iterations,
        abs_tol: h.colebrook_tolerance,
        ..ColebrookConfig::default()
    };

    let catalog = PipeCatalog::new(
        config
            .catalog
            .iter()
            .map(|s| PipeSize::new(s.dn, s.inner_diameter_m))
            .collect(),
    )?;

    let t = &config.thermal;
    let thermal = TwinPipeModel {
        depth: m(t.depth_m),
        surface_resistance: t.surface_resistance_m2k_w,
        soil_conductivity: w_per_m_k(t.soil_conductivity_w_mk),
        insulation_conductivity: w_per_m_k(t.insulation_conductivity_w_mk),
        spacing: m(t.spacing_m),
        casing_diameter: m(t.casing_diameter_m),
        insulation_diameter: m(t.insulation_diameter_m),
        carrier_diameter: m(t.carrier_diameter_m),
        supply_temp_c: t.supply_temp_c,
        return_temp_c: t.return_temp_c,
        soil_temp_c: t.soil_temp_c,
    };
    let thermal_loss = thermal.losses()?;

    let filter = FilterBounds {
        min_length: config.topology.min_length_m,
        angle_lower_deg: config.topology.angle_lower_deg,
        angle_upper_deg: config.topology.angle_upper_deg,
    };
    filter
        .validate()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok(DesignParams {
        fluid,
        limits,
        colebrook,
        catalog,
        thermal,
        thermal_loss,
        filter,
        demand: DemandConfig {
            max_match_distance: config.demand.max_match_distance_m,
        },
        simultaneity: config.demand.simultaneity,
        snap_tolerance: config.network.snap_tolerance_m,
        service_lines: config.pipeline.service_lines,
        auto_simplify: config.pipeline.auto_simplify.map(operator),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_compiles() {
        let params = compile_config(&DesignConfig::default()).unwrap();
        assert_eq!(params.catalog.len(), 13);
        assert_eq!(params.auto_simplify, None);
        assert!(params.thermal_loss.supply_w_m > params.thermal_loss.return_w_m);
    }

    #[test]
    fn operator_mapping() {
        let mut config = DesignConfig::default();
        config.pipeline.auto_simplify = Some(SimplifyOperatorDef::Smooth);
        let params = compile_config(&config).unwrap();
        assert_eq!(params.auto_simplify, Some(Operator::CornerSmoothing));
    }

    #[test]
    fn singular_thermal_model_fails_before_any_stage() {
        let mut config = DesignConfig::default();
        config.thermal.insulation_diameter_m = config.thermal.carrier_diameter_m;
        config.thermal.casing_diameter_m = 2.0;
        config.thermal.spacing_m = 0.01;
        assert!(matches!(
            compile_config(&config),
            Err(AppError::Hydraulics(_))
        ));
    }
}
