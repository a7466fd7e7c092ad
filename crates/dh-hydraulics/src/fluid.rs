//! Heat-carrier properties, constant over the whole network.

use dh_core::ensure_positive;
use dh_core::units::{
    Density, DynVisc, SpecHeat, TempInterval, delta_k, j_per_kg_k, kg_per_m3, pa_s,
};

use crate::error::HydraulicsResult;

/// Fluid properties used by the capacity sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidProperties {
    pub density: Density,
    pub viscosity: DynVisc,
    pub specific_heat: SpecHeat,
    /// Supply minus return temperature.
    pub delta_t: TempInterval,
}

impl Default for FluidProperties {
    /// Water at district-heating temperatures with a 30 K spread.
    fn default() -> Self {
        Self {
            density: kg_per_m3(1000.0),
            viscosity: pa_s(0.0009),
            specific_heat: j_per_kg_k(4186.0),
            delta_t: delta_k(30.0),
        }
    }
}

impl FluidProperties {
    pub fn validate(&self) -> HydraulicsResult<()> {
        ensure_positive(self.density.value, "density")?;
        ensure_positive(self.viscosity.value, "viscosity")?;
        ensure_positive(self.specific_heat.value, "specific heat")?;
        ensure_positive(self.delta_t.value, "temperature difference")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_viscosity_is_rejected() {
        let fluid = FluidProperties {
            viscosity: pa_s(0.0),
            ..FluidProperties::default()
        };
        assert!(fluid.validate().is_err());
        assert!(FluidProperties::default().validate().is_ok());
    }
}
