//! Maximum heat flow per catalog diameter.

use std::f64::consts::PI;

use dh_core::{ensure_non_negative, ensure_positive};
use dh_core::units::{Length, Pressure, Velocity, m, mps, pa};

use crate::catalog::{PipeCatalog, PipeSize};
use crate::error::{HydraulicsError, HydraulicsResult};
use crate::fluid::FluidProperties;
use crate::friction::{ColebrookConfig, friction_factor, pressure_loss, reynolds};

/// Pipe and sweep parameters shared by every catalog size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HydraulicLimits {
    pub roughness: Length,
    /// Pipe length the pressure-loss limit applies to.
    pub length_basis: Length,
    pub max_pressure_loss: Pressure,
    pub velocity_step: Velocity,
    pub velocity_ceiling: Velocity,
}

impl Default for HydraulicLimits {
    fn default() -> Self {
        Self {
            roughness: m(0.0001),
            length_basis: m(1000.0),
            max_pressure_loss: pa(150_000.0),
            velocity_step: mps(0.01),
            velocity_ceiling: mps(5.0),
        }
    }
}

impl HydraulicLimits {
    pub fn validate(&self) -> HydraulicsResult<()> {
        ensure_non_negative(self.roughness.value, "roughness")?;
        ensure_positive(self.length_basis.value, "pipe length basis")?;
        ensure_positive(self.max_pressure_loss.value, "max pressure loss")?;
        ensure_positive(self.velocity_step.value, "velocity step")?;
        ensure_positive(self.velocity_ceiling.value, "velocity ceiling")?;
        if self.velocity_step.value > self.velocity_ceiling.value {
            return Err(HydraulicsError::config(
                "velocity step exceeds velocity ceiling",
            ));
        }
        Ok(())
    }
}

/// Sweep result for one catalog size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityEntry {
    pub dn: u32,
    pub inner_diameter_m: f64,
    /// Largest serviceable velocity (m/s).
    pub max_velocity_mps: f64,
    /// Heat flow carried at `max_velocity_mps` (kW).
    pub max_heat_kw: f64,
    /// Pressure loss over the length basis at `max_velocity_mps` (Pa).
    pub pressure_loss_pa: f64,
    /// The sweep reached the ceiling before the pressure limit.
    pub at_ceiling: bool,
    /// Sweep points where Colebrook-White fell back to the initial guess.
    pub friction_unconverged: usize,
}

/// Heat flow in kW carried by a full pipe: (pi (D/2)^2) rho v Cp dT.
pub fn heat_flow_kw(inner_diameter_m: f64, velocity_mps: f64, fluid: &FluidProperties) -> f64 {
    let area = PI * (inner_diameter_m / 2.0).powi(2);
    area * fluid.density.value
        * velocity_mps
        * fluid.specific_heat.value
        * fluid.delta_t.value
        / 1000.0
}

/// Sweep v = i * step from zero and stop at the first velocity whose
/// pressure loss reaches the limit; the ceiling is used otherwise.
pub fn pipe_capacity(
    size: &PipeSize,
    fluid: &FluidProperties,
    limits: &HydraulicLimits,
    colebrook: &ColebrookConfig,
) -> CapacityEntry {
    let d = size.inner_diameter.value;
    let rho = fluid.density.value;
    let mu = fluid.viscosity.value;
    let length = limits.length_basis.value;
    let limit = limits.max_pressure_loss.value;
    let step = limits.velocity_step.value;
    let ceiling = limits.velocity_ceiling.value;
    let relative_roughness = limits.roughness.value / d;

    let mut unconverged = 0;
    let mut loss_at = |v: f64| {
        let f = friction_factor(reynolds(rho, v, d, mu), relative_roughness, colebrook);
        if !f.converged {
            unconverged += 1;
        }
        pressure_loss(f.value, length, rho, v, d)
    };

    let steps = (ceiling / step + 1e-9).floor() as u64;
    let mut hit = None;
    for i in 0..=steps {
        let v = (i as f64 * step).min(ceiling);
        let dp = loss_at(v);
        if dp >= limit {
            hit = Some((v, dp));
            break;
        }
    }
    let (max_velocity, dp, at_ceiling) = match hit {
        Some((v, dp)) => (v, dp, false),
        None => (ceiling, loss_at(ceiling), true),
    };

    if unconverged > 0 {
        tracing::warn!(
            dn = size.dn,
            points = unconverged,
            "friction factor unresolved, used fallback"
        );
    }

    CapacityEntry {
        dn: size.dn,
        inner_diameter_m: d,
        max_velocity_mps: max_velocity,
        max_heat_kw: heat_flow_kw(d, max_velocity, fluid),
        pressure_loss_pa: dp,
        at_ceiling,
        friction_unconverged: unconverged,
    }
}

/// Nominal size to maximum heat flow, ascending by diameter.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityTable {
    entries: Vec<CapacityEntry>,
}

impl CapacityTable {
    /// Validate every input and sweep each catalog size.
    #[tracing::instrument(skip_all, fields(sizes = catalog.len()))]
    pub fn compute(
        catalog: &PipeCatalog,
        fluid: &FluidProperties,
        limits: &HydraulicLimits,
        colebrook: &ColebrookConfig,
    ) -> HydraulicsResult<Self> {
        if catalog.is_empty() {
            return Err(HydraulicsError::EmptyCatalog);
        }
        fluid.validate()?;
        limits.validate()?;
        let entries: Vec<CapacityEntry> = catalog
            .sizes()
            .iter()
            .map(|size| pipe_capacity(size, fluid, limits, colebrook))
            .collect();
        tracing::debug!(
            largest_kw = entries.last().map(|e| e.max_heat_kw),
            "capacity table computed"
        );
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CapacityEntry] {
        &self.entries
    }

    /// Smallest size whose capacity covers `qs_kw`.
    pub fn smallest_sufficient(&self, qs_kw: f64) -> Option<&CapacityEntry> {
        self.entries.iter().find(|e| e.max_heat_kw >= qs_kw)
    }

    pub fn largest(&self) -> Option<&CapacityEntry> {
        self.entries.last()
    }
}
