//! Steady-state heat loss of buried twin pipes.
//!
//! One resistance network for the whole network: temperatures and material
//! constants do not vary per segment.

use std::f64::consts::PI;

use dh_core::{ensure_finite, ensure_non_negative, ensure_positive};
use dh_core::units::{Length, ThermalCond, m, w_per_m_k};
use dh_layer::{EdgeRecord, FeatureRequest, LayerProvider, transaction};

use crate::error::{HydraulicsError, HydraulicsResult};

/// Geometry, materials and operating temperatures of the twin-pipe model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwinPipeModel {
    /// Burial depth to pipe centre (Z).
    pub depth: Length,
    /// Surface transfer resistance R0 in m^2 K/W.
    pub surface_resistance: f64,
    pub soil_conductivity: ThermalCond,
    pub insulation_conductivity: ThermalCond,
    /// Centre-to-centre spacing of the two carrier pipes (C).
    pub spacing: Length,
    pub casing_diameter: Length,
    pub insulation_diameter: Length,
    /// Carrier pipe outer diameter (d0).
    pub carrier_diameter: Length,
    pub supply_temp_c: f64,
    pub return_temp_c: f64,
    pub soil_temp_c: f64,
}

impl Default for TwinPipeModel {
    fn default() -> Self {
        Self {
            depth: m(0.8),
            surface_resistance: 0.0685,
            soil_conductivity: w_per_m_k(1.5),
            insulation_conductivity: w_per_m_k(0.027),
            spacing: m(0.15),
            casing_diameter: m(0.225),
            insulation_diameter: m(0.11),
            carrier_diameter: m(0.0603),
            supply_temp_c: 80.0,
            return_temp_c: 50.0,
            soil_temp_c: 10.0,
        }
    }
}

/// Per-metre heat losses and the intermediate resistances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalLoss {
    /// Ff in W/m.
    pub supply_w_m: f64,
    /// Fr in W/m.
    pub return_w_m: f64,
    pub u1: f64,
    pub u2: f64,
    pub soil_resistance: f64,
    pub insulation_resistance: f64,
    pub interference_resistance: f64,
}

impl ThermalLoss {
    /// Combined supply and return loss in W/m.
    pub fn total_w_m(&self) -> f64 {
        self.supply_w_m + self.return_w_m
    }
}

impl TwinPipeModel {
    /// Zc = Z + R0 * lambda_s.
    pub fn corrected_depth(&self) -> f64 {
        self.depth.value + self.surface_resistance * self.soil_conductivity.value
    }

    pub fn validate(&self) -> HydraulicsResult<()> {
        ensure_positive(self.depth.value, "burial depth")?;
        ensure_positive(self.soil_conductivity.value, "soil conductivity")?;
        ensure_positive(self.insulation_conductivity.value, "insulation conductivity")?;
        ensure_positive(self.spacing.value, "pipe spacing")?;
        ensure_positive(self.casing_diameter.value, "casing diameter")?;
        ensure_positive(self.insulation_diameter.value, "insulation diameter")?;
        ensure_positive(self.carrier_diameter.value, "carrier diameter")?;
        ensure_non_negative(self.surface_resistance, "surface resistance")?;
        ensure_finite(self.supply_temp_c, "supply temperature")?;
        ensure_finite(self.return_temp_c, "return temperature")?;
        ensure_finite(self.soil_temp_c, "soil temperature")?;
        Ok(())
    }

    /// Evaluate the resistance network.
    pub fn losses(&self) -> HydraulicsResult<ThermalLoss> {
        self.validate()?;
        let lambda_s = self.soil_conductivity.value;
        let lambda_i = self.insulation_conductivity.value;
        let zc = self.corrected_depth();

        let rs = (4.0 * zc / self.casing_diameter.value).ln() / (2.0 * PI * lambda_s);
        let ri = (self.insulation_diameter.value / self.carrier_diameter.value).ln()
            / (2.0 * PI * lambda_i);
        let rh = ((2.0 * zc / self.spacing.value).powi(2) + 1.0).ln() / (4.0 * PI * lambda_s);

        let r = rs + ri;
        let denom = r * r - rh * rh;
        if !denom.is_finite() || denom <= 0.0 {
            return Err(HydraulicsError::SingularThermalModel {
                what: "(Rs + Ri)^2 - Rh^2 must be positive",
            });
        }
        let u1 = r / denom;
        let u2 = rh / denom;

        let dt_supply = self.supply_temp_c - self.soil_temp_c;
        let dt_return = self.return_temp_c - self.soil_temp_c;
        Ok(ThermalLoss {
            supply_w_m: u1 * dt_supply - u2 * dt_return,
            return_w_m: u1 * dt_return - u2 * dt_supply,
            u1,
            u2,
            soil_resistance: rs,
            insulation_resistance: ri,
            interference_resistance: rh,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThermalReport {
    pub edges: usize,
    pub total_loss_w: f64,
}

/// Write Ff, Fr and the segment loss `(Ff + Fr) * length` on every edge.
#[tracing::instrument(skip_all)]
pub fn apply_thermal_losses(
    network: &mut dyn LayerProvider<EdgeRecord>,
    loss: &ThermalLoss,
) -> HydraulicsResult<ThermalReport> {
    let report = transaction(network, |layer| -> HydraulicsResult<ThermalReport> {
        let mut report = ThermalReport::default();
        let edges: Vec<_> = layer.features(&FeatureRequest::all()).cloned().collect();
        for mut edge in edges {
            let segment_w = loss.total_w_m() * edge.geometry.length();
            edge.record.loss_supply_w_m = Some(loss.supply_w_m);
            edge.record.loss_return_w_m = Some(loss.return_w_m);
            edge.record.loss_w = Some(segment_w);
            report.edges += 1;
            report.total_loss_w += segment_w;
            layer.update_feature(edge)?;
        }
        Ok(report)
    })?;
    tracing::info!(
        edges = report.edges,
        total_loss_w = report.total_loss_w,
        "thermal losses written"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_model_losses() {
        let loss = TwinPipeModel::default().losses().unwrap();
        assert_relative_eq!(loss.supply_w_m, 17.60, epsilon = 0.02);
        assert_relative_eq!(loss.return_w_m, 9.21, epsilon = 0.02);
        assert!(loss.u1 > loss.u2);
    }

    #[test]
    fn no_temperature_difference_means_no_loss() {
        let model = TwinPipeModel {
            supply_temp_c: 10.0,
            return_temp_c: 10.0,
            ..TwinPipeModel::default()
        };
        let loss = model.losses().unwrap();
        assert_eq!(loss.supply_w_m, 0.0);
        assert_eq!(loss.return_w_m, 0.0);
    }

    #[test]
    fn interference_dominating_is_singular() {
        // Carrier fills the insulation and the casing is deep in the ground:
        // Ri = 0 and Rs < Rh.
        let model = TwinPipeModel {
            insulation_diameter: m(0.0603),
            casing_diameter: m(2.0),
            spacing: m(0.01),
            ..TwinPipeModel::default()
        };
        assert!(matches!(
            model.losses(),
            Err(HydraulicsError::SingularThermalModel { .. })
        ));
    }

    #[test]
    fn zero_conductivity_is_rejected() {
        let model = TwinPipeModel {
            soil_conductivity: w_per_m_k(0.0),
            ..TwinPipeModel::default()
        };
        assert!(matches!(model.losses(), Err(HydraulicsError::InvalidConfig { .. })));
    }
}
