//! Pipe sizing and heat losses for a district-heating network.
//!
//! [`CapacityTable::compute`] sweeps every catalog diameter for the
//! velocity at which the Darcy-Weisbach pressure loss reaches the limit and
//! converts it into a maximum heat flow. [`assign_sizes`] then applies the
//! simultaneity factor to the aggregated node demand and gives each
//! network edge the smallest sufficient pipe. [`TwinPipeModel`] evaluates
//! the buried twin-pipe resistance network written by
//! [`apply_thermal_losses`].
//!
//! ```
//! use dh_hydraulics::{CapacityTable, ColebrookConfig, FluidProperties, HydraulicLimits, PipeCatalog};
//!
//! let table = CapacityTable::compute(
//!     &PipeCatalog::standard(),
//!     &FluidProperties::default(),
//!     &HydraulicLimits::default(),
//!     &ColebrookConfig::default(),
//! )
//! .unwrap();
//! let dn = table.smallest_sufficient(250.0).map(|e| e.dn);
//! assert!(dn.is_some());
//! ```

pub mod capacity;
pub mod catalog;
pub mod error;
pub mod fluid;
pub mod friction;
pub mod sizing;
pub mod thermal;

pub use capacity::{CapacityEntry, CapacityTable, HydraulicLimits, heat_flow_kw, pipe_capacity};
pub use catalog::{PipeCatalog, PipeSize};
pub use error::{HydraulicsError, HydraulicsResult};
pub use fluid::FluidProperties;
pub use friction::{
    ColebrookConfig, FrictionFactor, LAMINAR_LIMIT, colebrook, friction_factor, pressure_loss,
    reynolds,
};
pub use sizing::{
    DEFAULT_SIMULTANEITY, SizingReport, assign_sizes, simultaneous_load_kw,
    validate_simultaneity,
};
pub use thermal::{ThermalLoss, ThermalReport, TwinPipeModel, apply_thermal_losses};
