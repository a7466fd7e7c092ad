//! Error types for sizing and thermal calculations.

use dh_core::DhError;
use dh_layer::LayerError;
use thiserror::Error;

/// Errors raised by the hydraulic and thermal stages.
///
/// Configuration errors are fatal: there is no safe default for an empty
/// catalog or a non-positive viscosity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HydraulicsError {
    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Pipe catalog is empty")]
    EmptyCatalog,

    #[error("Thermal model is singular: {what}")]
    SingularThermalModel { what: &'static str },

    #[error(transparent)]
    Layer(#[from] LayerError),
}

pub type HydraulicsResult<T> = Result<T, HydraulicsError>;

impl HydraulicsError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        HydraulicsError::InvalidConfig { what: what.into() }
    }
}

impl From<DhError> for HydraulicsError {
    fn from(e: DhError) -> Self {
        HydraulicsError::InvalidConfig { what: e.to_string() }
    }
}

impl From<HydraulicsError> for DhError {
    fn from(e: HydraulicsError) -> Self {
        match e {
            HydraulicsError::EmptyCatalog => DhError::InvalidArg {
                what: "empty pipe catalog",
            },
            other => DhError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
