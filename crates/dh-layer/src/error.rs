//! Layer-specific error types.

use dh_core::{DhError, FeatureId};
use thiserror::Error;

/// Errors raised by layer providers and record conversion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    #[error("Feature {0} does not exist in layer '{1}'")]
    UnknownFeature(FeatureId, String),

    #[error("Layer '{0}' already has an edit session open")]
    EditInProgress(String),

    #[error("Layer '{0}' has no open edit session")]
    NoEditSession(String),

    #[error("Feature {id} has {found} geometry, expected {expected}")]
    GeometryKind {
        id: FeatureId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Attribute '{name}': {reason}")]
    Attribute { name: String, reason: String },
}

pub type LayerResult<T> = Result<T, LayerError>;

impl From<LayerError> for DhError {
    fn from(err: LayerError) -> Self {
        DhError::Invariant {
            what: err.to_string(),
        }
    }
}
