//! Graph-specific error types.

use dh_core::{CoordKey, DhError};
use dh_layer::LayerError;

/// Graph construction, cleaning and synthesis errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// An edge starts and ends at the same coordinate.
    SelfLoop { at: CoordKey },

    /// An edge weight is NaN, infinite or not positive.
    InvalidWeight { from: CoordKey, to: CoordKey, weight: f64 },

    /// The coordinate index disagrees with the node stored in the graph.
    KeyMismatch { key: CoordKey },

    /// Snap tolerance must be finite and non-negative.
    InvalidTolerance { value: f64 },

    /// A layer operation failed.
    Layer(LayerError),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::SelfLoop { at } => write!(f, "Self-loop edge at {:?}", at),
            GraphError::InvalidWeight { from, to, weight } => {
                write!(f, "Edge {:?} -> {:?} has invalid weight {}", from, to, weight)
            }
            GraphError::KeyMismatch { key } => {
                write!(f, "Coordinate index entry {:?} points at a different node", key)
            }
            GraphError::InvalidTolerance { value } => {
                write!(f, "Snap tolerance {} must be finite and non-negative", value)
            }
            GraphError::Layer(err) => write!(f, "Layer error: {}", err),
        }
    }
}

impl std::error::Error for GraphError {}

impl From<LayerError> for GraphError {
    fn from(err: LayerError) -> Self {
        GraphError::Layer(err)
    }
}

impl From<GraphError> for DhError {
    fn from(err: GraphError) -> Self {
        DhError::Invariant {
            what: err.to_string(),
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
