use dh_core::DhError;
use dh_graph::GraphError;
use dh_layer::LayerError;
use thiserror::Error;

pub type TopologyResult<T> = Result<T, TopologyError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Invalid filter bounds: {what}")]
    InvalidBounds { what: String },

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl From<TopologyError> for DhError {
    fn from(err: TopologyError) -> Self {
        DhError::Invariant {
            what: err.to_string(),
        }
    }
}
