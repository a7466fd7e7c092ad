//! Error types for the dh-app service layer.

use std::path::PathBuf;

/// Application error type wrapping the stage crates' errors for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Topology error: {0}")]
    Topology(String),

    #[error("Hydraulics error: {0}")]
    Hydraulics(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for dh-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<dh_project::ProjectError> for AppError {
    fn from(err: dh_project::ProjectError) -> Self {
        match err {
            dh_project::ProjectError::Validation(v) => AppError::Validation(v.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<dh_project::ValidationError> for AppError {
    fn from(err: dh_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<dh_layer::LayerError> for AppError {
    fn from(err: dh_layer::LayerError) -> Self {
        AppError::Layer(err.to_string())
    }
}

impl From<dh_graph::GraphError> for AppError {
    fn from(err: dh_graph::GraphError) -> Self {
        AppError::Graph(err.to_string())
    }
}

impl From<dh_topology::TopologyError> for AppError {
    fn from(err: dh_topology::TopologyError) -> Self {
        AppError::Topology(err.to_string())
    }
}

impl From<dh_hydraulics::HydraulicsError> for AppError {
    fn from(err: dh_hydraulics::HydraulicsError) -> Self {
        match err {
            dh_hydraulics::HydraulicsError::Layer(e) => AppError::Layer(e.to_string()),
            other => AppError::Hydraulics(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_keep_their_kind() {
        let err: AppError =
            dh_project::ProjectError::Validation(dh_project::ValidationError::EmptyCatalog).into();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("catalog"));
    }
}
