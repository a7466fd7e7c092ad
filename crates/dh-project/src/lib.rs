//! dh-project: design configuration and scenario files.

pub mod scenario;
pub mod schema;
pub mod validate;

use std::path::Path;

pub use scenario::{BuildingDef, RoadDef, Scenario};
pub use schema::*;
pub use validate::{ValidationError, validate_config, validate_scenario};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Invalid design config: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy)]
enum Format {
    Yaml,
    Json,
}

fn read_config(path: &Path, format: Format) -> ProjectResult<DesignConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: DesignConfig = match format {
        Format::Yaml => serde_yaml::from_str(&content)?,
        Format::Json => serde_json::from_str(&content)?,
    };
    validate_config(&config)?;
    Ok(config)
}

fn write_config(path: &Path, config: &DesignConfig, format: Format) -> ProjectResult<()> {
    validate_config(config)?;
    let content = match format {
        Format::Yaml => serde_yaml::to_string(config)?,
        Format::Json => serde_json::to_string_pretty(config)?,
    };
    std::fs::write(path, content)?;
    Ok(())
}

/// Load and validate a YAML design config.
pub fn load_yaml(path: &Path) -> ProjectResult<DesignConfig> {
    read_config(path, Format::Yaml)
}

/// Validate, then write `config` as YAML. Nothing is written if validation fails.
pub fn save_yaml(path: &Path, config: &DesignConfig) -> ProjectResult<()> {
    write_config(path, config, Format::Yaml)
}

pub fn load_json(path: &Path) -> ProjectResult<DesignConfig> {
    read_config(path, Format::Json)
}

pub fn save_json(path: &Path, config: &DesignConfig) -> ProjectResult<()> {
    write_config(path, config, Format::Json)
}

/// Load a scenario (roads, buildings, source) from YAML.
pub fn load_scenario(path: &Path) -> ProjectResult<Scenario> {
    let content = std::fs::read_to_string(path)?;
    let scenario: Scenario = serde_yaml::from_str(&content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}
