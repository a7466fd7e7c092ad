//! Application service layer for the district-heating design engine.
//!
//! Runs the stage crates in order over host-supplied layers and gives the
//! CLI one entry point for loading, designing and reporting.

pub mod compile;
pub mod design_service;
pub mod error;
pub mod progress;
pub mod report;
pub mod scenario_service;

pub use compile::{DesignParams, capacity_table, compile_config};
pub use design_service::{
    DesignLayers, DesignResponse, DesignTiming, run_design, run_design_with_progress,
};
pub use error::{AppError, AppResult};
pub use progress::{DesignProgressEvent, DesignStage};
pub use report::{CapacityRow, DesignSummary, EdgeRow, NodeRow, capacity_rows, summarize};
pub use scenario_service::{ScenarioLayers, design_scenario, load_config, load_scenario};
