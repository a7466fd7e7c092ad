//! dh-topology: refinement and annotation of the synthesized network.
//!
//! Provides:
//! - Endpoint multiplicity (`EndpointIndex`) and node derivation
//! - The degenerate-edge filter (length and junction-angle predicates)
//! - Grouping of flagged edges between protected junctions
//! - Simplification operators (chord, corner smoothing, pass-through)
//! - Demand aggregation over the source-rooted tree

pub mod demand;
pub mod endpoints;
pub mod error;
pub mod filter;
pub mod group;
pub mod nodes;
pub mod simplify;

pub use demand::{DemandConfig, DemandReport, aggregate_demand};
pub use endpoints::{End, EndpointIndex};
pub use error::{TopologyError, TopologyResult};
pub use filter::{EdgeFlags, FilterBounds, FlagReason, flag_edges};
pub use group::{Group, group_edges};
pub use nodes::{derive_nodes, node_coords};
pub use simplify::{
    Operator, SimplifyReport, apply_operator, chaikin, drop_collinear, merge_lines,
    simplify_groups, smooth_corners,
};
