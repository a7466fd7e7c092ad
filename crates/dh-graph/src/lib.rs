//! dh-graph: road graph, spatial queries and network synthesis.
//!
//! Provides:
//! - `SpatialIndex` for nearest-feature and window queries
//! - `RoadGraph` and `GraphBuilder` (coordinates as nodes, segments as edges)
//! - The connectivity cleaner (endpoint snapping, largest component)
//! - Metric-closure Steiner tree synthesis into the network layer
//! - Service lines from buildings to their nearest road
//!
//! # Example
//!
//! ```
//! use dh_core::geometry::coord;
//! use dh_core::FeatureId;
//! use dh_graph::{GraphBuilder, synthesize};
//!
//! let mut builder = GraphBuilder::new();
//! builder.add_segment(coord(0.0, 0.0), coord(10.0, 0.0), None);
//! builder.add_segment(coord(10.0, 0.0), coord(10.0, 10.0), None);
//! let graph = builder.build().unwrap();
//!
//! let tree = synthesize(&graph, coord(0.0, 0.0), &[(FeatureId::from_index(0), coord(10.0, 10.0))], 0.1);
//! assert_eq!(tree.edges.len(), 2);
//! ```

pub mod builder;
pub mod clean;
pub mod error;
pub mod graph;
pub mod service;
pub mod spatial;
pub mod steiner;
pub(crate) mod validate;

pub use builder::{GraphBuilder, build_graph};
pub use clean::{CleanReport, clean, snap_endpoints};
pub use error::{GraphError, GraphResult};
pub use graph::{GraphEdge, RoadGraph};
pub use service::{ServiceLine, ServiceReport, connect_buildings, plan_service_lines};
pub use spatial::SpatialIndex;
pub use steiner::{
    ExcludedTerminal, ExclusionReason, SteinerReport, SteinerTree, Terminal, TerminalKind,
    TreeEdge, synthesize, write_network,
};
