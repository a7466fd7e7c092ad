//! dh-layer: feature layers exchanged with the host application.
//!
//! Provides:
//! - Features with point or (multi-)polyline geometry and a typed record
//! - Attribute bags and the `Record` conversion at the host boundary
//! - The `LayerProvider` contract and an in-memory implementation
//! - Scoped edit transactions (all edits of a stage commit together)
//!
//! # Example
//!
//! ```
//! use dh_core::geometry::coord;
//! use dh_layer::{transaction, Geometry, LayerError, LayerProvider, MemoryLayer, NewFeature, RoadRecord};
//!
//! let mut roads = MemoryLayer::<RoadRecord>::new("roads");
//! let ids = transaction(&mut roads, |layer| -> Result<_, LayerError> {
//!     layer.add_features(vec![NewFeature::new(
//!         Geometry::line(vec![coord(0.0, 0.0), coord(10.0, 0.0)]),
//!         RoadRecord::default(),
//!     )])
//! })
//! .unwrap();
//! assert_eq!(roads.feature_count(), 1);
//! assert!(roads.feature(ids[0]).is_some());
//! ```

pub mod attrs;
pub mod error;
pub mod feature;
pub mod layer;
pub mod records;

pub use attrs::{AttrValue, Attributes, Record};
pub use error::{LayerError, LayerResult};
pub use feature::{Feature, Geometry, NewFeature};
pub use layer::{FeatureRequest, LayerProvider, MemoryLayer, transaction};
pub use records::{
    BuildingRecord, EdgeFlag, EdgeRecord, NodeRecord, RoadRecord, ServiceLineRecord, TopologyTag,
};
