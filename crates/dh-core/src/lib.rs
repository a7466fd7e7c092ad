//! dh-core: shared vocabulary of the district-heating design engine.
//!
//! - `ids`: compact feature and group identifiers
//! - `geometry`: planar coordinates, bit-exact coordinate keys, projections
//! - `units`: uom SI aliases and constructors for the hydraulic inputs
//! - `numeric`: range guards for configuration values
//! - `error`: the flattened error every stage error converts into

pub mod error;
pub mod geometry;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{DhError, DhResult};
pub use geometry::{Bbox, Coord, CoordKey};
pub use ids::*;
pub use numeric::{ensure_finite, ensure_non_negative, ensure_positive};
