//! Degenerate-edge filter: short edges and suspicious junction angles.

use std::collections::BTreeMap;
use std::fmt;

use dh_core::geometry::{Coord, CoordKey, angle_between_deg, distance};
use dh_core::FeatureId;

use crate::endpoints::EndpointIndex;
use crate::error::{TopologyError, TopologyResult};

/// Thresholds of the filter predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterBounds {
    /// Edges at most this long are flagged.
    pub min_length: f64,
    /// At or below this angle (degrees) two edges fold onto each other.
    pub angle_lower_deg: f64,
    /// Angles strictly below this bound are flagged.
    pub angle_upper_deg: f64,
}

impl Default for FilterBounds {
    fn default() -> Self {
        Self {
            min_length: 0.5,
            angle_lower_deg: 20.0,
            angle_upper_deg: 90.0,
        }
    }
}

impl FilterBounds {
    pub fn validate(&self) -> TopologyResult<()> {
        let bad = |what: String| Err(TopologyError::InvalidBounds { what });
        if !self.min_length.is_finite() || self.min_length < 0.0 {
            return bad(format!("min_length {} must be >= 0", self.min_length));
        }
        let in_range = |a: f64| (0.0..=180.0).contains(&a);
        if !in_range(self.angle_lower_deg) || !in_range(self.angle_upper_deg) {
            return bad("angles must lie in [0, 180]".to_string());
        }
        if self.angle_lower_deg >= self.angle_upper_deg {
            return bad(format!(
                "lower angle {} must be below upper angle {}",
                self.angle_lower_deg, self.angle_upper_deg
            ));
        }
        Ok(())
    }
}

/// Why an edge was flagged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagReason {
    TooShort { length: f64 },
    NearParallel { neighbour: FeatureId, angle_deg: f64 },
    SharpAngle { neighbour: FeatureId, angle_deg: f64 },
}

impl fmt::Display for FlagReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagReason::TooShort { length } => write!(f, "too short ({length:.3})"),
            FlagReason::NearParallel {
                neighbour,
                angle_deg,
            } => write!(f, "near-parallel overlap with {neighbour} ({angle_deg:.1} deg)"),
            FlagReason::SharpAngle {
                neighbour,
                angle_deg,
            } => write!(f, "sharp junction angle with {neighbour} ({angle_deg:.1} deg)"),
        }
    }
}

/// Flagged edges with every reason found, keyed by edge id.
pub type EdgeFlags = BTreeMap<FeatureId, Vec<FlagReason>>;

/// Vector from the shared endpoint `at` towards the other end of an edge.
fn outward(ends: (Coord, Coord), at: CoordKey) -> Coord {
    let (a, b) = ends;
    if CoordKey::from_coord(a) == at { b - a } else { a - b }
}

/// Apply the length and angle predicates to every edge.
///
/// Edge length is the endpoint-to-endpoint distance. The angle between
/// two edges sharing an endpoint is measured between their outward
/// vectors: 180 degrees is a straight continuation, 0 degrees two edges
/// folded onto each other.
pub fn flag_edges(index: &EndpointIndex, bounds: &FilterBounds) -> EdgeFlags {
    let mut flags = EdgeFlags::new();
    for id in index.edge_ids() {
        let Some((a, b)) = index.ends(id) else {
            continue;
        };
        let length = distance(a, b);
        if length <= bounds.min_length {
            flags.entry(id).or_default().push(FlagReason::TooShort { length });
        }
    }

    for (key, _) in index.degrees().filter(|&(_, d)| d >= 2) {
        let touching = index.edges_at(key);
        for (i, &(e1, _)) in touching.iter().enumerate() {
            for &(e2, _) in &touching[i + 1..] {
                if e1 == e2 {
                    continue;
                }
                let (Some(ends1), Some(ends2)) = (index.ends(e1), index.ends(e2)) else {
                    continue;
                };
                let Some(angle) = angle_between_deg(outward(ends1, key), outward(ends2, key))
                else {
                    continue;
                };
                if angle >= bounds.angle_upper_deg {
                    continue;
                }
                let near_parallel = angle <= bounds.angle_lower_deg;
                for (edge, neighbour) in [(e1, e2), (e2, e1)] {
                    let reason = if near_parallel {
                        FlagReason::NearParallel {
                            neighbour,
                            angle_deg: angle,
                        }
                    } else {
                        FlagReason::SharpAngle {
                            neighbour,
                            angle_deg: angle,
                        }
                    };
                    flags.entry(edge).or_default().push(reason);
                }
            }
        }
    }
    tracing::debug!(flagged = flags.len(), "edge filter applied");
    flags
}
