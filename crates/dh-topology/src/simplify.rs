//! Shape-reduction operators applied to one group at a time.

use std::str::FromStr;

use dh_core::geometry::{Coord, CoordKey, is_collinear, lerp};
use dh_core::{FeatureId, GroupId};
use dh_layer::{
    EdgeRecord, FeatureRequest, Geometry, LayerError, LayerProvider, NewFeature, TopologyTag,
    transaction,
};

use crate::error::TopologyResult;
use crate::group::Group;

const COLLINEAR_TOL: f64 = 1e-9;

/// How a group's merged geometry is reshaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Straight segment from the first to the last vertex.
    CollapseToChord,
    /// Two rounds of Chaikin corner cutting with pinned endpoints.
    CornerSmoothing,
    /// Geometry unchanged; marks the result for manual review.
    PassThrough,
}

impl Operator {
    pub fn tag(self) -> TopologyTag {
        match self {
            Operator::CollapseToChord => TopologyTag::Simplified,
            Operator::CornerSmoothing => TopologyTag::Bended,
            Operator::PassThrough => TopologyTag::Manual,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::CollapseToChord => "chord",
            Operator::CornerSmoothing => "smooth",
            Operator::PassThrough => "pass_through",
        }
    }

    /// Reshape a merged polyline. Fewer than two distinct vertices in the
    /// result means there is nothing to replace.
    pub fn reshape(self, merged: Vec<Coord>) -> Vec<Coord> {
        match self {
            Operator::CollapseToChord => match (merged.first(), merged.last()) {
                (Some(&a), Some(&b)) if CoordKey::from_coord(a) != CoordKey::from_coord(b) => {
                    vec![a, b]
                }
                _ => Vec::new(),
            },
            Operator::CornerSmoothing => smooth_corners(merged),
            Operator::PassThrough => merged,
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chord" => Ok(Operator::CollapseToChord),
            "smooth" => Ok(Operator::CornerSmoothing),
            "pass_through" => Ok(Operator::PassThrough),
            other => Err(format!("unknown operator '{other}'")),
        }
    }
}

fn same(a: Coord, b: Coord) -> bool {
    CoordKey::from_coord(a) == CoordKey::from_coord(b)
}

/// Remove consecutive identical vertices.
pub fn dedup(mut points: Vec<Coord>) -> Vec<Coord> {
    points.dedup_by(|b, a| same(*a, *b));
    points
}

/// Chaikin corner cutting. Each segment `(p0, p1)` becomes
/// `0.75 p0 + 0.25 p1` and `0.25 p0 + 0.75 p1`; the first and last vertex
/// are kept in place.
pub fn chaikin(points: &[Coord], iterations: usize) -> Vec<Coord> {
    let mut current = points.to_vec();
    for _ in 0..iterations {
        if current.len() < 2 {
            break;
        }
        let mut next = Vec::with_capacity(current.len() * 2);
        next.push(current[0]);
        for w in current.windows(2) {
            next.push(lerp(w[0], w[1], 0.25));
            next.push(lerp(w[0], w[1], 0.75));
        }
        next.push(current[current.len() - 1]);
        current = next;
    }
    current
}

/// Two rounds of Chaikin followed by collinear-vertex removal.
///
/// Runs in a frame anchored at the first vertex: at projected-map
/// magnitudes the interpolation rounding would otherwise exceed the
/// collinearity tolerance on short segments. The endpoints of the result
/// are the input endpoints, bit for bit.
pub fn smooth_corners(points: Vec<Coord>) -> Vec<Coord> {
    let points = dedup(points);
    let (Some(&origin), Some(&end)) = (points.first(), points.last()) else {
        return points;
    };
    let local: Vec<Coord> = points.iter().map(|&p| p - origin).collect();
    let mut out: Vec<Coord> = drop_collinear(chaikin(&local, 2))
        .into_iter()
        .map(|p| p + origin)
        .collect();
    if let Some(first) = out.first_mut() {
        *first = origin;
    }
    if let Some(last) = out.last_mut() {
        *last = end;
    }
    dedup(out)
}

/// Drop interior vertices lying on the line through their neighbours.
pub fn drop_collinear(points: Vec<Coord>) -> Vec<Coord> {
    if points.len() < 3 {
        return points;
    }
    let mut kept: Vec<Coord> = Vec::with_capacity(points.len());
    kept.push(points[0]);
    for i in 1..points.len() - 1 {
        let prev = kept[kept.len() - 1];
        if !is_collinear(prev, points[i], points[i + 1], COLLINEAR_TOL) {
            kept.push(points[i]);
        }
    }
    kept.push(points[points.len() - 1]);
    dedup(kept)
}

/// Chain polylines end to end into one vertex sequence.
///
/// The chain starts at the smallest coordinate used by exactly one piece
/// end (or at the first piece for a closed ring). Pieces that cannot be
/// reached are appended in input order.
pub fn merge_lines(pieces: Vec<Vec<Coord>>) -> Vec<Coord> {
    let mut pool: Vec<Option<Vec<Coord>>> = pieces
        .into_iter()
        .map(dedup)
        .filter(|p| p.len() >= 2)
        .map(Some)
        .collect();
    if pool.is_empty() {
        return Vec::new();
    }

    let mut uses: std::collections::BTreeMap<CoordKey, usize> = Default::default();
    for piece in pool.iter().flatten() {
        for end in [piece[0], piece[piece.len() - 1]] {
            *uses.entry(CoordKey::from_coord(end)).or_default() += 1;
        }
    }
    let start = uses.iter().find(|(_, n)| **n == 1).map(|(k, _)| k.coord());

    let take = |pool: &mut Vec<Option<Vec<Coord>>>, at: Coord| -> Option<Vec<Coord>> {
        let idx = pool.iter().position(|p| {
            p.as_ref()
                .is_some_and(|p| same(p[0], at) || same(p[p.len() - 1], at))
        })?;
        let mut piece = pool[idx].take()?;
        if !same(piece[0], at) {
            piece.reverse();
        }
        Some(piece)
    };

    let mut line = match start.and_then(|s| take(&mut pool, s)) {
        Some(piece) => piece,
        None => pool.iter_mut().find_map(Option::take).unwrap_or_default(),
    };
    while let Some(&tail) = line.last() {
        match take(&mut pool, tail) {
            Some(piece) => line.extend_from_slice(&piece[1..]),
            None => break,
        }
    }
    for piece in pool.into_iter().flatten() {
        line.extend(piece);
    }
    dedup(line)
}

/// Replace the members of `group` with one edge produced by `op`, inside
/// one edit session. Returns the new edge id, or `None` when the merge
/// produced no usable geometry (nothing is changed then).
#[tracing::instrument(skip_all, fields(group = %group.id, op = op.as_str()))]
pub fn apply_operator(
    network: &mut dyn LayerProvider<EdgeRecord>,
    group: &Group,
    op: Operator,
) -> TopologyResult<Option<FeatureId>> {
    transaction(network, |layer| -> TopologyResult<Option<FeatureId>> {
        let mut pieces = Vec::new();
        for &id in &group.members {
            let feature = layer
                .feature(id)
                .ok_or_else(|| LayerError::UnknownFeature(id, layer.name().to_string()))?;
            pieces.extend(feature.geometry.parts().iter().cloned());
        }
        let shaped = op.reshape(merge_lines(pieces));
        if shaped.len() < 2 {
            tracing::debug!("merged geometry is empty; group left unchanged");
            return Ok(None);
        }
        layer.delete_features(&group.members)?;
        let ids = layer.add_features(vec![NewFeature::new(
            Geometry::line(shaped),
            EdgeRecord::tagged(op.tag()),
        )])?;
        Ok(ids.first().copied())
    })
}

/// Outcome of applying one operator to many groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimplifyReport {
    pub replaced: Vec<(GroupId, FeatureId)>,
    pub unchanged: Vec<GroupId>,
}

/// Apply `op` to every group in order.
pub fn simplify_groups(
    network: &mut dyn LayerProvider<EdgeRecord>,
    groups: &[Group],
    op: Operator,
) -> TopologyResult<SimplifyReport> {
    let mut report = SimplifyReport::default();
    for group in groups {
        match apply_operator(network, group, op)? {
            Some(id) => report.replaced.push((group.id, id)),
            None => report.unchanged.push(group.id),
        }
    }
    tracing::info!(
        replaced = report.replaced.len(),
        unchanged = report.unchanged.len(),
        remaining = network.features(&FeatureRequest::all()).count(),
        "groups simplified"
    );
    Ok(report)
}
