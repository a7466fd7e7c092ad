//! Planar geometry helpers shared by the graph and topology stages.
//!
//! Coordinates live in a fixed projected reference frame, so all distances
//! are Euclidean. Heavier operations (closest point on a polyline) delegate
//! to `geo`.

use core::cmp::Ordering;
use core::fmt;

use geo::{Closest, ClosestPoint, LineString, Point};

/// A 2D point in the projected reference frame.
pub type Coord = geo::Coord<f64>;

/// Shorthand constructor.
#[inline]
pub fn coord(x: f64, y: f64) -> Coord {
    Coord { x, y }
}

/// Euclidean distance between two coordinates.
#[inline]
pub fn distance(a: Coord, b: Coord) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Bit-exact hashable key for a coordinate, used as a graph node key.
///
/// `-0.0` is normalised to `0.0` so the two compare equal. Ordering is
/// lexicographic (x, then y) and is the canonical tie-breaker everywhere
/// a deterministic choice between coordinates is needed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey {
    x_bits: u64,
    y_bits: u64,
}

impl CoordKey {
    pub fn from_coord(c: Coord) -> Self {
        // Adding 0.0 maps -0.0 onto +0.0 and leaves everything else alone.
        Self {
            x_bits: (c.x + 0.0).to_bits(),
            y_bits: (c.y + 0.0).to_bits(),
        }
    }

    pub fn coord(self) -> Coord {
        coord(f64::from_bits(self.x_bits), f64::from_bits(self.y_bits))
    }
}

impl From<Coord> for CoordKey {
    fn from(c: Coord) -> Self {
        Self::from_coord(c)
    }
}

impl Ord for CoordKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = self.coord();
        let b = other.coord();
        a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y))
    }
}

impl PartialOrd for CoordKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for CoordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.coord();
        write!(f, "({}, {})", c.x, c.y)
    }
}

/// Lexicographic comparison of two coordinates.
pub fn cmp_coords(a: Coord, b: Coord) -> Ordering {
    CoordKey::from_coord(a).cmp(&CoordKey::from_coord(b))
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bbox {
    pub fn new(a: Coord, b: Coord) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Bounding box of a set of coordinates; `None` when the set is empty.
    pub fn from_coords<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = *iter.next()?;
        let mut bbox = Self::new(first, first);
        for c in iter {
            bbox.expand_to(*c);
        }
        Some(bbox)
    }

    /// Square box of half-width `radius` centred on `c`.
    pub fn around(c: Coord, radius: f64) -> Self {
        Self::new(
            coord(c.x - radius, c.y - radius),
            coord(c.x + radius, c.y + radius),
        )
    }

    pub fn expand_to(&mut self, c: Coord) {
        self.min_x = self.min_x.min(c.x);
        self.min_y = self.min_y.min(c.y);
        self.max_x = self.max_x.max(c.x);
        self.max_y = self.max_y.max(c.y);
    }

    pub fn intersects(&self, other: &Bbox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    pub fn min_corner(&self) -> [f64; 2] {
        [self.min_x, self.min_y]
    }

    pub fn max_corner(&self) -> [f64; 2] {
        [self.max_x, self.max_y]
    }
}

/// Result of projecting a point onto a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Closest point on the segment.
    pub point: Coord,
    /// Segment parameter of `point` in `[0, 1]`.
    pub t: f64,
    /// Distance from the query point to `point`.
    pub distance: f64,
}

/// Project `p` onto segment `a`-`b`.
pub fn project_onto_segment(p: Coord, a: Coord, b: Coord) -> Projection {
    let d = b - a;
    let len2 = d.x * d.x + d.y * d.y;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * d.x + (p.y - a.y) * d.y) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let point = lerp(a, b, t);
    Projection {
        point,
        t,
        distance: distance(p, point),
    }
}

/// Closest point to `p` over all parts of a (multi-)polyline, with its
/// distance. `None` when there are no vertices at all.
pub fn closest_point_on_lines(p: Coord, parts: &[Vec<Coord>]) -> Option<(Coord, f64)> {
    let query = Point::from(p);
    let mut best: Option<(Coord, f64)> = None;
    for part in parts {
        let candidate = match part.len() {
            0 => continue,
            1 => part[0],
            _ => match LineString::from(part.clone()).closest_point(&query) {
                Closest::Intersection(q) | Closest::SinglePoint(q) => q.0,
                Closest::Indeterminate => continue,
            },
        };
        let d = distance(p, candidate);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((candidate, d));
        }
    }
    best
}

/// Linear interpolation between `a` (t = 0) and `b` (t = 1).
#[inline]
pub fn lerp(a: Coord, b: Coord, t: f64) -> Coord {
    coord(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// Sum of segment lengths of a polyline.
pub fn polyline_length(points: &[Coord]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Angle between two vectors in degrees, in `[0, 180]`.
///
/// The cosine is clamped to `[-1, 1]` before `acos`. Returns `None` if
/// either vector has zero length.
pub fn angle_between_deg(u: Coord, v: Coord) -> Option<f64> {
    let nu = u.x.hypot(u.y);
    let nv = v.x.hypot(v.y);
    if nu == 0.0 || nv == 0.0 {
        return None;
    }
    let cos = ((u.x * v.x + u.y * v.y) / (nu * nv)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// True if `b` lies on the straight line through `a` and `c` (relative
/// tolerance on the cross product).
pub fn is_collinear(a: Coord, b: Coord, c: Coord, rel_tol: f64) -> bool {
    let u = b - a;
    let v = c - b;
    let cross = u.x * v.y - u.y * v.x;
    let scale = u.x.hypot(u.y) * v.x.hypot(v.y);
    cross.abs() <= rel_tol * scale.max(f64::MIN_POSITIVE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn coord_key_normalises_negative_zero() {
        let a = CoordKey::from_coord(coord(-0.0, 1.0));
        let b = CoordKey::from_coord(coord(0.0, 1.0));
        assert_eq!(a, b);
    }

    #[test]
    fn coord_key_orders_lexicographically() {
        let mut keys = vec![
            CoordKey::from(coord(1.0, 0.0)),
            CoordKey::from(coord(0.0, 5.0)),
            CoordKey::from(coord(0.0, -1.0)),
        ];
        keys.sort();
        let coords: Vec<Coord> = keys.into_iter().map(CoordKey::coord).collect();
        assert_eq!(
            coords,
            vec![coord(0.0, -1.0), coord(0.0, 5.0), coord(1.0, 0.0)]
        );
    }

    #[test]
    fn projection_clamps_to_segment() {
        let a = coord(0.0, 0.0);
        let b = coord(10.0, 0.0);

        let mid = project_onto_segment(coord(4.0, 3.0), a, b);
        assert_relative_eq!(mid.t, 0.4);
        assert_relative_eq!(mid.distance, 3.0);

        let before = project_onto_segment(coord(-2.0, 0.0), a, b);
        assert_eq!(before.t, 0.0);
        assert_eq!(before.point, a);
    }

    #[test]
    fn closest_point_over_parts() {
        let parts = vec![
            vec![coord(0.0, 0.0), coord(10.0, 0.0)],
            vec![coord(0.0, 5.0), coord(10.0, 5.0)],
        ];
        let (p, d) = closest_point_on_lines(coord(3.0, 4.0), &parts).unwrap();
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, 5.0);
        assert_relative_eq!(d, 1.0);
        assert!(closest_point_on_lines(coord(0.0, 0.0), &[]).is_none());
    }

    #[test]
    fn angles() {
        let east = coord(1.0, 0.0);
        assert_relative_eq!(angle_between_deg(east, coord(0.0, 2.0)).unwrap(), 90.0);
        assert_relative_eq!(angle_between_deg(east, coord(-3.0, 0.0)).unwrap(), 180.0);
        assert_relative_eq!(angle_between_deg(east, east).unwrap(), 0.0);
        assert!(angle_between_deg(east, coord(0.0, 0.0)).is_none());
    }

    #[test]
    fn bbox_intersection() {
        let a = Bbox::new(coord(0.0, 0.0), coord(2.0, 2.0));
        let b = Bbox::new(coord(2.0, 2.0), coord(3.0, 3.0));
        let c = Bbox::new(coord(2.1, 0.0), coord(3.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(Bbox::from_coords(&[]).is_none());
    }

    #[test]
    fn collinearity() {
        assert!(is_collinear(
            coord(0.0, 0.0),
            coord(1.0, 1.0),
            coord(3.0, 3.0),
            1e-9
        ));
        assert!(!is_collinear(
            coord(0.0, 0.0),
            coord(1.0, 1.0),
            coord(3.0, 2.0),
            1e-9
        ));
    }
}
