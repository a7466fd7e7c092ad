//! Features and their geometry.

use dh_core::geometry::{Bbox, Coord, polyline_length};
use dh_core::FeatureId;

/// Point or (multi-)polyline geometry.
///
/// A single-part polyline is a `Lines` with one part; multi-part features
/// carry one inner vector per part.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    Lines(Vec<Vec<Coord>>),
}

impl Geometry {
    /// Single-part polyline.
    pub fn line(points: Vec<Coord>) -> Self {
        Geometry::Lines(vec![points])
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "point",
            Geometry::Lines(_) => "polyline",
        }
    }

    pub fn as_point(&self) -> Option<Coord> {
        match self {
            Geometry::Point(c) => Some(*c),
            Geometry::Lines(_) => None,
        }
    }

    /// Polyline parts; a point has none.
    pub fn parts(&self) -> &[Vec<Coord>] {
        match self {
            Geometry::Point(_) => &[],
            Geometry::Lines(parts) => parts,
        }
    }

    /// All vertices in order (a point yields itself).
    pub fn vertices(&self) -> Box<dyn Iterator<Item = Coord> + '_> {
        match self {
            Geometry::Point(c) => Box::new(std::iter::once(*c)),
            Geometry::Lines(parts) => Box::new(parts.iter().flatten().copied()),
        }
    }

    /// First vertex of the first part and last vertex of the last part.
    pub fn terminal_points(&self) -> Option<(Coord, Coord)> {
        match self {
            Geometry::Point(c) => Some((*c, *c)),
            Geometry::Lines(parts) => {
                let first = parts.iter().find_map(|p| p.first().copied())?;
                let last = parts.iter().rev().find_map(|p| p.last().copied())?;
                Some((first, last))
            }
        }
    }

    pub fn bbox(&self) -> Option<Bbox> {
        let vertices: Vec<Coord> = self.vertices().collect();
        Bbox::from_coords(&vertices)
    }

    /// Total length over all parts (0 for points).
    pub fn length(&self) -> f64 {
        self.parts().iter().map(|p| polyline_length(p)).sum()
    }

    /// No vertices at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_) => false,
            Geometry::Lines(parts) => parts.iter().all(Vec::is_empty),
        }
    }
}

/// A feature owned by a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature<R> {
    pub id: FeatureId,
    pub geometry: Geometry,
    pub record: R,
}

impl<R> Feature<R> {
    /// Point coordinate, if this is a point feature.
    pub fn point(&self) -> Option<Coord> {
        self.geometry.as_point()
    }
}

/// A feature not yet added to a layer (the layer assigns the id).
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeature<R> {
    pub geometry: Geometry,
    pub record: R,
}

impl<R> NewFeature<R> {
    pub fn new(geometry: Geometry, record: R) -> Self {
        Self { geometry, record }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::geometry::coord;

    #[test]
    fn multipart_terminal_points_and_length() {
        let g = Geometry::Lines(vec![
            vec![coord(0.0, 0.0), coord(3.0, 4.0)],
            vec![],
            vec![coord(10.0, 0.0), coord(10.0, 2.0)],
        ]);
        assert_eq!(
            g.terminal_points(),
            Some((coord(0.0, 0.0), coord(10.0, 2.0)))
        );
        assert!((g.length() - 7.0).abs() < 1e-12);
        assert!(!g.is_empty());
        assert_eq!(g.vertices().count(), 4);
    }

    #[test]
    fn empty_lines() {
        let g = Geometry::Lines(vec![vec![]]);
        assert!(g.is_empty());
        assert!(g.terminal_points().is_none());
        assert!(g.bbox().is_none());
    }

    #[test]
    fn point_geometry() {
        let g = Geometry::Point(coord(1.0, 2.0));
        assert_eq!(g.as_point(), Some(coord(1.0, 2.0)));
        assert!(g.parts().is_empty());
        assert_eq!(g.length(), 0.0);
        assert_eq!(g.kind(), "point");
    }
}
