//! Path geometry used to place cars in space
//!
//! The engine itself is one-dimensional: a car only knows its distance along
//! the approach. A [`PathGeometry`] maps that distance to a planar point for
//! position sampling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in a local planar frame, in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// Easting
    pub x: f64,
    /// Northing
    pub y: f64,
}

impl Point2D {
    /// Create a point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in meters
    pub fn distance_to(self, other: Point2D) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    fn lerp(self, other: Point2D, t: f64) -> Point2D {
        Point2D { x: self.x + (other.x - self.x) * t, y: self.y + (other.y - self.y) * t }
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Maps a distance along the approach path to a point
pub trait PathGeometry {
    /// Total path length in meters
    fn length(&self) -> f64;

    /// Point at `distance` meters from the start; clamped to the path ends
    fn point_at_distance(&self, distance: f64) -> Point2D;
}

/// Piecewise-linear path through a list of vertices
///
/// Serializes as its vertex list; deserializing goes through
/// [`PolylinePath::new`] so a loaded path is always valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point2D>", into = "Vec<Point2D>")]
pub struct PolylinePath {
    vertices: Vec<Point2D>,
    // cumulative[i] = distance from the start to vertices[i]
    cumulative: Vec<f64>,
}

impl PolylinePath {
    /// Build a path from its vertices
    ///
    /// Returns `None` for fewer than two vertices or a non-finite coordinate.
    pub fn new(vertices: Vec<Point2D>) -> Option<Self> {
        if vertices.len() < 2 || vertices.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return None;
        }

        let mut cumulative = Vec::with_capacity(vertices.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in vertices.windows(2) {
            total += pair[0].distance_to(pair[1]);
            cumulative.push(total);
        }

        Some(Self { vertices, cumulative })
    }

    /// Straight path along the x axis from the origin
    pub fn straight(length: f64) -> Self {
        let length = if length.is_finite() { length.max(0.0) } else { 0.0 };
        Self {
            vertices: vec![Point2D::new(0.0, 0.0), Point2D::new(length, 0.0)],
            cumulative: vec![0.0, length],
        }
    }

    /// Path vertices
    pub fn vertices(&self) -> &[Point2D] {
        &self.vertices
    }
}

impl TryFrom<Vec<Point2D>> for PolylinePath {
    type Error = String;

    fn try_from(vertices: Vec<Point2D>) -> Result<Self, Self::Error> {
        let count = vertices.len();
        Self::new(vertices).ok_or_else(|| {
            format!("path needs at least two finite vertices, got {} vertices", count)
        })
    }
}

impl From<PolylinePath> for Vec<Point2D> {
    fn from(path: PolylinePath) -> Self {
        path.vertices
    }
}

impl PathGeometry for PolylinePath {
    fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn point_at_distance(&self, distance: f64) -> Point2D {
        let (Some(&first), Some(&last)) = (self.vertices.first(), self.vertices.last()) else {
            return Point2D::new(0.0, 0.0);
        };

        if distance.is_nan() || distance <= 0.0 {
            return first;
        }
        if distance >= self.length() {
            return last;
        }

        // First segment whose end lies beyond `distance`
        let segment = self.cumulative.partition_point(|&d| d <= distance).max(1) - 1;
        let start = self.cumulative[segment];
        let span = self.cumulative[segment + 1] - start;
        if span <= 0.0 {
            return self.vertices[segment];
        }
        self.vertices[segment].lerp(self.vertices[segment + 1], (distance - start) / span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_path() {
        let path = PolylinePath::straight(100.0);
        assert_eq!(path.length(), 100.0);
        assert_eq!(path.point_at_distance(25.0), Point2D::new(25.0, 0.0));
    }

    #[test]
    fn test_point_at_distance_clamps() {
        let path = PolylinePath::straight(50.0);
        assert_eq!(path.point_at_distance(-3.0), Point2D::new(0.0, 0.0));
        assert_eq!(path.point_at_distance(f64::NAN), Point2D::new(0.0, 0.0));
        assert_eq!(path.point_at_distance(500.0), Point2D::new(50.0, 0.0));
    }

    #[test]
    fn test_polyline_interpolation() {
        let path = PolylinePath::new(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(30.0, 0.0),
            Point2D::new(30.0, 40.0),
        ])
        .unwrap();

        assert_eq!(path.length(), 70.0);
        assert_eq!(path.point_at_distance(30.0), Point2D::new(30.0, 0.0));
        let p = path.point_at_distance(50.0);
        assert!((p.x - 30.0).abs() < 1e-9);
        assert!((p.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_polyline_rejects_degenerate_input() {
        assert!(PolylinePath::new(vec![Point2D::new(1.0, 1.0)]).is_none());
        assert!(PolylinePath::new(vec![Point2D::new(0.0, 0.0), Point2D::new(f64::NAN, 0.0)])
            .is_none());
    }

    #[test]
    fn test_deserialize_validates_vertices() {
        let json = r#"[{"x": 0.0, "y": 0.0}, {"x": 3.0, "y": 4.0}]"#;
        let path: PolylinePath = serde_json::from_str(json).unwrap();
        assert_eq!(path.length(), 5.0);
        assert_eq!(path.point_at_distance(10.0), Point2D::new(3.0, 4.0));

        assert!(serde_json::from_str::<PolylinePath>("[]").is_err());
        assert!(serde_json::from_str::<PolylinePath>(r#"[{"x": 1.0, "y": 1.0}]"#).is_err());
        // The old struct shape is not accepted either
        assert!(serde_json::from_str::<PolylinePath>(r#"{"vertices":[],"cumulative":[]}"#)
            .is_err());
    }

    #[test]
    fn test_serialize_roundtrip_recomputes_lengths() {
        let path = PolylinePath::new(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(30.0, 0.0),
            Point2D::new(30.0, 40.0),
        ])
        .unwrap();

        let json = serde_json::to_string(&path).unwrap();
        assert!(json.starts_with('['));
        let back: PolylinePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
        assert_eq!(back.length(), 70.0);
    }
}
