//! The mesh artifact handed to callers.

use crate::geometry::Point;

/// An unstructured triangular mesh: geographic vertices plus index
/// triples into `points`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mesh {
    pub points: Vec<Point>,
    pub triangles: Vec<[usize; 3]>,
}

impl Mesh {
    pub fn new(points: Vec<Point>, triangles: Vec<[usize; 3]>) -> Self {
        Self { points, triangles }
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn n_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Vertices of triangle `i`.
    pub fn triangle_points(&self, i: usize) -> [Point; 3] {
        let t = self.triangles[i];
        [self.points[t[0]], self.points[t[1]], self.points[t[2]]]
    }
}
