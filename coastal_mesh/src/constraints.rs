//! Fixed point and edge constraints.
//!
//! Caller-supplied points and edges that must appear verbatim in the output.
//! Edges whose midpoint falls outside the domain are dropped, points
//! orphaned by that filtering are dropped with them, and edge indices are
//! renumbered against the compacted point list.

use crate::domain::Domain;
use crate::error::{MeshError, Result};
use crate::geometry::Point;

/// Filtered, renumbered fixed constraints.
#[derive(Debug, Clone, Default)]
pub struct FixedConstraints {
    /// Fixed points, immutable for the life of the mesh. They occupy the
    /// first `points.len()` slots of the engine's point set.
    pub points: Vec<Point>,
    /// Fixed edges as index pairs into `points`.
    pub edges: Vec<(usize, usize)>,
}

impl FixedConstraints {
    /// Number of fixed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Filters raw constraints against the outer box of `domain`.
    ///
    /// Fails if any raw edge references a point index out of range; empty
    /// inputs normalize to "no constraints".
    pub fn load(
        raw_points: Vec<Point>,
        raw_edges: Vec<(usize, usize)>,
        domain: &Domain,
    ) -> Result<Self> {
        for &(a, b) in &raw_edges {
            let count = raw_points.len();
            if a >= count {
                return Err(MeshError::FixedEdgeOutOfRange { index: a, count });
            }
            if b >= count {
                return Err(MeshError::FixedEdgeOutOfRange { index: b, count });
            }
        }

        if raw_edges.is_empty() {
            // No edges: keep the points that lie inside the domain.
            let points = raw_points
                .into_iter()
                .filter(|&p| domain.signed_distance(0, p) < 0.0)
                .collect();
            return Ok(Self {
                points,
                edges: Vec::new(),
            });
        }

        // Edges decide which points survive.
        let kept_edges: Vec<(usize, usize)> = raw_edges
            .into_iter()
            .filter(|&(a, b)| {
                let mid = raw_points[a].midpoint(raw_points[b]);
                domain.signed_distance(0, mid) < 0.0
            })
            .collect();

        let mut remap = vec![usize::MAX; raw_points.len()];
        let mut points = Vec::new();
        let mut edges = Vec::with_capacity(kept_edges.len());
        for (a, b) in kept_edges {
            for idx in [a, b] {
                if remap[idx] == usize::MAX {
                    remap[idx] = points.len();
                    points.push(raw_points[idx]);
                }
            }
            edges.push((remap[a], remap[b]));
        }

        Ok(Self { points, edges })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    fn unit_domain() -> Domain {
        Domain::single(
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
            ],
            Vec::new(),
            1000.0,
        )
    }

    #[test]
    fn outside_edge_dropped_and_points_renumbered() {
        let domain = unit_domain();
        let pts = vec![
            Point::new(0.2, 0.2),
            Point::new(0.4, 0.2),
            Point::new(5.0, 5.0),
            Point::new(6.0, 5.0),
        ];
        let edges = vec![(0, 1), (2, 3)];
        let fixed = FixedConstraints::load(pts, edges, &domain).unwrap();
        assert_eq!(fixed.points.len(), 2);
        assert_eq!(fixed.edges, vec![(0, 1)]);
    }

    #[test]
    fn point_only_filtering() {
        let domain = unit_domain();
        let pts = vec![Point::new(0.5, 0.5), Point::new(2.0, 2.0)];
        let fixed = FixedConstraints::load(pts, Vec::new(), &domain).unwrap();
        assert_eq!(fixed.points, vec![Point::new(0.5, 0.5)]);
    }

    #[test]
    fn out_of_range_edge_is_fatal() {
        let domain = unit_domain();
        let pts = vec![Point::new(0.5, 0.5)];
        let err = FixedConstraints::load(pts, vec![(0, 3)], &domain).unwrap_err();
        assert!(matches!(
            err,
            MeshError::FixedEdgeOutOfRange { index: 3, count: 1 }
        ));
    }

    #[test]
    fn empty_inputs_normalize_to_no_constraints() {
        let domain = unit_domain();
        let fixed = FixedConstraints::load(Vec::new(), Vec::new(), &domain).unwrap();
        assert!(fixed.is_empty());
        assert!(fixed.edges.is_empty());
    }
}
