//! Constrained Delaunay triangulation with exterior and degenerate
//! triangle elimination.
//!
//! Unconstrained point sets go through `delaunator`; when fixed edges must
//! survive, the `cdt` crate's constrained triangulation is used instead.
//! Either way the raw result covers the convex hull, so triangles whose
//! centroid falls outside the domain (with a small tolerance `geps`) are
//! stripped, as are near-degenerate slivers.

use std::collections::HashSet;

use crate::connectivity::prune_candidates;
use crate::domain::Domain;
use crate::error::{MeshError, Result};
use crate::geometry::Point;
use crate::projection::Projection;
use crate::quality::triangle_angles;

const MIN_ANGLE_RAD: f64 = 1.0 * std::f64::consts::PI / 180.0;
const MAX_ANGLE_RAD: f64 = 179.0 * std::f64::consts::PI / 180.0;

/// Triangulates a point set and trims exterior and degenerate triangles.
pub struct Eliminator<'a> {
    pub domain: &'a Domain,
    pub projection: &'a Projection,
    /// Interior tolerance in degrees; triangles are kept when their
    /// centroid's signed distance is below `-geps`.
    pub geps: f64,
    /// Size of the immutable fixed-point prefix.
    pub n_fixed: usize,
}

impl<'a> Eliminator<'a> {
    /// Triangulates `points` and returns interior, well-shaped triangles.
    ///
    /// Runs one elimination pass normally and two when `final_pass` is set;
    /// passes after the first delete low-connectivity nodes from `points`
    /// before retriangulating, so on the final call the point set may
    /// shrink.
    pub fn triangulate_and_trim(
        &self,
        points: &mut Vec<Point>,
        fixed_edges: &[(usize, usize)],
        final_pass: bool,
    ) -> Result<Vec<[usize; 3]>> {
        let passes = if final_pass { 2 } else { 1 };
        let mut triangles = Vec::new();
        for pass in 0..passes {
            if pass > 0 {
                let doomed = prune_candidates(points.len(), &triangles, self.n_fixed);
                if !doomed.is_empty() {
                    let doomed: HashSet<usize> = doomed.into_iter().collect();
                    let mut idx = 0;
                    points.retain(|_| {
                        let keep = !doomed.contains(&idx);
                        idx += 1;
                        keep
                    });
                }
            }

            // Mean-center the planar image to keep coordinate magnitudes
            // small for the triangulator.
            let mut planar = self.projection.forward_all(points);
            let n = planar.len().max(1) as f64;
            let cx = planar.iter().map(|p| p.x).sum::<f64>() / n;
            let cy = planar.iter().map(|p| p.y).sum::<f64>() / n;
            for p in &mut planar {
                p.x -= cx;
                p.y -= cy;
            }

            triangles = raw_triangulation(&planar, fixed_edges)?;

            triangles.retain(|t| {
                let centroid = Point::new(
                    (planar[t[0]].x + planar[t[1]].x + planar[t[2]].x) / 3.0 + cx,
                    (planar[t[0]].y + planar[t[1]].y + planar[t[2]].y) / 3.0 + cy,
                );
                let geographic = self.projection.inverse(centroid);
                self.domain.signed_distance(0, geographic) < -self.geps
            });

            triangles.retain(|t| {
                let angles = triangle_angles(planar[t[0]], planar[t[1]], planar[t[2]]);
                angles.iter().all(|&a| a > MIN_ANGLE_RAD && a < MAX_ANGLE_RAD)
            });
        }

        if triangles.is_empty() {
            return Err(MeshError::EmptyTriangulation);
        }
        Ok(triangles)
    }
}

/// Raw (convex-hull covering) Delaunay triangulation of planar points,
/// constrained when `fixed_edges` is non-empty.
///
/// `cdt` treats its edge list as closed boundaries and culls triangles
/// outside them, so the convex hull (counter-clockwise, from `delaunator`)
/// is appended as the outer contour; the fixed edges then act as interior
/// constraints and the whole hull survives.
fn raw_triangulation(planar: &[Point], fixed_edges: &[(usize, usize)]) -> Result<Vec<[usize; 3]>> {
    let coords: Vec<delaunator::Point> = planar
        .iter()
        .map(|p| delaunator::Point { x: p.x, y: p.y })
        .collect();
    let triangulation = delaunator::triangulate(&coords);
    if fixed_edges.is_empty() {
        return Ok(triangulation
            .triangles
            .chunks(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect());
    }

    let constrained: HashSet<(usize, usize)> = fixed_edges
        .iter()
        .map(|&(a, b)| (a.min(b), a.max(b)))
        .collect();
    let mut edges = fixed_edges.to_vec();
    let hull = &triangulation.hull;
    for i in 0..hull.len() {
        let (a, b) = (hull[i], hull[(i + 1) % hull.len()]);
        // A fixed edge lying on the hull already seals that stretch.
        if !constrained.contains(&(a.min(b), a.max(b))) {
            edges.push((a, b));
        }
    }

    let pts: Vec<(f64, f64)> = planar.iter().map(|p| (p.x, p.y)).collect();
    let tris = cdt::triangulate_with_edges(&pts, &edges)
        .map_err(|e| MeshError::Triangulation(format!("{e:?}")))?;
    Ok(tris.into_iter().map(|t| [t.0, t.1, t.2]).collect())
}

/// Removes exactly coincident points, keeping the first occurrence. The
/// fixed prefix always survives because it comes first.
pub fn dedup_points(points: &mut Vec<Point>) {
    let mut seen: HashSet<(u64, u64)> = HashSet::with_capacity(points.len());
    points.retain(|p| seen.insert((p.x.to_bits(), p.y.to_bits())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::projection::Projection;

    fn square_domain() -> Domain {
        Domain::single(
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
            ],
            Vec::new(),
            5_000.0,
        )
    }

    fn grid_points(n: usize) -> Vec<Point> {
        let mut pts = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                pts.push(Point::new(i as f64 / n as f64, j as f64 / n as f64));
            }
        }
        pts
    }

    #[test]
    fn grid_triangulates_fully_interior() {
        let domain = square_domain();
        let projection = Projection::for_extent(&domain.extent());
        let eliminator = Eliminator {
            domain: &domain,
            projection: &projection,
            geps: 1e-8,
            n_fixed: 0,
        };
        let mut points = grid_points(4);
        let tris = eliminator
            .triangulate_and_trim(&mut points, &[], false)
            .unwrap();
        // 4x4 cells, two triangles each
        assert_eq!(tris.len(), 32);
        for t in &tris {
            let c = Point::new(
                (points[t[0]].x + points[t[1]].x + points[t[2]].x) / 3.0,
                (points[t[0]].y + points[t[1]].y + points[t[2]].y) / 3.0,
            );
            assert!(domain.signed_distance(0, c) < 0.0);
        }
    }

    #[test]
    fn l_shaped_concavity_is_trimmed() {
        // L-shaped domain: the convex hull covers the notch, elimination
        // must remove triangles whose centroid lands in it.
        let outer = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 0.5),
            Point::new(0.5, 0.5),
            Point::new(0.5, 1.0),
            Point::new(0.0, 1.0),
        ];
        let domain = Domain::single(outer, Vec::new(), 5_000.0);
        let projection = Projection::for_extent(&domain.extent());
        let eliminator = Eliminator {
            domain: &domain,
            projection: &projection,
            geps: 1e-8,
            n_fixed: 0,
        };
        let mut points = grid_points(4);
        let tris = eliminator
            .triangulate_and_trim(&mut points, &[], false)
            .unwrap();
        for t in &tris {
            let c = Point::new(
                (points[t[0]].x + points[t[1]].x + points[t[2]].x) / 3.0,
                (points[t[0]].y + points[t[1]].y + points[t[2]].y) / 3.0,
            );
            assert!(
                !(c.x > 0.5 && c.y > 0.5),
                "triangle centroid {c:?} lies in the notch"
            );
        }
    }

    #[test]
    fn constrained_edge_survives() {
        let domain = square_domain();
        let projection = Projection::for_extent(&domain.extent());
        let eliminator = Eliminator {
            domain: &domain,
            projection: &projection,
            geps: 1e-8,
            n_fixed: 2,
        };
        let mut points = vec![Point::new(0.15, 0.35), Point::new(0.85, 0.4)];
        points.extend(grid_points(3));
        dedup_points(&mut points);
        let tris = eliminator
            .triangulate_and_trim(&mut points, &[(0, 1)], false)
            .unwrap();
        assert!(tris
            .iter()
            .any(|t| t.contains(&0) && t.contains(&1)));
    }

    #[test]
    fn fixed_edge_constrains_without_clipping() {
        let domain = square_domain();
        let projection = Projection::for_extent(&domain.extent());
        let eliminator = Eliminator {
            domain: &domain,
            projection: &projection,
            geps: 1e-8,
            n_fixed: 2,
        };
        let mut points = vec![Point::new(0.15, 0.35), Point::new(0.85, 0.4)];
        points.extend(grid_points(3));
        dedup_points(&mut points);

        let mut free_points = points.clone();
        let free = eliminator
            .triangulate_and_trim(&mut free_points, &[], false)
            .unwrap();
        let tris = eliminator
            .triangulate_and_trim(&mut points, &[(0, 1)], false)
            .unwrap();

        // The single open edge reshapes triangles around it; it must not
        // shrink coverage to a sliver of the domain.
        assert!(
            tris.len() + 2 >= free.len(),
            "constrained {} vs unconstrained {}",
            tris.len(),
            free.len()
        );
        assert!(tris.iter().any(|t| t.contains(&0) && t.contains(&1)));
    }

    #[test]
    fn empty_interior_is_an_error() {
        let domain = square_domain();
        let projection = Projection::for_extent(&domain.extent());
        let eliminator = Eliminator {
            domain: &domain,
            projection: &projection,
            geps: 1e-8,
            n_fixed: 0,
        };
        // All points outside the domain.
        let mut points = vec![
            Point::new(2.0, 2.0),
            Point::new(3.0, 2.0),
            Point::new(2.0, 3.0),
        ];
        assert!(matches!(
            eliminator.triangulate_and_trim(&mut points, &[], false),
            Err(MeshError::EmptyTriangulation)
        ));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ];
        dedup_points(&mut pts);
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0], Point::new(0.0, 0.0));
    }
}
