//! Post-loop mesh handling: the topology-cleaner seam, point/triangle
//! deduplication, and winding normalization.

use std::collections::HashMap;

use crate::geometry::{polygon_area, Point};
use crate::mesh::Mesh;
use crate::projection::Projection;
use crate::quality::QualityRow;

/// Options forwarded to the external topology cleaner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanupOptions {
    /// Delete elements with bad boundary connectivity.
    pub delete_bad_boundary: bool,
    /// Run direct Laplacian-style smoothing during cleanup.
    pub direct_smooth: bool,
    /// Target maximum node valence.
    pub max_valence: usize,
    /// Disjoint regions below this fraction of the total area are deleted.
    pub disjoint_area_fraction: f64,
    /// Iterations between progress reports inside the cleaner.
    pub report_interval: usize,
    /// Whether the cleaner should work in the planar frame.
    pub project: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            delete_bad_boundary: true,
            direct_smooth: true,
            max_valence: 9,
            disjoint_area_fraction: 0.05,
            report_interval: 5,
            project: true,
        }
    }
}

/// External collaborator that repairs small connectivity, deletes disjoint
/// regions, and renumbers elements. Consumed at the end of the relaxation
/// loop; its internals live outside this crate.
pub trait TopologyCleaner {
    fn clean(
        &self,
        mesh: Mesh,
        options: &CleanupOptions,
        fixed_points: &[Point],
    ) -> (Mesh, QualityRow);
}

/// Merges coincident points (within `tolerance` in the planar frame) and
/// drops collapsed or duplicate triangles. Used when no cleaner is
/// supplied.
pub fn dedup_mesh(mesh: Mesh, projection: &Projection, tolerance: f64) -> Mesh {
    let planar = projection.forward_all(&mesh.points);
    let quantum = tolerance.max(f64::MIN_POSITIVE);
    let mut first: HashMap<(i64, i64), usize> = HashMap::new();
    let mut remap = vec![0usize; mesh.points.len()];
    let mut points = Vec::new();
    for (i, p) in planar.iter().enumerate() {
        let key = (
            (p.x / quantum).round() as i64,
            (p.y / quantum).round() as i64,
        );
        match first.get(&key) {
            Some(&kept) => remap[i] = kept,
            None => {
                first.insert(key, points.len());
                remap[i] = points.len();
                points.push(mesh.points[i]);
            }
        }
    }

    let mut triangles: Vec<[usize; 3]> = mesh
        .triangles
        .iter()
        .map(|t| [remap[t[0]], remap[t[1]], remap[t[2]]])
        .filter(|t| t[0] != t[1] && t[1] != t[2] && t[2] != t[0])
        .collect();
    let mut seen: Vec<[usize; 3]> = triangles
        .iter()
        .map(|t| {
            let mut s = *t;
            s.sort_unstable();
            s
        })
        .collect();
    let mut order: Vec<usize> = (0..triangles.len()).collect();
    order.sort_by_key(|&i| seen[i]);
    seen.sort_unstable();
    let mut keep = vec![true; triangles.len()];
    for w in 0..order.len().saturating_sub(1) {
        if seen[w] == seen[w + 1] {
            keep[order[w + 1]] = false;
        }
    }
    let mut idx = 0;
    triangles.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });

    Mesh::new(points, triangles)
}

/// Flips every clockwise triangle so the whole mesh winds counter-clockwise
/// in the planar frame. Needed because domains crossing the antimeridian
/// can invert orientation under a naive projection.
pub fn normalize_winding(mesh: &mut Mesh, projection: &Projection) {
    let planar = projection.forward_all(&mesh.points);
    for t in &mut mesh.triangles {
        let area = polygon_area(&[planar[t[0]], planar[t[1]], planar[t[2]]]);
        if area < 0.0 {
            t.swap(1, 2);
        }
    }
}
