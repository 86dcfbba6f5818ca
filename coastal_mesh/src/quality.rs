//! Per-triangle shape quality and aggregate statistics.

use crate::geometry::{polygon_area, Point};

/// One row of the quality history: (mean, mean − 3σ, min) of the
/// per-triangle qualities for a completed iteration.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QualityRow {
    pub mean: f64,
    pub lower: f64,
    pub min: f64,
}

/// Normalized shape quality of the triangle `a`-`b`-`c` in planar
/// coordinates: `4√3·A / (l₁² + l₂² + l₃²)`. Equilateral triangles score
/// 1, degenerate ones 0.
pub fn triangle_quality(a: Point, b: Point, c: Point) -> f64 {
    let area = polygon_area(&[a, b, c]).abs();
    let l2 = (b.x - a.x).powi(2)
        + (b.y - a.y).powi(2)
        + (c.x - b.x).powi(2)
        + (c.y - b.y).powi(2)
        + (a.x - c.x).powi(2)
        + (a.y - c.y).powi(2);
    if l2 <= f64::EPSILON {
        return 0.0;
    }
    4.0 * 3f64.sqrt() * area / l2
}

/// Interior vertex angles of the triangle, in radians.
pub fn triangle_angles(a: Point, b: Point, c: Point) -> [f64; 3] {
    let verts = [a, b, c];
    let mut angles = [0.0; 3];
    for i in 0..3 {
        let p = verts[(i + 2) % 3];
        let q = verts[i];
        let r = verts[(i + 1) % 3];
        let u = (p.x - q.x, p.y - q.y);
        let v = (r.x - q.x, r.y - q.y);
        let lu = u.0.hypot(u.1);
        let lv = v.0.hypot(v.1);
        if lu <= f64::EPSILON || lv <= f64::EPSILON {
            continue;
        }
        let cos = ((u.0 * v.0 + u.1 * v.1) / (lu * lv)).clamp(-1.0, 1.0);
        angles[i] = cos.acos();
    }
    angles
}

/// Qualities of every triangle plus the aggregate row.
pub fn measure(points: &[Point], triangles: &[[usize; 3]]) -> (Vec<f64>, QualityRow) {
    let quals: Vec<f64> = triangles
        .iter()
        .map(|t| triangle_quality(points[t[0]], points[t[1]], points[t[2]]))
        .collect();
    if quals.is_empty() {
        return (
            quals,
            QualityRow {
                mean: 0.0,
                lower: 0.0,
                min: 0.0,
            },
        );
    }
    let n = quals.len() as f64;
    let mean = quals.iter().sum::<f64>() / n;
    let var = quals.iter().map(|q| (q - mean).powi(2)).sum::<f64>() / n;
    let min = quals.iter().copied().fold(f64::INFINITY, f64::min);
    let row = QualityRow {
        mean,
        lower: mean - 3.0 * var.sqrt(),
        min,
    };
    (quals, row)
}
