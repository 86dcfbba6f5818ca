//! Re-projection of drifted points onto the domain boundary.

use crate::domain::Domain;
use crate::geometry::Point;

/// Pulls every non-fixed point with positive signed distance back onto the
/// zero level-set with one Newton step along the numerical gradient.
///
/// The differencing step is `sqrt(machine epsilon)`; points whose gradient
/// vanishes (deep inside a corner of the distance field) are left alone
/// rather than divided by zero.
pub fn project_onto_boundary(points: &mut [Point], n_fixed: usize, domain: &Domain) {
    let step = f64::EPSILON.sqrt();
    for p in points.iter_mut().skip(n_fixed) {
        let d = domain.signed_distance(0, *p);
        if d <= 0.0 {
            continue;
        }
        let (gx, gy) = domain.distance_gradient(0, *p, step);
        let g2 = gx * gx + gy * gy;
        if g2 <= f64::EPSILON {
            continue;
        }
        p.x -= d * gx / g2;
        p.y -= d * gy / g2;
    }
}
