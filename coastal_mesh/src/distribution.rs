//! Rejection-sampled initial point distribution.
//!
//! Candidates are laid out on a staggered lattice at the box's minimum
//! spacing, block by block along the longitude axis so peak memory stays
//! under the configured budget, then thinned so the surviving density
//! matches the desired edge-length field.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::density::DensityField;
use crate::domain::Domain;
use crate::geometry::{Point, METERS_PER_DEGREE};

const BYTES_PER_CANDIDATE: usize = std::mem::size_of::<Point>();

/// Staggered-lattice candidate generator with probabilistic thinning.
pub struct InitialDistribution {
    /// Peak candidate-buffer budget, in megabytes.
    pub memory_limit_mb: usize,
    /// Seed for the rejection stream; fixed seed gives a reproducible cloud.
    pub seed: u64,
}

impl Default for InitialDistribution {
    fn default() -> Self {
        Self {
            memory_limit_mb: 1024,
            seed: 0,
        }
    }
}

impl InitialDistribution {
    /// Generates the initial point cloud over every box of `domain`.
    pub fn generate(&self, domain: &Domain, density: &DensityField) -> Vec<Point> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut out = Vec::new();
        for box_index in 0..domain.boxes.len() {
            self.fill_box(domain, density, box_index, &mut rng, &mut out);
        }
        out
    }

    fn fill_box(
        &self,
        domain: &Domain,
        density: &DensityField,
        box_index: usize,
        rng: &mut StdRng,
        out: &mut Vec<Point>,
    ) {
        let nb = &domain.boxes[box_index];
        let bbox = nb.bbox();
        let h0 = nb.h0;
        let row_step_deg = h0 * 3f64.sqrt() / 2.0 / METERS_PER_DEGREE;
        if row_step_deg <= 0.0 {
            return;
        }

        // Equilateral-packing estimate of the candidate count, used only to
        // size the longitude blocks against the memory budget.
        let mid_lat = bbox.center().y.to_radians();
        let width_m = (bbox.max_x - bbox.min_x) * METERS_PER_DEGREE * mid_lat.cos().abs();
        let height_m = (bbox.max_y - bbox.min_y) * METERS_PER_DEGREE;
        let estimate = (2.0 / 3f64.sqrt()) * width_m * height_m / (h0 * h0);
        let budget = (self.memory_limit_mb.max(1)) * 1024 * 1024;
        let nblocks = ((estimate * BYTES_PER_CANDIDATE as f64 / budget as f64).ceil() as usize)
            .max(1);
        debug!(
            "box {box_index}: ~{:.0} lattice candidates in {nblocks} block(s)",
            estimate
        );

        let block_width = (bbox.max_x - bbox.min_x) / nblocks as f64;
        for block in 0..nblocks {
            let lon_lo = bbox.min_x + block as f64 * block_width;
            let lon_hi = lon_lo + block_width;
            let mut candidates = Vec::new();

            let mut row = 0usize;
            loop {
                let lat = bbox.min_y + row as f64 * row_step_deg;
                if lat > bbox.max_y {
                    break;
                }
                let cos_lat = lat.to_radians().cos().abs().max(1e-6);
                let col_step_deg = h0 / (METERS_PER_DEGREE * cos_lat);
                let offset = if row % 2 == 1 { col_step_deg / 2.0 } else { 0.0 };
                let mut lon = lon_lo + offset;
                while lon <= lon_hi {
                    candidates.push(Point::new(lon, lat));
                    lon += col_step_deg;
                }
                row += 1;
            }

            for p in candidates {
                if nb.signed_distance(p) >= 0.0 {
                    continue;
                }
                // Inner boxes supply their own, finer cloud.
                if density.owning_box(domain, p) != box_index {
                    continue;
                }
                let h_local = density.desired_length_in(box_index, p).max(h0);
                let accept = (h0 / h_local).powi(2);
                if rng.random::<f64>() < accept {
                    out.push(p);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::DensityField;
    use crate::domain::Domain;
    use crate::geometry::polygon_area;

    fn square_domain(side_deg: f64, h0: f64) -> Domain {
        let outer = vec![
            Point::new(0.0, 0.0),
            Point::new(side_deg, 0.0),
            Point::new(side_deg, side_deg),
            Point::new(0.0, side_deg),
        ];
        Domain::single(outer, Vec::new(), h0)
    }

    #[test]
    fn count_matches_packing_estimate() {
        let h0 = 2_000.0;
        let domain = square_domain(0.5, h0);
        let density = DensityField::constant(h0);
        let dist = InitialDistribution {
            seed: 42,
            ..Default::default()
        };
        let points = dist.generate(&domain, &density);

        let area_m2 = polygon_area(&domain.boxes[0].outer).abs()
            * METERS_PER_DEGREE
            * METERS_PER_DEGREE
            * (0.25f64).to_radians().cos();
        let expected = (2.0 / 3f64.sqrt()) * area_m2 / (h0 * h0);
        let ratio = points.len() as f64 / expected;
        assert!(
            (0.7..1.3).contains(&ratio),
            "got {} points, expected about {expected:.0}",
            points.len()
        );
    }

    #[test]
    fn all_points_inside_domain() {
        let domain = square_domain(0.2, 1_500.0);
        let density = DensityField::constant(1_500.0);
        let points = InitialDistribution::default().generate(&domain, &density);
        assert!(!points.is_empty());
        for p in &points {
            assert!(domain.signed_distance(0, *p) < 0.0);
        }
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let domain = square_domain(0.2, 1_500.0);
        let density = DensityField::constant(3_000.0);
        let dist = InitialDistribution {
            seed: 7,
            ..Default::default()
        };
        let a = dist.generate(&domain, &density);
        let b = dist.generate(&domain, &density);
        assert_eq!(a, b);
    }

    #[test]
    fn graded_field_thins_where_coarse() {
        let domain = square_domain(0.5, 1_000.0);
        let fine = InitialDistribution {
            seed: 1,
            ..Default::default()
        }
        .generate(&domain, &DensityField::constant(1_000.0));
        let coarse = InitialDistribution {
            seed: 1,
            ..Default::default()
        }
        .generate(&domain, &DensityField::constant(4_000.0));
        assert!(coarse.len() < fine.len() / 4);
    }
}
