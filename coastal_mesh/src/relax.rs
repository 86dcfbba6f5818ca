//! The iterative mesh-relaxation engine.
//!
//! Alternates constrained Delaunay retriangulation, spring-like force
//! relaxation of node positions, periodic topology edits, and boundary
//! re-projection until the triangle quality plateaus or the iteration cap
//! is reached. Both exits are success: each runs one extra elimination
//! pass before handing the mesh on.

use std::collections::HashSet;

use log::{debug, info};

use crate::boundary::project_onto_boundary;
use crate::cleanup::{dedup_mesh, normalize_winding, TopologyCleaner};
use crate::config::MeshConfig;
use crate::connectivity::{prune_candidates, unique_bars};
use crate::constraints::FixedConstraints;
use crate::density::DensityField;
use crate::distribution::InitialDistribution;
use crate::domain::Domain;
use crate::error::{MeshError, Result};
use crate::geometry::{distance, great_circle_distance, Point, METERS_PER_DEGREE};
use crate::io::CheckpointSink;
use crate::mesh::Mesh;
use crate::projection::Projection;
use crate::quality::{measure, QualityRow};
use crate::triangulate::{dedup_points, Eliminator};

/// Retriangulate when the largest displacement since the last
/// triangulation exceeds this fraction of the finest spacing.
const RETRIANGULATION_TOL: f64 = 0.1;
/// Explicit pseudo-time step for the position update.
const TIME_STEP: f64 = 0.1;
/// Global ratio of median actual to median target bar length.
const FORCE_SCALE: f64 = 1.2;
/// Iterations between quality-plateau checks.
const PLATEAU_WINDOW: usize = 10;
/// Plateau threshold on the mean − 3σ quality.
const PLATEAU_TOL: f64 = 0.01;
/// Bars shorter than this (normalized) get an endpoint deleted.
const SHORT_BAR: f64 = 0.5;
/// Bars longer than this (normalized) get bisected.
const LONG_BAR: f64 = 2.0;

/// Which exit path ended the loop. Both are success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The mean − 3σ quality stopped improving.
    QualityPlateau,
    /// The configured iteration cap was reached.
    IterationCap,
}

/// Result of a mesh-generation run.
#[derive(Debug)]
pub struct MeshOutput {
    pub mesh: Mesh,
    /// One quality row per completed iteration, plus the cleaner's row
    /// when cleanup ran.
    pub history: Vec<QualityRow>,
    pub termination: Termination,
}

/// The relaxation loop and its state.
pub struct RelaxationEngine<'a> {
    domain: &'a Domain,
    density: &'a DensityField,
    projection: Projection,
    fixed: FixedConstraints,
    points: Vec<Point>,
    triangles: Vec<[usize; 3]>,
    bars: Vec<(usize, usize)>,
    history: Vec<QualityRow>,
    /// Finest target spacing over all boxes, meters.
    h0: f64,
    /// Interior tolerance for triangle elimination, degrees.
    geps: f64,
    improvement_interval: usize,
    max_iterations: usize,
    report_interval: usize,
    needs_retriangulation: bool,
    /// Planar positions at the last retriangulation, for the gate.
    planar_ref: Vec<Point>,
    checkpoint: Option<&'a dyn CheckpointSink>,
}

impl<'a> RelaxationEngine<'a> {
    /// Validates the configuration, loads constraints, and seeds the point
    /// cloud (initial distribution, or the supplied restart points).
    pub fn new(
        domain: &'a Domain,
        density: &'a DensityField,
        config: &MeshConfig,
    ) -> Result<Self> {
        config.validate(domain, density)?;
        let fixed = FixedConstraints::load(
            config.fixed_points.clone(),
            config.fixed_edges.clone(),
            domain,
        )?;
        let projection = Projection::for_extent(&domain.extent());
        let h0 = domain.finest_spacing();
        let geps = 1e-3 * h0 / METERS_PER_DEGREE;

        let mut points = fixed.points.clone();
        let improvement_interval = match &config.initial_points {
            Some(restart) => {
                info!("restarting from {} supplied points", restart.len());
                points.extend_from_slice(restart);
                10
            }
            None => {
                let cloud = InitialDistribution {
                    memory_limit_mb: config.memory_limit_mb,
                    seed: config.seed,
                }
                .generate(domain, density);
                info!("initial distribution: {} points", cloud.len());
                points.extend(cloud);
                5
            }
        };

        Ok(Self {
            domain,
            density,
            projection,
            fixed,
            points,
            triangles: Vec::new(),
            bars: Vec::new(),
            history: Vec::new(),
            h0,
            geps,
            improvement_interval,
            max_iterations: config.max_iterations(),
            report_interval: config.report_interval(),
            needs_retriangulation: true,
            planar_ref: Vec::new(),
            checkpoint: None,
        })
    }

    /// Attaches a periodic checkpoint sink.
    pub fn with_checkpoint_sink(mut self, sink: &'a dyn CheckpointSink) -> Self {
        self.checkpoint = Some(sink);
        self
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Filtered fixed points, occupying the head of the point set.
    pub fn fixed_points(&self) -> &[Point] {
        &self.fixed.points
    }

    /// Runs the loop to termination and returns the mesh after the final
    /// elimination pass.
    pub fn run(&mut self) -> Result<MeshOutput> {
        let n_fixed = self.fixed.len();
        let mut it = 0usize;

        let termination = if self.max_iterations == 0 {
            Termination::IterationCap
        } else {
            loop {
                // Phase 1: retriangulate on demand.
                if self.needs_retriangulation
                    || self.normalized_displacement() > RETRIANGULATION_TOL
                {
                    self.retriangulate()?;
                }

                // Phase 2: measure quality.
                let planar = self.projection.forward_all(&self.points);
                let (_, row) = measure(&planar, &self.triangles);
                self.history.push(row);

                if (it + 1) % self.report_interval == 0 {
                    info!(
                        "iteration {}: {} points, {} triangles, quality mean {:.3} min {:.3}",
                        it + 1,
                        self.points.len(),
                        self.triangles.len(),
                        row.mean,
                        row.min
                    );
                    if let Some(sink) = self.checkpoint {
                        sink.save(
                            it + 1,
                            &Mesh::new(self.points.clone(), self.triangles.clone()),
                        )?;
                    }
                }

                // Phase 3: quality-plateau exit.
                if (it + 1) >= PLATEAU_WINDOW && (it + 1) % PLATEAU_WINDOW == 0 {
                    let prev = self.history[self.history.len() - PLATEAU_WINDOW].lower;
                    if (row.lower - prev).abs() < PLATEAU_TOL {
                        break Termination::QualityPlateau;
                    }
                }

                // Phase 4: bar forces.
                let (forces, ratios) = self.bar_forces(&planar)?;

                // Phase 5: periodic topology edits; such an iteration does
                // no position update.
                if (it + 1) % self.improvement_interval == 0 {
                    self.improve_topology(&ratios);
                    self.needs_retriangulation = true;
                    it += 1;
                    continue;
                }

                // Phase 6: move points.
                let mut planar = planar;
                for i in n_fixed..planar.len() {
                    planar[i].x += TIME_STEP * forces[i].0;
                    planar[i].y += TIME_STEP * forces[i].1;
                    self.points[i] = self.projection.inverse(planar[i]);
                }

                // Phase 7: pull escapees back to the boundary.
                project_onto_boundary(&mut self.points, n_fixed, self.domain);

                // Phase 8: iteration cap.
                if it + 1 >= self.max_iterations {
                    break Termination::IterationCap;
                }
                it += 1;
            }
        };

        info!(
            "relaxation finished after {} iteration(s): {:?}",
            self.history.len(),
            termination
        );

        // One extra, final elimination pass on either exit.
        let eliminator = Eliminator {
            domain: self.domain,
            projection: &self.projection,
            geps: self.geps,
            n_fixed,
        };
        dedup_points(&mut self.points);
        self.triangles = eliminator.triangulate_and_trim(&mut self.points, &self.fixed.edges, true)?;

        Ok(MeshOutput {
            mesh: Mesh::new(self.points.clone(), self.triangles.clone()),
            history: self.history.clone(),
            termination,
        })
    }

    /// Largest planar displacement since the last retriangulation,
    /// normalized by the finest spacing.
    fn normalized_displacement(&self) -> f64 {
        if self.planar_ref.len() != self.points.len() {
            return f64::INFINITY;
        }
        let planar = self.projection.forward_all(&self.points);
        planar
            .iter()
            .zip(&self.planar_ref)
            .map(|(a, b)| distance(*a, *b))
            .fold(0.0, f64::max)
            / self.h0
    }

    fn retriangulate(&mut self) -> Result<()> {
        dedup_points(&mut self.points);
        let eliminator = Eliminator {
            domain: self.domain,
            projection: &self.projection,
            geps: self.geps,
            n_fixed: self.fixed.len(),
        };
        self.triangles =
            eliminator.triangulate_and_trim(&mut self.points, &self.fixed.edges, false)?;
        self.bars = unique_bars(&self.triangles);
        self.planar_ref = self.projection.forward_all(&self.points);
        self.needs_retriangulation = false;
        debug!(
            "retriangulated: {} triangles, {} bars",
            self.triangles.len(),
            self.bars.len()
        );
        Ok(())
    }

    /// Net per-node force from every incident bar, plus each bar's
    /// normalized length.
    fn bar_forces(&self, planar: &[Point]) -> Result<(Vec<(f64, f64)>, Vec<f64>)> {
        let lengths: Vec<f64> = self
            .bars
            .iter()
            .map(|&(i, j)| great_circle_distance(self.points[i], self.points[j]))
            .collect();
        let targets: Vec<f64> = self
            .bars
            .iter()
            .map(|&(i, j)| {
                let mid = self.points[i].midpoint(self.points[j]);
                self.density.desired_length(self.domain, mid)
            })
            .collect();

        // Rescale targets so the median length ratio matches FORCE_SCALE;
        // keeps the field from uniformly shrinking or growing the mesh.
        let median_len = median(&lengths);
        let median_target = median(&targets);
        if median_target <= 0.0 || median_len <= 0.0 {
            return Err(MeshError::Degenerate(
                "non-positive median bar length".to_string(),
            ));
        }
        let rescale = FORCE_SCALE * median_len / median_target;

        let mut forces = vec![(0.0, 0.0); planar.len()];
        let mut ratios = Vec::with_capacity(self.bars.len());
        for (k, &(i, j)) in self.bars.iter().enumerate() {
            let target = targets[k] * rescale;
            if target <= 0.0 {
                return Err(MeshError::Degenerate(format!(
                    "zero target length on bar ({i}, {j})"
                )));
            }
            let r = lengths[k] / target;
            ratios.push(r);
            if r <= f64::EPSILON {
                return Err(MeshError::Degenerate(format!(
                    "zero-length bar ({i}, {j})"
                )));
            }
            // Zero at r = 1, repulsive below, mildly attractive then
            // decaying above.
            let r4 = r.powi(4);
            let f = (1.0 - r4) * (-r4).exp() / r;
            let bx = planar[i].x - planar[j].x;
            let by = planar[i].y - planar[j].y;
            forces[i].0 += f * bx;
            forces[i].1 += f * by;
            forces[j].0 -= f * bx;
            forces[j].1 -= f * by;
        }
        for f in forces.iter_mut().take(self.fixed.len()) {
            *f = (0.0, 0.0);
        }
        Ok((forces, ratios))
    }

    /// Deletes low-valence and crowding nodes, bisects over-long bars.
    fn improve_topology(&mut self, ratios: &[f64]) {
        let n_fixed = self.fixed.len();
        let mut doomed: HashSet<usize> =
            prune_candidates(self.points.len(), &self.triangles, n_fixed)
                .into_iter()
                .collect();
        for (k, &(i, j)) in self.bars.iter().enumerate() {
            if ratios[k] < SHORT_BAR {
                if i >= n_fixed {
                    doomed.insert(i);
                }
                if j >= n_fixed {
                    doomed.insert(j);
                }
            }
        }
        // One bisection per over-long bar, regardless of how long it is.
        let inserted: Vec<Point> = self
            .bars
            .iter()
            .enumerate()
            .filter(|&(k, _)| ratios[k] > LONG_BAR)
            .map(|(_, &(i, j))| self.points[i].midpoint(self.points[j]))
            .collect();

        debug!(
            "topology edit: deleting {} node(s), inserting {}",
            doomed.len(),
            inserted.len()
        );
        if !doomed.is_empty() {
            let mut idx = 0;
            self.points.retain(|_| {
                let keep = !doomed.contains(&idx);
                idx += 1;
                keep
            });
        }
        self.points.extend(inserted);
        // Triangles and bars are stale until the forced retriangulation.
        self.triangles.clear();
        self.bars.clear();
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Runs the whole pipeline: relaxation, post-loop cleanup (or plain
/// deduplication), and winding normalization.
pub fn generate(
    domain: &Domain,
    density: &DensityField,
    config: &MeshConfig,
    cleaner: Option<&dyn TopologyCleaner>,
    checkpoints: Option<&dyn CheckpointSink>,
) -> Result<MeshOutput> {
    let mut engine = RelaxationEngine::new(domain, density, config)?;
    if let Some(sink) = checkpoints {
        engine = engine.with_checkpoint_sink(sink);
    }
    let mut output = engine.run()?;

    match (config.cleanup, cleaner) {
        (true, Some(cleaner)) => {
            let (mesh, row) = cleaner.clean(
                output.mesh,
                &config.cleanup_options,
                engine.fixed_points(),
            );
            output.mesh = mesh;
            output.history.push(row);
        }
        _ => {
            // Millimeter-scale merge: collapses only coincident points.
            output.mesh = dedup_mesh(output.mesh, engine.projection(), 1e-3);
        }
    }
    normalize_winding(&mut output.mesh, engine.projection());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::CleanupOptions;
    use crate::geometry::polygon_area;

    fn square_domain(side_deg: f64, h0: f64) -> Domain {
        Domain::single(
            vec![
                Point::new(0.0, 0.0),
                Point::new(side_deg, 0.0),
                Point::new(side_deg, side_deg),
                Point::new(0.0, side_deg),
            ],
            Vec::new(),
            h0,
        )
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn square_domain_terminates_by_plateau() {
        let h0 = 4_000.0;
        let domain = square_domain(0.4, h0);
        let density = DensityField::constant(h0);
        let config = MeshConfig {
            max_iterations: Some(200),
            report_interval: Some(50),
            seed: 3,
            cleanup: false,
            ..Default::default()
        };
        let output = generate(&domain, &density, &config, None, None).unwrap();
        assert_eq!(output.termination, Termination::QualityPlateau);
        assert!(output.history.len() < 200);
        let last = output.history.last().unwrap();
        assert!(last.mean > 0.9, "mean quality {:.3}", last.mean);
        for t in &output.mesh.triangles {
            let c = Point::new(
                (output.mesh.points[t[0]].x
                    + output.mesh.points[t[1]].x
                    + output.mesh.points[t[2]].x)
                    / 3.0,
                (output.mesh.points[t[0]].y
                    + output.mesh.points[t[1]].y
                    + output.mesh.points[t[2]].y)
                    / 3.0,
            );
            assert!(domain.signed_distance(0, c) < 0.0);
        }
    }

    #[test]
    fn fixed_points_survive_bit_identical() {
        let h0 = 5_000.0;
        let domain = square_domain(0.4, h0);
        let density = DensityField::constant(h0);
        let fixed = vec![Point::new(0.2, 0.2), Point::new(0.25, 0.21)];
        let config = MeshConfig {
            max_iterations: Some(40),
            report_interval: Some(50),
            fixed_points: fixed.clone(),
            cleanup: false,
            ..Default::default()
        };
        let output = generate(&domain, &density, &config, None, None).unwrap();
        assert_eq!(&output.mesh.points[..2], &fixed[..]);
    }

    #[test]
    fn output_winding_is_ccw() {
        let h0 = 6_000.0;
        let domain = square_domain(0.3, h0);
        let density = DensityField::constant(h0);
        let config = MeshConfig {
            max_iterations: Some(30),
            report_interval: Some(50),
            cleanup: false,
            ..Default::default()
        };
        let output = generate(&domain, &density, &config, None, None).unwrap();
        let projection = Projection::for_extent(&domain.extent());
        let planar = projection.forward_all(&output.mesh.points);
        for t in &output.mesh.triangles {
            assert!(polygon_area(&[planar[t[0]], planar[t[1]], planar[t[2]]]) > 0.0);
        }
    }

    #[test]
    fn zero_iteration_cap_skips_relaxation() {
        let h0 = 6_000.0;
        let domain = square_domain(0.3, h0);
        let density = DensityField::constant(h0);
        let config = MeshConfig {
            max_iterations: Some(0),
            report_interval: Some(5),
            cleanup: false,
            ..Default::default()
        };
        let output = generate(&domain, &density, &config, None, None).unwrap();
        assert_eq!(output.termination, Termination::IterationCap);
        assert!(output.history.is_empty());
        assert!(!output.mesh.triangles.is_empty());
    }

    #[test]
    fn cleaner_row_appended_to_history() {
        struct NoopCleaner;
        impl TopologyCleaner for NoopCleaner {
            fn clean(
                &self,
                mesh: Mesh,
                _options: &CleanupOptions,
                _fixed: &[Point],
            ) -> (Mesh, QualityRow) {
                let row = QualityRow {
                    mean: 1.0,
                    lower: 1.0,
                    min: 1.0,
                };
                (mesh, row)
            }
        }
        let h0 = 6_000.0;
        let domain = square_domain(0.3, h0);
        let density = DensityField::constant(h0);
        let config = MeshConfig {
            max_iterations: Some(20),
            report_interval: Some(50),
            cleanup: true,
            ..Default::default()
        };
        let output = generate(&domain, &density, &config, Some(&NoopCleaner), None).unwrap();
        let last = output.history.last().unwrap();
        assert_eq!(last.mean, 1.0);
    }

    #[test]
    fn restart_skips_initial_distribution() {
        let h0 = 5_000.0;
        let domain = square_domain(0.3, h0);
        let density = DensityField::constant(h0);
        let seed_run = MeshConfig {
            max_iterations: Some(30),
            report_interval: Some(50),
            cleanup: false,
            ..Default::default()
        };
        let first = generate(&domain, &density, &seed_run, None, None).unwrap();

        let restart = MeshConfig {
            max_iterations: Some(5),
            report_interval: Some(50),
            initial_points: Some(first.mesh.points.clone()),
            cleanup: false,
            ..Default::default()
        };
        let second = generate(&domain, &density, &restart, None, None).unwrap();
        assert_eq!(second.termination, Termination::IterationCap);
        // The restarted cloud should stay in the same ballpark.
        let ratio = second.mesh.points.len() as f64 / first.mesh.points.len() as f64;
        assert!((0.8..=1.2).contains(&ratio));
    }
}
