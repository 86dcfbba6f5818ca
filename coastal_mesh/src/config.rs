//! Mesher configuration.
//!
//! All construction options live in one immutable struct; cross-field
//! constraints are checked in a single validation step that reports every
//! violation at once instead of failing on the first.

use log::warn;

use crate::cleanup::CleanupOptions;
use crate::density::DensityField;
use crate::domain::Domain;
use crate::error::{MeshError, Result};
use crate::geometry::Point;

/// Options controlling a mesh-generation run.
pub struct MeshConfig {
    /// Iteration cap for the relaxation loop. `None` falls back to 100
    /// with a warning.
    pub max_iterations: Option<usize>,
    /// Iterations between progress reports and checkpoints. `None` falls
    /// back to 5 with a warning.
    pub report_interval: Option<usize>,
    /// Memory budget for the initial-distribution lattice, in megabytes.
    pub memory_limit_mb: usize,
    /// Seed for the rejection-sampling stream.
    pub seed: u64,
    /// Raw fixed points that must appear verbatim in the output.
    pub fixed_points: Vec<Point>,
    /// Raw fixed edges as index pairs into `fixed_points`.
    pub fixed_edges: Vec<(usize, usize)>,
    /// Pre-existing point set (e.g. from a checkpoint). When present the
    /// initial distribution is skipped and the mesh-improvement cadence
    /// drops to every 10 iterations.
    pub initial_points: Option<Vec<Point>>,
    /// Hand the terminal mesh to the topology cleaner.
    pub cleanup: bool,
    /// Options forwarded to the cleaner when `cleanup` is set.
    pub cleanup_options: CleanupOptions,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            report_interval: None,
            memory_limit_mb: 1024,
            seed: 0,
            fixed_points: Vec::new(),
            fixed_edges: Vec::new(),
            initial_points: None,
            cleanup: true,
            cleanup_options: CleanupOptions::default(),
        }
    }
}

impl MeshConfig {
    /// Checks the configuration against the domain and density field,
    /// collecting every violation.
    pub fn validate(&self, domain: &Domain, density: &DensityField) -> Result<()> {
        let mut violations = domain.violations();
        if !domain.boxes.is_empty() && density.len() != domain.boxes.len() {
            violations.push(format!(
                "density field has {} sizer(s) for {} box(es)",
                density.len(),
                domain.boxes.len()
            ));
        }
        if self.memory_limit_mb == 0 {
            violations.push("memory limit must be positive".to_string());
        }
        for &(a, b) in &self.fixed_edges {
            let count = self.fixed_points.len();
            if a >= count || b >= count {
                violations.push(format!(
                    "fixed edge ({a}, {b}) references a point index out of range (count {count})"
                ));
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(MeshError::InvalidConfig { violations })
        }
    }

    /// Iteration cap, defaulting to 100 with a warning.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations.unwrap_or_else(|| {
            warn!("no iteration cap supplied, defaulting to 100");
            100
        })
    }

    /// Reporting interval, defaulting to 5 with a warning.
    pub fn report_interval(&self) -> usize {
        match self.report_interval {
            Some(n) if n > 0 => n,
            _ => {
                warn!("no reporting interval supplied, defaulting to 5");
                5
            }
        }
    }
}
