//! Unstructured triangular mesh generation over geographic domains.
//!
//! Given one or more nested boundary polygons, a desired edge-length
//! field, and optional fixed points/edges, the crate distributes an
//! initial point cloud and relaxes it with the iterative engine in
//! [`relax`] until triangle quality plateaus or an iteration cap is hit.

pub mod boundary;
pub mod cleanup;
pub mod config;
pub mod connectivity;
pub mod constraints;
pub mod density;
pub mod distribution;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod io;
pub mod mesh;
pub mod projection;
pub mod quality;
pub mod relax;
pub mod triangulate;

pub use cleanup::{CleanupOptions, TopologyCleaner};
pub use config::MeshConfig;
pub use density::{ConstantSizer, DensityField, EdgeSizer};
pub use domain::{Domain, NestBox};
pub use error::{MeshError, Result};
pub use geometry::Point;
pub use mesh::Mesh;
pub use projection::Projection;
pub use quality::QualityRow;
pub use relax::{generate, MeshOutput, RelaxationEngine, Termination};
