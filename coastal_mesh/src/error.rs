//! Error types for mesh construction.

use thiserror::Error;

/// Errors raised while configuring or running the mesher.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Configuration validation failed. Every violation found is listed,
    /// not just the first.
    #[error("invalid configuration:\n  {}", .violations.join("\n  "))]
    InvalidConfig { violations: Vec<String> },

    /// A fixed edge references a point index outside the retained fixed
    /// point set.
    #[error("fixed edge references point {index} but only {count} fixed points exist")]
    FixedEdgeOutOfRange { index: usize, count: usize },

    /// The constrained triangulation backend rejected the input.
    #[error("constrained triangulation failed: {0}")]
    Triangulation(String),

    /// Elimination left no interior triangles. The domain and spacing are
    /// incompatible (e.g. spacing wider than the domain itself).
    #[error("triangulation produced no interior triangles")]
    EmptyTriangulation,

    /// A numeric degeneracy the loop cannot recover from, e.g. a
    /// zero-length bar.
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    /// A geometry input could not be interpreted as a boundary polygon.
    #[error("boundary geometry error: {0}")]
    Boundary(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MeshError>;
