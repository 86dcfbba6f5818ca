//! Desired edge-length field with nesting-box membership resolution.

use crate::domain::Domain;
use crate::geometry::{point_in_polygon, Point};

/// Desired local edge length, in meters, as a function of geographic
/// position. Implemented by closures and by [`ConstantSizer`].
pub trait EdgeSizer {
    fn desired_length(&self, p: Point) -> f64;
}

impl<F> EdgeSizer for F
where
    F: Fn(Point) -> f64,
{
    fn desired_length(&self, p: Point) -> f64 {
        self(p)
    }
}

/// Uniform target spacing.
pub struct ConstantSizer(pub f64);

impl EdgeSizer for ConstantSizer {
    fn desired_length(&self, _p: Point) -> f64 {
        self.0
    }
}

/// One edge sizer per nesting box, resolved per point by box membership.
pub struct DensityField {
    sizers: Vec<Box<dyn EdgeSizer>>,
}

impl DensityField {
    /// Creates the field. `sizers` must have one entry per domain box,
    /// outermost first.
    pub fn new(sizers: Vec<Box<dyn EdgeSizer>>) -> Self {
        Self { sizers }
    }

    /// Uniform spacing over a single-box domain.
    pub fn constant(h: f64) -> Self {
        Self::new(vec![Box::new(ConstantSizer(h))])
    }

    pub fn len(&self) -> usize {
        self.sizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizers.is_empty()
    }

    /// Index of the box that owns `p`: the innermost box whose bounding
    /// ring contains the point. The outermost box always matches.
    pub fn owning_box(&self, domain: &Domain, p: Point) -> usize {
        for i in (1..domain.boxes.len().min(self.sizers.len())).rev() {
            if point_in_polygon(p, &domain.boxes[i].bbox_ring()) {
                return i;
            }
        }
        0
    }

    /// Desired edge length at `p` from the owning box's sizer.
    pub fn desired_length(&self, domain: &Domain, p: Point) -> f64 {
        self.sizers[self.owning_box(domain, p)].desired_length(p)
    }

    /// Desired edge length at `p` from a specific box's sizer.
    pub fn desired_length_in(&self, box_index: usize, p: Point) -> f64 {
        self.sizers[box_index].desired_length(p)
    }
}
