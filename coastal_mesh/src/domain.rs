//! Domain geometry: nesting boxes and the signed distance field.
//!
//! A domain is one or more nesting boxes, outermost first. Each box carries
//! an outer boundary ring, optional island rings treated as holes, and the
//! minimum edge length for that box. Signed distance is negative inside the
//! wet area, positive outside, with magnitude equal to the distance to the
//! nearest boundary segment (all coordinates in degrees).

use crate::geometry::{point_in_polygon, point_segment_distance, BoundingBox, Point};

/// One nesting box of the meshing domain.
pub struct NestBox {
    /// Outer boundary ring.
    pub outer: Vec<Point>,
    /// Island rings, meshed around rather than across.
    pub islands: Vec<Vec<Point>>,
    /// Minimum desired edge length inside this box, in meters.
    pub h0: f64,
    bbox: BoundingBox,
}

impl NestBox {
    /// Creates a nesting box from its boundary rings and minimum spacing.
    pub fn new(outer: Vec<Point>, islands: Vec<Vec<Point>>, h0: f64) -> Self {
        let bbox = BoundingBox::from_points(&outer);
        Self {
            outer,
            islands,
            h0,
            bbox,
        }
    }

    /// Extent of the outer ring.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Closed ring of the bounding box corners, used for fast membership
    /// pre-tests.
    pub fn bbox_ring(&self) -> Vec<Point> {
        self.bbox.ring()
    }

    /// Returns `true` if `p` lies in the wet area of this box.
    pub fn is_inside(&self, p: Point) -> bool {
        point_in_polygon(p, &self.outer) && !self.islands.iter().any(|isl| point_in_polygon(p, isl))
    }

    fn boundary_distance(&self, p: Point) -> f64 {
        let mut best = f64::INFINITY;
        for ring in std::iter::once(&self.outer).chain(self.islands.iter()) {
            if ring.len() < 2 {
                continue;
            }
            let mut j = ring.len() - 1;
            for i in 0..ring.len() {
                best = best.min(point_segment_distance(p, ring[j], ring[i]));
                j = i;
            }
        }
        best
    }

    /// Signed distance from `p` to the box boundary, negative inside.
    pub fn signed_distance(&self, p: Point) -> f64 {
        let d = self.boundary_distance(p);
        if self.is_inside(p) {
            -d
        } else {
            d
        }
    }
}

/// The full meshing domain: nesting boxes, outermost first.
pub struct Domain {
    pub boxes: Vec<NestBox>,
}

impl Domain {
    pub fn new(boxes: Vec<NestBox>) -> Self {
        Self { boxes }
    }

    /// Convenience constructor for a single-box domain.
    pub fn single(outer: Vec<Point>, islands: Vec<Vec<Point>>, h0: f64) -> Self {
        Self::new(vec![NestBox::new(outer, islands, h0)])
    }

    /// Smallest minimum spacing over all boxes, in meters.
    pub fn finest_spacing(&self) -> f64 {
        self.boxes
            .iter()
            .map(|b| b.h0)
            .fold(f64::INFINITY, f64::min)
    }

    /// Extent of the outermost box.
    pub fn extent(&self) -> BoundingBox {
        self.boxes[0].bbox()
    }

    /// Signed distance evaluated against box `box_index`.
    pub fn signed_distance(&self, box_index: usize, p: Point) -> f64 {
        self.boxes[box_index].signed_distance(p)
    }

    /// Finite-difference gradient of the signed distance at `p`, with
    /// differencing step `step` in degrees.
    pub fn distance_gradient(&self, box_index: usize, p: Point, step: f64) -> (f64, f64) {
        let d0 = self.signed_distance(box_index, p);
        let dx = self.signed_distance(box_index, Point::new(p.x + step, p.y)) - d0;
        let dy = self.signed_distance(box_index, Point::new(p.x, p.y + step)) - d0;
        (dx / step, dy / step)
    }

    /// Collects every structural violation of the domain: empty boundary
    /// rings, non-positive spacing, and inner boxes escaping the outer
    /// box's extent.
    pub fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.boxes.is_empty() {
            violations.push("domain has no nesting boxes".to_string());
            return violations;
        }
        for (i, b) in self.boxes.iter().enumerate() {
            if b.outer.len() < 3 {
                violations.push(format!("box {i}: outer boundary has fewer than 3 points"));
            }
            if !(b.h0 > 0.0) {
                violations.push(format!("box {i}: minimum edge length must be positive"));
            }
            for (k, isl) in b.islands.iter().enumerate() {
                if isl.len() < 3 {
                    violations.push(format!("box {i}: island {k} has fewer than 3 points"));
                }
            }
        }
        let outer = self.boxes[0].bbox();
        for (i, b) in self.boxes.iter().enumerate().skip(1) {
            if !outer.contains(&b.bbox()) {
                violations.push(format!(
                    "box {i}: extent not contained in the outer box's extent"
                ));
            }
        }
        violations
    }
}
