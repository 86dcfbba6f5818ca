//! Planar and spherical geometry primitives shared by the mesher.

/// Mean Earth radius used for great-circle lengths and projections, in meters.
pub const EARTH_RADIUS: f64 = 6_378_206.4;

/// Length of one degree of latitude on the meshing sphere, in meters.
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS * std::f64::consts::PI / 180.0;

/// Representation of a 2D point. For geographic data `x` is longitude and
/// `y` is latitude, both in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the midpoint between this point and `other`.
    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Returns the Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Returns the great-circle distance in meters between two geographic
/// points given as (longitude, latitude) degrees.
pub fn great_circle_distance(a: Point, b: Point) -> f64 {
    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.x - a.x).to_radians();
    let s = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * s.sqrt().min(1.0).asin()
}

/// Returns the signed area of the polygon defined by `poly` using the
/// shoelace formula. Counter-clockwise rings have positive area.
pub fn polygon_area(poly: &[Point]) -> f64 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        sum += (poly[j].x + poly[i].x) * (poly[j].y - poly[i].y);
        j = i;
    }
    -sum / 2.0
}

/// Returns `true` if point `p` is inside the polygon defined by `poly` using
/// the ray casting algorithm.
pub fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    let mut inside = false;
    if poly.is_empty() {
        return inside;
    }
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let pi = poly[i];
        let pj = poly[j];
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Returns the distance from `p` to the segment `a`-`b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len2 = abx * abx + aby * aby;
    if len2 <= f64::EPSILON {
        return distance(p, a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len2).clamp(0.0, 1.0);
    distance(p, Point::new(a.x + t * abx, a.y + t * aby))
}

/// Axis-aligned extent of a point set.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Computes the extent of `points`. Returns a degenerate box at the
    /// origin for an empty slice.
    pub fn from_points(points: &[Point]) -> Self {
        let mut bbox = Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for p in points {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        if points.is_empty() {
            return Self {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 0.0,
                max_y: 0.0,
            };
        }
        bbox
    }

    /// Returns `true` if `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Returns `true` if `p` lies inside or on the box.
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Returns the closed counter-clockwise ring of the box corners.
    pub fn ring(&self) -> Vec<Point> {
        vec![
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
            Point::new(self.min_x, self.min_y),
        ]
    }

    /// Center of the box.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}
