//! Geographic to planar projection context.
//!
//! The relaxation loop moves points in a planar frame measured in meters and
//! converts back to longitude/latitude afterwards. The projection is chosen
//! once, when the engine is constructed, and passed by reference to every
//! component that needs it.

use crate::geometry::{BoundingBox, Point, EARTH_RADIUS};

/// Invertible map between geographic degrees and planar meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Equidistant cylindrical projection about a reference parallel.
    /// Cheap, well conditioned away from the poles, the meshing workhorse.
    EquidistantCylindrical { lon0: f64, lat0: f64 },
    /// Spherical stereographic projection about a reference point, for
    /// domains reaching high latitudes.
    Stereographic { lon0: f64, lat0: f64 },
}

impl Projection {
    /// Picks a projection centered on `bbox`: stereographic when the domain
    /// reaches beyond 85 degrees of latitude, cylindrical otherwise.
    pub fn for_extent(bbox: &BoundingBox) -> Self {
        let c = bbox.center();
        if bbox.max_y.abs() > 85.0 || bbox.min_y.abs() > 85.0 {
            Projection::Stereographic { lon0: c.x, lat0: c.y }
        } else {
            Projection::EquidistantCylindrical { lon0: c.x, lat0: c.y }
        }
    }

    /// Projects a geographic (longitude, latitude) point to planar meters.
    pub fn forward(&self, p: Point) -> Point {
        match *self {
            Projection::EquidistantCylindrical { lon0, lat0 } => Point::new(
                EARTH_RADIUS * (p.x - lon0).to_radians() * lat0.to_radians().cos(),
                EARTH_RADIUS * p.y.to_radians(),
            ),
            Projection::Stereographic { lon0, lat0 } => {
                let lat = p.y.to_radians();
                let lat0 = lat0.to_radians();
                let dlon = (p.x - lon0).to_radians();
                let k = 2.0 * EARTH_RADIUS
                    / (1.0 + lat0.sin() * lat.sin() + lat0.cos() * lat.cos() * dlon.cos());
                Point::new(
                    k * lat.cos() * dlon.sin(),
                    k * (lat0.cos() * lat.sin() - lat0.sin() * lat.cos() * dlon.cos()),
                )
            }
        }
    }

    /// Inverse of [`Projection::forward`].
    pub fn inverse(&self, p: Point) -> Point {
        match *self {
            Projection::EquidistantCylindrical { lon0, lat0 } => Point::new(
                lon0 + (p.x / (EARTH_RADIUS * lat0.to_radians().cos())).to_degrees(),
                (p.y / EARTH_RADIUS).to_degrees(),
            ),
            Projection::Stereographic { lon0, lat0 } => {
                let lat0 = lat0.to_radians();
                let rho = p.x.hypot(p.y);
                if rho <= f64::EPSILON {
                    return Point::new(lon0, lat0.to_degrees());
                }
                let c = 2.0 * (rho / (2.0 * EARTH_RADIUS)).atan();
                let lat = (c.cos() * lat0.sin() + p.y * c.sin() * lat0.cos() / rho).asin();
                let lon = lon0.to_radians()
                    + (p.x * c.sin())
                        .atan2(rho * lat0.cos() * c.cos() - p.y * lat0.sin() * c.sin());
                Point::new(lon.to_degrees(), lat.to_degrees())
            }
        }
    }

    /// Projects a slice of geographic points.
    pub fn forward_all(&self, points: &[Point]) -> Vec<Point> {
        points.iter().map(|&p| self.forward(p)).collect()
    }
}
