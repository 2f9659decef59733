//! Areas of interest and their containment tests.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{GeometryError, Position};

/// Mean earth radius (IUGG) used for great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// How distances between two positions are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Great-circle distance in metres on a spherical earth.
    #[default]
    Geodesic,
    /// Euclidean distance on the raw (latitude, longitude) values.
    ///
    /// Distances and radii are then expressed in degrees. Handy for
    /// projected data and for reasoning about small synthetic scenarios.
    Planar,
}

impl CoordinateSystem {
    /// Distance between two positions in this system's units.
    pub fn distance(&self, a: &Position, b: &Position) -> f64 {
        match self {
            CoordinateSystem::Geodesic => haversine_meters(a, b),
            CoordinateSystem::Planar => {
                let dlat = a.latitude() - b.latitude();
                let dlon = a.longitude() - b.longitude();
                (dlat * dlat + dlon * dlon).sqrt()
            }
        }
    }
}

fn haversine_meters(a: &Position, b: &Position) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude() - a.longitude()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// A geographic area of interest.
///
/// The tracker only needs a containment predicate. Shapes that can grow
/// outward by a fixed distance override [`Area::expanded_by`]; that is what
/// makes boundary slack possible for a subscription.
pub trait Area: fmt::Debug + Send + Sync {
    /// True if the position lies inside (or on the boundary of) this area.
    fn contains(&self, position: &Position) -> bool;

    /// Short name of the shape kind, used in error messages.
    fn kind(&self) -> &'static str;

    /// A copy of this area grown outward by `slack`.
    ///
    /// Returns `None` when the shape has no defined expansion.
    fn expanded_by(&self, _slack: f64) -> Option<Arc<dyn Area>> {
        None
    }
}

/// A circle around a center point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    center: Position,
    radius: f64,
    system: CoordinateSystem,
}

impl Circle {
    /// Create a circle.
    ///
    /// `radius` is in metres for [`CoordinateSystem::Geodesic`] and in degrees
    /// for [`CoordinateSystem::Planar`].
    pub fn new(
        center: Position,
        radius: f64,
        system: CoordinateSystem,
    ) -> Result<Self, GeometryError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(GeometryError::InvalidRadius(radius));
        }
        Ok(Self {
            center,
            radius,
            system,
        })
    }

    /// Create a geodesic circle with the radius in metres.
    pub fn geodesic(center: Position, radius_meters: f64) -> Result<Self, GeometryError> {
        Self::new(center, radius_meters, CoordinateSystem::Geodesic)
    }

    pub fn center(&self) -> &Position {
        &self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.system
    }

    /// Same center and coordinate system, different radius.
    pub fn with_radius(&self, radius: f64) -> Result<Self, GeometryError> {
        Self::new(self.center, radius, self.system)
    }
}

impl Area for Circle {
    fn contains(&self, position: &Position) -> bool {
        self.system.distance(&self.center, position) <= self.radius
    }

    fn kind(&self) -> &'static str {
        "circle"
    }

    fn expanded_by(&self, slack: f64) -> Option<Arc<dyn Area>> {
        let grown = self.with_radius(self.radius + slack).ok()?;
        Some(Arc::new(grown))
    }
}

/// An axis-aligned latitude/longitude rectangle.
///
/// Containment is inclusive on all four edges. Boxes crossing the
/// antimeridian are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum (southernmost) latitude
    pub min_lat: f64,
    /// Maximum (northernmost) latitude
    pub max_lat: f64,
    /// Minimum (westernmost) longitude
    pub min_lon: f64,
    /// Maximum (easternmost) longitude
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Self, GeometryError> {
        let min = Position::new(min_lat, min_lon)?;
        let max = Position::new(max_lat, max_lon)?;
        if min.latitude() > max.latitude() || min.longitude() > max.longitude() {
            return Err(GeometryError::InvertedBounds {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }
}

impl Area for BoundingBox {
    fn contains(&self, position: &Position) -> bool {
        (self.min_lat..=self.max_lat).contains(&position.latitude())
            && (self.min_lon..=self.max_lon).contains(&position.longitude())
    }

    fn kind(&self) -> &'static str {
        "bounding box"
    }
}
