//! Geometry primitives used by the tracker.
//!
//! The tracker is shape-agnostic: anything implementing [`Area`] can be
//! watched. Two shapes ship with the crate:
//!
//! - [`Circle`] - supports boundary slack via radius expansion
//! - [`BoundingBox`] - a lat/lon rectangle, no expansion
//!
//! # Example
//!
//! ```
//! use areawatch::geometry::{Area, Circle, Position, PositionTime};
//!
//! let harbour = Position::new(55.6761, 12.5683).unwrap();
//! let area = Circle::geodesic(harbour, 2_000.0).unwrap();
//!
//! let report = PositionTime::from_coords(55.68, 12.57, 1_000).unwrap();
//! assert!(area.contains(report.position()));
//! ```

mod area;
mod position;

use thiserror::Error;

pub use area::{Area, BoundingBox, Circle, CoordinateSystem, EARTH_RADIUS_METERS};
pub use position::{Position, PositionTime};

/// Errors raised when constructing geometry values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Latitude is not finite or outside ±90°.
    #[error("Invalid latitude: {0} (must be within -90..=90)")]
    InvalidLatitude(f64),

    /// Longitude is not finite or outside ±180°.
    #[error("Invalid longitude: {0} (must be within -180..=180)")]
    InvalidLongitude(f64),

    /// Radius is negative or not finite.
    #[error("Invalid radius: {0}")]
    InvalidRadius(f64),

    /// Bounding box minimum lies north or east of its maximum.
    #[error("Inverted bounds: min {min} is not south-west of max {max}")]
    InvertedBounds { min: String, max: String },
}
