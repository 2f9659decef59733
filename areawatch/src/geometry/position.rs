//! Positions and timestamped position reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::GeometryError;

/// A geographic coordinate in decimal degrees.
///
/// Construction validates the ranges, so every `Position` held by the
/// tracker is finite and on the globe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    latitude: f64,
    longitude: f64,
}

/// Unvalidated wire form; deserialization goes through [`Position::new`].
#[derive(Deserialize)]
struct RawPosition {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawPosition> for Position {
    type Error = GeometryError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Position::new(raw.latitude, raw.longitude)
    }
}

impl Position {
    /// Create a new position.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidLatitude`] or
    /// [`GeometryError::InvalidLongitude`] if a coordinate is not finite or
    /// outside ±90° / ±180°.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeometryError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeometryError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeometryError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Attach a reporting time to this position.
    pub fn at(self, time_millis: i64) -> PositionTime {
        PositionTime::new(self, time_millis)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat_hem = if self.latitude >= 0.0 { 'N' } else { 'S' };
        let lon_hem = if self.longitude >= 0.0 { 'E' } else { 'W' };
        write!(
            f,
            "{:.5}{} {:.5}{}",
            self.latitude.abs(),
            lat_hem,
            self.longitude.abs(),
            lon_hem
        )
    }
}

/// A position together with the time it was reported.
///
/// Two values are *position-equal* when their coordinates match, regardless
/// of timestamp. Recency is decided by [`PositionTime::time`] alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionTime {
    position: Position,
    /// Reporting time in milliseconds (epoch or any monotonic source).
    time: i64,
}

impl PositionTime {
    /// Create a new timestamped position.
    pub fn new(position: Position, time_millis: i64) -> Self {
        Self {
            position,
            time: time_millis,
        }
    }

    /// Validate coordinates and build a timestamped position in one step.
    pub fn from_coords(
        latitude: f64,
        longitude: f64,
        time_millis: i64,
    ) -> Result<Self, GeometryError> {
        Ok(Self::new(Position::new(latitude, longitude)?, time_millis))
    }

    /// The reported coordinate.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// The reporting time in milliseconds.
    pub fn time(&self) -> i64 {
        self.time
    }

    /// True if both values refer to the same coordinate.
    pub fn position_equals(&self, other: &PositionTime) -> bool {
        self.position == other.position
    }

    /// True if this report is at least as recent as `other`.
    pub fn is_not_older_than(&self, other: &PositionTime) -> bool {
        self.time >= other.time
    }
}

impl fmt::Display for PositionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{}", self.position, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_accepts_valid_range() {
        let pos = Position::new(55.68, 12.6).unwrap();
        assert_eq!(pos.latitude(), 55.68);
        assert_eq!(pos.longitude(), 12.6);

        assert!(Position::new(90.0, 180.0).is_ok());
        assert!(Position::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_position_rejects_out_of_range() {
        assert!(matches!(
            Position::new(91.0, 0.0),
            Err(GeometryError::InvalidLatitude(_))
        ));
        assert!(matches!(
            Position::new(0.0, -180.5),
            Err(GeometryError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn test_position_rejects_nan() {
        assert!(Position::new(f64::NAN, 0.0).is_err());
        assert!(Position::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_position_equals_ignores_time() {
        let a = PositionTime::from_coords(10.0, 20.0, 1).unwrap();
        let b = PositionTime::from_coords(10.0, 20.0, 99).unwrap();
        let c = PositionTime::from_coords(10.0, 20.5, 1).unwrap();

        assert!(a.position_equals(&b));
        assert!(!a.position_equals(&c));
        assert_ne!(a, b, "full equality still includes the timestamp");
    }

    #[test]
    fn test_recency_comparison() {
        let older = PositionTime::from_coords(0.0, 0.0, 3).unwrap();
        let newer = PositionTime::from_coords(0.0, 0.0, 5).unwrap();

        assert!(newer.is_not_older_than(&older));
        assert!(!older.is_not_older_than(&newer));
        assert!(older.is_not_older_than(&older));
    }

    #[test]
    fn test_deserialize_validates_coordinates() {
        let ok: Position = serde_json::from_str(r#"{"latitude":1.5,"longitude":2.5}"#).unwrap();
        assert_eq!(ok.latitude(), 1.5);

        let bad = serde_json::from_str::<Position>(r#"{"latitude":100.0,"longitude":0.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_display_uses_hemispheres() {
        let pos = Position::new(-33.5, 151.25).unwrap();
        assert_eq!(pos.to_string(), "33.50000S 151.25000E");
    }
}
