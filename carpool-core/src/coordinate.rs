//! WGS84 coordinates with explicit validation.
//!
//! A [`Coordinate`] may hold any pair of `f64` values so that callers can
//! deserialise raw input; [`Coordinate::validate`] (or the checked
//! constructor [`Coordinate::new`]) must succeed before a value reaches an
//! estimator.

use std::fmt;

use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A latitude/longitude pair in decimal degrees.
///
/// # Examples
/// ```
/// use carpool_core::Coordinate;
///
/// let dallas = Coordinate::new(32.7767, -96.7970)?;
/// assert_eq!(dallas.lat, 32.7767);
/// assert!(Coordinate::new(200.0, 0.0).is_err());
/// # Ok::<(), carpool_core::CoordinateError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in `[-90, 90]`.
    pub lat: f64,
    /// Longitude in `[-180, 180]`.
    pub lng: f64,
}

/// Reasons a [`Coordinate`] is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    /// Latitude or longitude was NaN or infinite.
    #[error("coordinate ({lat}, {lng}) is not finite")]
    NotFinite {
        /// Offending latitude.
        lat: f64,
        /// Offending longitude.
        lng: f64,
    },
    /// Latitude outside `[-90, 90]`.
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    /// Longitude outside `[-180, 180]`.
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

impl Coordinate {
    /// Construct a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] when either component is non-finite or
    /// out of range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        let coordinate = Self { lat, lng };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check the coordinate lies on the globe.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] describing the first violated bound.
    pub fn validate(&self) -> Result<(), CoordinateError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(CoordinateError::NotFinite {
                lat: self.lat,
                lng: self.lng,
            });
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(CoordinateError::LatitudeOutOfRange(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(CoordinateError::LongitudeOutOfRange(self.lng));
        }
        Ok(())
    }

    /// Bit-exact identity used for request fingerprints and cache keys.
    #[must_use]
    pub const fn to_bits(self) -> (u64, u64) {
        (self.lat.to_bits(), self.lng.to_bits())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

// `geo` follows the x = longitude, y = latitude convention.
impl From<Coordinate> for Coord<f64> {
    fn from(value: Coordinate) -> Self {
        Self {
            x: value.lng,
            y: value.lat,
        }
    }
}

impl From<Coord<f64>> for Coordinate {
    fn from(value: Coord<f64>) -> Self {
        Self {
            lat: value.y,
            lng: value.x,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(90.0, 180.0)]
    #[case(-90.0, -180.0)]
    #[case(0.0, 0.0)]
    fn accepts_boundary_values(#[case] lat: f64, #[case] lng: f64) {
        assert!(Coordinate::new(lat, lng).is_ok());
    }

    #[rstest]
    #[case(200.0, 0.0)]
    #[case(-90.5, 0.0)]
    fn rejects_latitude_out_of_range(#[case] lat: f64, #[case] lng: f64) {
        let err = Coordinate::new(lat, lng).expect_err("latitude should be rejected");
        assert!(matches!(err, CoordinateError::LatitudeOutOfRange(_)));
    }

    #[rstest]
    fn rejects_longitude_out_of_range() {
        let err = Coordinate::new(0.0, 180.1).expect_err("longitude should be rejected");
        assert_eq!(err, CoordinateError::LongitudeOutOfRange(180.1));
    }

    #[rstest]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn rejects_non_finite(#[case] lat: f64, #[case] lng: f64) {
        let err = Coordinate::new(lat, lng).expect_err("non-finite should be rejected");
        assert!(matches!(err, CoordinateError::NotFinite { .. }));
    }

    #[rstest]
    fn converts_to_geo_with_longitude_as_x() {
        let coord: Coord<f64> = Coordinate { lat: 51.5, lng: -0.1 }.into();
        assert_eq!(coord, Coord { x: -0.1, y: 51.5 });
        assert_eq!(Coordinate::from(coord), Coordinate { lat: 51.5, lng: -0.1 });
    }
}
