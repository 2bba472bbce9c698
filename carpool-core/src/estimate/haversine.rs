//! Offline great-circle estimator.
//!
//! Always available, so it serves as the fallback when no routing service
//! answers. Road distance is approximated by scaling the great-circle
//! distance with a detour factor; duration assumes a constant speed.

use std::time::Duration;

use geo::{Distance, Haversine, Point};

use crate::Coordinate;

use super::error::EstimateError;
use super::provider::{LegEstimate, LegEstimator};

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Ratio of road distance to great-circle distance in urban grids.
const DEFAULT_DETOUR_FACTOR: f64 = 1.3;

/// Haversine-based leg estimator.
///
/// # Examples
/// ```
/// use carpool_core::{Coordinate, HaversineEstimator, LegEstimator};
///
/// let estimator = HaversineEstimator::default().with_detour_factor(1.0);
/// let leg = estimator.estimate(
///     Coordinate { lat: 36.17, lng: -115.14 },
///     Coordinate { lat: 34.05, lng: -118.24 },
/// )?;
/// assert!(leg.distance_m > 350_000.0 && leg.distance_m < 400_000.0);
/// # Ok::<(), carpool_core::EstimateError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaversineEstimator {
    /// Assumed average speed in km/h.
    pub average_speed_kmh: f64,
    /// Multiplier applied to the great-circle distance.
    pub detour_factor: f64,
}

impl Default for HaversineEstimator {
    fn default() -> Self {
        Self {
            average_speed_kmh: DEFAULT_SPEED_KMH,
            detour_factor: DEFAULT_DETOUR_FACTOR,
        }
    }
}

impl HaversineEstimator {
    /// Set the assumed average speed.
    #[must_use]
    pub const fn with_average_speed_kmh(mut self, speed_kmh: f64) -> Self {
        self.average_speed_kmh = speed_kmh;
        self
    }

    /// Set the detour factor.
    #[must_use]
    pub const fn with_detour_factor(mut self, factor: f64) -> Self {
        self.detour_factor = factor;
        self
    }

    /// Great-circle distance in metres.
    #[must_use]
    pub fn great_circle_m(from: Coordinate, to: Coordinate) -> f64 {
        let from = Point::from(geo::Coord::from(from));
        let to = Point::from(geo::Coord::from(to));
        Haversine.distance(from, to)
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "distance and speed conversions are floating-point"
    )]
    fn leg(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            return Err(EstimateError::InvalidConfiguration {
                message: format!("average speed {} km/h", self.average_speed_kmh),
            });
        }
        if !(self.detour_factor.is_finite() && self.detour_factor >= 1.0) {
            return Err(EstimateError::InvalidConfiguration {
                message: format!("detour factor {}", self.detour_factor),
            });
        }
        let distance_m = Self::great_circle_m(from, to) * self.detour_factor;
        let metres_per_second = self.average_speed_kmh / 3.6;
        let duration = Duration::try_from_secs_f64(distance_m / metres_per_second).map_err(|err| {
            EstimateError::InvalidConfiguration {
                message: err.to_string(),
            }
        })?;
        Ok(LegEstimate::new(distance_m, duration))
    }
}

impl LegEstimator for HaversineEstimator {
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        self.leg(from, to)
    }
}
