//! Primary/secondary estimator composition.

use carpool_core::{
    Coordinate, EstimateError, HaversineEstimator, LegEstimate, LegEstimator, LegMatrix,
    MatrixError,
};

/// Estimator that answers from `secondary` whenever `primary` fails.
///
/// The usual pairing is a road-network estimator backed by the offline
/// [`HaversineEstimator`], so a route can still be sequenced when the
/// routing service is down. Fallbacks are logged at warn level.
#[derive(Debug, Clone)]
pub struct FallbackEstimator<P, S = HaversineEstimator> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackEstimator<P, S> {
    /// Compose `primary` with `secondary`.
    #[must_use]
    pub const fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }

    /// The estimator consulted first.
    #[must_use]
    pub const fn primary(&self) -> &P {
        &self.primary
    }
}

impl<P: LegEstimator, S: LegEstimator> LegEstimator for FallbackEstimator<P, S> {
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        self.primary.estimate(from, to).or_else(|err| {
            log::warn!("primary estimator failed ({err}); using fallback estimate");
            self.secondary.estimate(from, to)
        })
    }

    fn estimate_matrix(&self, points: &[Coordinate]) -> Result<LegMatrix, MatrixError> {
        self.primary.estimate_matrix(points).or_else(|err| {
            log::warn!("primary estimator failed ({err}); using fallback matrix");
            self.secondary.estimate_matrix(points)
        })
    }
}
