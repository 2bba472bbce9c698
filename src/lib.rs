//! Facade crate for the carpool route engine.
//!
//! This crate re-exports the core domain types and the default sequencer,
//! and exposes the network integrations and the SQLite document store behind
//! feature flags.

#![forbid(unsafe_code)]

pub use carpool_core::{
    Coordinate, DocumentStore, DocumentStoreExt, HaversineEstimator, LegEstimate, LegEstimator,
    MemoryDocumentStore, Route, SequenceError, SequenceRequest, SequenceResponse, Sequencer,
    Waypoint, WaypointKind,
};
pub use carpool_solver::{RouteSession, SequencerConfig, WaypointSequencer};

#[cfg(feature = "store-sqlite")]
pub use carpool_core::SqliteDocumentStore;

#[cfg(feature = "http")]
pub use carpool_data::geocoding::GeocodingService;
#[cfg(feature = "http")]
pub use carpool_data::routing::{FallbackEstimator, HttpLegEstimator};
#[cfg(feature = "http")]
pub use carpool_data::{RateLimiter, RetryPolicy};

/// Sequence `request` with the offline haversine estimator.
///
/// # Errors
///
/// See [`SequenceError`].
///
/// # Examples
/// ```
/// use carpool_engine::{Coordinate, SequenceRequest, Waypoint, sequence_offline};
///
/// let request = SequenceRequest::new(
///     Waypoint::origin("Driver", Coordinate { lat: 32.7767, lng: -96.7970 }),
///     vec![Waypoint::pickup("Ana", Coordinate { lat: 32.7841, lng: -96.7838 })],
///     Waypoint::destination("Office", Coordinate { lat: 32.8998, lng: -97.0403 }),
/// );
/// let response = sequence_offline(&request)?;
/// assert_eq!(response.route.pickups().count(), 1);
/// # Ok::<(), carpool_engine::SequenceError>(())
/// ```
pub fn sequence_offline(request: &SequenceRequest) -> Result<SequenceResponse, SequenceError> {
    WaypointSequencer::new(HaversineEstimator::default()).sequence(request)
}
