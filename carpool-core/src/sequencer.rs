//! Contract for ordering pickups between a fixed origin and destination.
//!
//! The [`Sequencer`] trait is implemented by `carpool-solver`; this module
//! owns the request/response types and the error taxonomy so that callers
//! and alternative implementations share one vocabulary.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Coordinate, CoordinateError, MatrixError, Route, RouteError, Waypoint, WaypointKind};

/// Which cost the sequencer minimises; the other is the tie-break.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Minimise total travel time.
    #[default]
    Duration,
    /// Minimise total distance.
    Distance,
}

/// Arrival window for a pickup, measured from departure.
///
/// Windows are accepted for compatibility with group scheduling but are not
/// enforced by the bundled sequencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Name of the pickup the window applies to.
    pub pickup: String,
    /// Earliest acceptable arrival.
    #[serde(default, with = "optional_secs")]
    pub earliest: Option<Duration>,
    /// Latest acceptable arrival.
    #[serde(default, with = "optional_secs")]
    pub latest: Option<Duration>,
}

/// Optional limits applied to a sequencing request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteConstraints {
    /// Maximum number of pickups the vehicle can take.
    #[serde(default)]
    pub max_passengers: Option<usize>,
    /// Maximum total route distance in metres.
    #[serde(default)]
    pub max_total_distance_m: Option<f64>,
    /// Pickup arrival windows (not enforced).
    #[serde(default)]
    pub time_windows: Vec<TimeWindow>,
}

/// A request to order pickups between an origin and a destination.
///
/// # Examples
/// ```rust
/// use carpool_core::{Coordinate, SequenceRequest, Waypoint};
///
/// let request = SequenceRequest::new(
///     Waypoint::origin("Driver", Coordinate { lat: 32.7767, lng: -96.7970 }),
///     vec![Waypoint::pickup("Sam", Coordinate { lat: 32.80, lng: -96.80 })],
///     Waypoint::destination("Office", Coordinate { lat: 32.90, lng: -96.70 }),
/// );
/// assert!(request.validate().is_ok());
/// assert_eq!(request.points().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRequest {
    /// Driver start.
    pub origin: Waypoint,
    /// Passenger pickups in input order.
    #[serde(default)]
    pub pickups: Vec<Waypoint>,
    /// Shared destination.
    pub destination: Waypoint,
    /// Optional limits.
    #[serde(default)]
    pub constraints: RouteConstraints,
}

/// Fingerprint of a request; equal keys mean identical inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey(u64);

/// Errors raised before any leg is estimated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    /// A waypoint's coordinate is not on the globe.
    #[error("{waypoint} has an invalid coordinate: {source}")]
    InvalidCoordinate {
        /// The offending waypoint.
        waypoint: Box<Waypoint>,
        /// Why the coordinate was rejected.
        #[source]
        source: CoordinateError,
    },
    /// A waypoint sits in a slot meant for a different kind.
    #[error("expected {expected} in the {slot} slot, found {waypoint}")]
    WrongKind {
        /// Slot name: origin, pickups or destination.
        slot: &'static str,
        /// Kind the slot requires.
        expected: WaypointKind,
        /// The offending waypoint.
        waypoint: Box<Waypoint>,
    },
    /// More pickups than the vehicle can take.
    #[error("{count} pickups exceed the limit of {max} passengers")]
    TooManyPickups {
        /// Pickups requested.
        count: usize,
        /// Configured limit.
        max: usize,
    },
    /// The distance limit is not a positive finite number.
    #[error("distance limit {0} m is not a positive finite number")]
    InvalidDistanceLimit(f64),
}

/// The estimator could not provide a leg the route needs.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("could not estimate travel to {waypoint}: {source}")]
pub struct RouteComputationError {
    /// Waypoint the failing leg leads to.
    pub waypoint: Box<Waypoint>,
    /// Estimator failure.
    #[source]
    pub source: MatrixError,
}

/// Errors returned by [`Sequencer::sequence`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequenceError {
    /// The request was rejected before estimation.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    /// Leg estimation failed.
    #[error(transparent)]
    RouteComputation(#[from] RouteComputationError),
    /// No evaluated visiting order fits within the configured limit.
    #[error("shortest route is {distance_m:.0} m, above the limit of {limit_m:.0} m")]
    DistanceLimitExceeded {
        /// Shortest distance among the evaluated orders.
        distance_m: f64,
        /// Configured limit.
        limit_m: f64,
    },
    /// The sequenced route failed its own shape checks.
    #[error("sequenced route is malformed: {0}")]
    MalformedRoute(#[from] RouteError),
}

/// Search used to produce a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Zero or one pickup: only one order exists.
    Direct,
    /// Every permutation was evaluated.
    Exhaustive,
    /// Nearest-neighbour construction refined by 2-opt.
    NearestNeighbourTwoOpt,
}

/// Total cost of a visiting order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteCost {
    /// Metres.
    pub distance_m: f64,
    /// Travel time.
    #[serde(rename = "duration_s", with = "crate::serde_secs")]
    pub duration: Duration,
}

/// Diagnostic information about a sequencing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Search used.
    pub strategy: SearchStrategy,
    /// Number of complete visiting orders costed.
    pub orders_evaluated: u64,
    /// Wall-clock time spent sequencing, estimation included.
    #[serde(rename = "solve_time_s", with = "crate::serde_secs")]
    pub solve_time: Duration,
}

/// Response from a successful sequencing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceResponse {
    /// The ordered route.
    pub route: Route,
    /// Cost of visiting pickups in input order.
    pub baseline: RouteCost,
    /// Search details.
    pub diagnostics: Diagnostics,
}

/// Order pickups between an origin and a destination.
///
/// Implementations must return [`SequenceError::InvalidInput`] for invalid
/// requests rather than panicking, must keep the origin first and the
/// destination last, and must never return an order costing more than the
/// input order. Sequencers must be `Send + Sync` to operate across threads.
pub trait Sequencer: Send + Sync {
    /// Sequence a request, producing a route or an error.
    ///
    /// # Errors
    ///
    /// See [`SequenceError`].
    fn sequence(&self, request: &SequenceRequest) -> Result<SequenceResponse, SequenceError>;
}

impl<T: Sequencer + ?Sized> Sequencer for Box<T> {
    fn sequence(&self, request: &SequenceRequest) -> Result<SequenceResponse, SequenceError> {
        (**self).sequence(request)
    }
}

impl SequenceRequest {
    /// Construct a request without constraints.
    #[must_use]
    pub fn new(origin: Waypoint, pickups: Vec<Waypoint>, destination: Waypoint) -> Self {
        Self {
            origin,
            pickups,
            destination,
            constraints: RouteConstraints::default(),
        }
    }

    /// Attach constraints.
    #[must_use]
    pub fn with_constraints(mut self, constraints: RouteConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Waypoints in input order: origin, pickups, destination.
    pub fn waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        std::iter::once(&self.origin)
            .chain(self.pickups.iter())
            .chain(std::iter::once(&self.destination))
    }

    /// Coordinates in input order: origin, pickups, destination.
    #[must_use]
    pub fn points(&self) -> Vec<Coordinate> {
        self.waypoints().map(|waypoint| waypoint.location).collect()
    }

    /// Validate kinds, coordinates and constraints.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidInputError`] found, scanning the origin,
    /// then pickups in order, then the destination.
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        check_slot(&self.origin, "origin", WaypointKind::Origin)?;
        for pickup in &self.pickups {
            check_slot(pickup, "pickups", WaypointKind::Pickup)?;
        }
        check_slot(&self.destination, "destination", WaypointKind::Destination)?;

        if let Some(max) = self.constraints.max_passengers
            && self.pickups.len() > max
        {
            return Err(InvalidInputError::TooManyPickups {
                count: self.pickups.len(),
                max,
            });
        }
        if let Some(limit) = self.constraints.max_total_distance_m
            && !(limit.is_finite() && limit > 0.0)
        {
            return Err(InvalidInputError::InvalidDistanceLimit(limit));
        }
        Ok(())
    }

    /// Fingerprint used to skip recomputing identical input.
    #[must_use]
    pub fn key(&self) -> RequestKey {
        let mut hasher = DefaultHasher::new();
        for waypoint in self.waypoints() {
            waypoint.kind.hash(&mut hasher);
            waypoint.name.hash(&mut hasher);
            waypoint.location.to_bits().hash(&mut hasher);
        }
        self.constraints.max_passengers.hash(&mut hasher);
        self.constraints
            .max_total_distance_m
            .map(f64::to_bits)
            .hash(&mut hasher);
        RequestKey(hasher.finish())
    }
}

fn check_slot(
    waypoint: &Waypoint,
    slot: &'static str,
    expected: WaypointKind,
) -> Result<(), InvalidInputError> {
    if waypoint.kind != expected {
        return Err(InvalidInputError::WrongKind {
            slot,
            expected,
            waypoint: Box::new(waypoint.clone()),
        });
    }
    waypoint
        .location
        .validate()
        .map_err(|source| InvalidInputError::InvalidCoordinate {
            waypoint: Box::new(waypoint.clone()),
            source,
        })
}

mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|seconds| Duration::try_from_secs_f64(seconds).map_err(D::Error::custom))
            .transpose()
    }
}
