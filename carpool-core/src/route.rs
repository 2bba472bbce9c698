//! Ordered routes from the driver's origin to the shared destination.
//!
//! A [`Route`] pairs the visiting order with the per-leg estimates that
//! produced it, so totals and cumulative offsets always agree with the legs.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{LegEstimate, Waypoint, WaypointKind};

/// An ordered path through waypoints with its total cost.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use carpool_core::{Coordinate, LegEstimate, Route, Waypoint};
///
/// let origin = Waypoint::origin("Driver", Coordinate { lat: 0.0, lng: 0.0 });
/// let destination = Waypoint::destination("Office", Coordinate { lat: 0.0, lng: 0.1 });
/// let leg = LegEstimate::new(11_000.0, Duration::from_secs(900));
/// let route = Route::from_legs(vec![origin, destination], vec![leg])?;
///
/// assert_eq!(route.waypoints().len(), 2);
/// assert_eq!(route.total_duration(), Duration::from_secs(900));
/// # Ok::<(), carpool_core::RouteError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RouteRecord", into = "RouteRecord")]
pub struct Route {
    waypoints: Vec<Waypoint>,
    legs: Vec<LegEstimate>,
    total_distance_m: f64,
    total_duration: Duration,
}

/// Errors returned by [`Route::from_legs`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A route needs at least an origin and a destination.
    #[error("route must contain at least two waypoints, found {0}")]
    TooFewWaypoints(usize),
    /// Every consecutive pair of waypoints needs exactly one leg.
    #[error("route with {waypoints} waypoints needs {expected} legs, found {legs}")]
    LegCountMismatch {
        /// Number of waypoints supplied.
        waypoints: usize,
        /// Number of legs required.
        expected: usize,
        /// Number of legs supplied.
        legs: usize,
    },
    /// The first waypoint was not the origin.
    #[error("route must start at the origin, found {0}")]
    MissingOrigin(WaypointKind),
    /// The last waypoint was not the destination.
    #[error("route must end at the destination, found {0}")]
    MissingDestination(WaypointKind),
}

/// A waypoint together with the distance and time needed to reach it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop<'a> {
    /// The waypoint reached.
    pub waypoint: &'a Waypoint,
    /// Metres travelled from the origin.
    pub distance_from_origin_m: f64,
    /// Time elapsed since leaving the origin.
    pub duration_from_origin: Duration,
}

impl Route {
    /// Build a route from its visiting order and the legs between stops.
    ///
    /// `legs[i]` must describe travel from `waypoints[i]` to
    /// `waypoints[i + 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] when the shape is inconsistent or the route
    /// does not run from origin to destination.
    pub fn from_legs(waypoints: Vec<Waypoint>, legs: Vec<LegEstimate>) -> Result<Self, RouteError> {
        let (Some(first), Some(last)) = (waypoints.first(), waypoints.last()) else {
            return Err(RouteError::TooFewWaypoints(0));
        };
        if waypoints.len() < 2 {
            return Err(RouteError::TooFewWaypoints(waypoints.len()));
        }
        if first.kind != WaypointKind::Origin {
            return Err(RouteError::MissingOrigin(first.kind));
        }
        if last.kind != WaypointKind::Destination {
            return Err(RouteError::MissingDestination(last.kind));
        }
        let expected = waypoints.len() - 1;
        if legs.len() != expected {
            return Err(RouteError::LegCountMismatch {
                waypoints: waypoints.len(),
                expected,
                legs: legs.len(),
            });
        }

        let total_distance_m = legs.iter().map(|leg| leg.distance_m).sum();
        let total_duration = legs
            .iter()
            .map(|leg| leg.duration)
            .fold(Duration::ZERO, Duration::saturating_add);
        Ok(Self {
            waypoints,
            legs,
            total_distance_m,
            total_duration,
        })
    }

    /// Waypoints in visiting order.
    #[must_use]
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Legs between consecutive waypoints.
    #[must_use]
    pub fn legs(&self) -> &[LegEstimate] {
        &self.legs
    }

    /// Total distance in metres.
    #[must_use]
    pub const fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    /// Total travel time.
    #[must_use]
    pub const fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// Pickups in visiting order.
    pub fn pickups(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints
            .iter()
            .filter(|waypoint| waypoint.kind == WaypointKind::Pickup)
    }

    /// Each waypoint with the cumulative distance and time to reach it.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "cumulative distance is a running float sum"
    )]
    pub fn stops(&self) -> Vec<Stop<'_>> {
        let mut distance = 0.0;
        let mut duration = Duration::ZERO;
        let mut stops = Vec::with_capacity(self.waypoints.len());
        let mut legs = self.legs.iter();
        for waypoint in &self.waypoints {
            stops.push(Stop {
                waypoint,
                distance_from_origin_m: distance,
                duration_from_origin: duration,
            });
            if let Some(leg) = legs.next() {
                distance += leg.distance_m;
                duration = duration.saturating_add(leg.duration);
            }
        }
        stops
    }
}

/// Serialised form of a [`Route`]; totals are recomputed on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RouteRecord {
    waypoints: Vec<Waypoint>,
    legs: Vec<LegEstimate>,
    #[serde(default)]
    total_distance_m: f64,
    #[serde(default, rename = "total_duration_s", with = "crate::serde_secs")]
    total_duration: Duration,
}

impl TryFrom<RouteRecord> for Route {
    type Error = RouteError;

    fn try_from(record: RouteRecord) -> Result<Self, Self::Error> {
        Self::from_legs(record.waypoints, record.legs)
    }
}

impl From<Route> for RouteRecord {
    fn from(route: Route) -> Self {
        Self {
            waypoints: route.waypoints,
            legs: route.legs,
            total_distance_m: route.total_distance_m,
            total_duration: route.total_duration,
        }
    }
}
