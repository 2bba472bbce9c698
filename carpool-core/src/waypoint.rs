//! Stops on a shared ride.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// Role a waypoint plays in a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    /// Driver start location.
    Origin,
    /// Passenger boarding location.
    Pickup,
    /// Shared drop-off.
    Destination,
}

impl fmt::Display for WaypointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Origin => "origin",
            Self::Pickup => "pickup",
            Self::Destination => "destination",
        };
        f.write_str(label)
    }
}

/// A named stop with a location.
///
/// # Examples
/// ```
/// use carpool_core::{Coordinate, Waypoint, WaypointKind};
///
/// let stop = Waypoint::pickup("Alex", Coordinate { lat: 32.80, lng: -96.80 });
/// assert_eq!(stop.kind, WaypointKind::Pickup);
/// assert_eq!(stop.name, "Alex");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Where the stop is.
    pub location: Coordinate,
    /// Origin, pickup or destination.
    #[serde(rename = "type")]
    pub kind: WaypointKind,
    /// Display name, usually a person or place.
    pub name: String,
}

impl Waypoint {
    /// Construct a waypoint of any kind.
    #[must_use]
    pub fn new(kind: WaypointKind, name: impl Into<String>, location: Coordinate) -> Self {
        Self {
            location,
            kind,
            name: name.into(),
        }
    }

    /// Construct the driver's start waypoint.
    #[must_use]
    pub fn origin(name: impl Into<String>, location: Coordinate) -> Self {
        Self::new(WaypointKind::Origin, name, location)
    }

    /// Construct a passenger pickup waypoint.
    #[must_use]
    pub fn pickup(name: impl Into<String>, location: Coordinate) -> Self {
        Self::new(WaypointKind::Pickup, name, location)
    }

    /// Construct the destination waypoint.
    #[must_use]
    pub fn destination(name: impl Into<String>, location: Coordinate) -> Self {
        Self::new(WaypointKind::Destination, name, location)
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} at {}", self.kind, self.name, self.location)
    }
}
