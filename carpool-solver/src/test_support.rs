//! Test-only utilities for `carpool-solver`.
//!
//! The helpers in this module are available to unit tests and behavioural
//! tests. They are gated behind the `test-support` feature (and `cfg(test)`).

use carpool_core::test_support::pickups;
use carpool_core::{Coordinate, SequenceRequest, Waypoint};

/// Driver start used by the Dallas fixtures.
pub const DALLAS_ORIGIN: Coordinate = Coordinate {
    lat: 32.7767,
    lng: -96.7970,
};

/// Shared destination used by the Dallas fixtures.
pub const DALLAS_DESTINATION: Coordinate = Coordinate {
    lat: 32.90,
    lng: -96.70,
};

/// Two-pickup request around downtown Dallas.
///
/// # Examples
/// ```rust
/// use carpool_solver::test_support::dallas_request;
///
/// let request = dallas_request();
/// assert_eq!(request.pickups.len(), 2);
/// assert!(request.validate().is_ok());
/// ```
#[must_use]
pub fn dallas_request() -> SequenceRequest {
    request_between(
        DALLAS_ORIGIN,
        &[
            Coordinate {
                lat: 32.80,
                lng: -96.80,
            },
            Coordinate {
                lat: 32.75,
                lng: -96.75,
            },
        ],
        DALLAS_DESTINATION,
    )
}

/// Request from `origin` through pickups `P0..` at `points` to
/// `destination`.
#[must_use]
pub fn request_between(
    origin: Coordinate,
    points: &[Coordinate],
    destination: Coordinate,
) -> SequenceRequest {
    SequenceRequest::new(
        Waypoint::origin("Driver", origin),
        pickups(points),
        Waypoint::destination("Destination", destination),
    )
}

/// Distinct coordinates laid out on a small grid, `count` of them.
///
/// Points are spaced a hundredth of a degree apart so they stay distinct
/// for any realistic count.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "grid spacing scales an index")]
pub fn grid(count: usize) -> Vec<Coordinate> {
    (0..count)
        .map(|index| Coordinate {
            lat: f64::from(u32::try_from(index.div_euclid(10)).unwrap_or(u32::MAX)) * 0.01,
            lng: f64::from(u32::try_from(index.rem_euclid(10)).unwrap_or(u32::MAX)) * 0.01,
        })
        .collect()
}
