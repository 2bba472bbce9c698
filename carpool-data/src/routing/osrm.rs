//! OSRM API response types for the Route and Table services.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#route-service> and
//! <http://project-osrm.org/docs/v5.24.0/api/#table-service>

use serde::Deserialize;

/// Status code OSRM uses for success.
const OK: &str = "Ok";

/// Status code OSRM uses when no road connects the coordinates.
pub const NO_ROUTE: &str = "NoRoute";

/// OSRM Route API response.
#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    /// Status code from OSRM, e.g. `"Ok"` or `"NoRoute"`.
    pub code: String,

    /// Optional error message when `code` is not `"Ok"`.
    pub message: Option<String>,

    /// Candidate routes, best first.
    #[serde(default)]
    pub routes: Vec<RouteSummary>,
}

/// Totals for one route alternative.
#[derive(Debug, Deserialize)]
pub struct RouteSummary {
    /// Metres.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
}

/// OSRM Table API response.
///
/// Requested with `annotations=duration,distance`, so both matrices are
/// expected on success.
#[derive(Debug, Deserialize)]
pub struct TableResponse {
    /// Status code from OSRM.
    ///
    /// Common values:
    /// - `"Ok"` - Request was successful
    /// - `"InvalidQuery"` - Invalid query parameters
    /// - `"InvalidOptions"` - Invalid option combination
    /// - `"NoTable"` - Table computation failed
    pub code: String,

    /// Optional error message when `code` is not `"Ok"`.
    pub message: Option<String>,

    /// `durations[i][j]` is the travel time in seconds from the i-th to the
    /// j-th coordinate, `None` when no route exists.
    pub durations: Option<Vec<Vec<Option<f64>>>>,

    /// `distances[i][j]` is the road distance in metres, `None` when no
    /// route exists.
    pub distances: Option<Vec<Vec<Option<f64>>>>,
}

impl RouteResponse {
    /// Check if the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == OK
    }
}

impl TableResponse {
    /// Check if the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == OK
    }
}
