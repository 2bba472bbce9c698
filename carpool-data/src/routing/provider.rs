//! HTTP-based `LegEstimator` using OSRM's Route and Table APIs.
//!
//! The [`LegEstimator`] trait is synchronous to keep the sequencer
//! embeddable in synchronous contexts. This estimator bridges the async
//! HTTP calls to the sync interface by blocking on a Tokio runtime
//! internally.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use carpool_core::{Coordinate, LegEstimator};
//! use carpool_data::RateLimiter;
//! use carpool_data::routing::HttpLegEstimator;
//!
//! let limiter = Arc::new(RateLimiter::new(Duration::from_millis(200)));
//! let estimator = HttpLegEstimator::new("http://localhost:5000")?.with_rate_limiter(limiter);
//! let leg = estimator.estimate(
//!     Coordinate { lat: 32.7767, lng: -96.7970 },
//!     Coordinate { lat: 32.90, lng: -96.70 },
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use carpool_core::{
    Coordinate, EstimateError, LegEstimate, LegEstimator, LegMatrix, MatrixError,
    check_matrix_shape,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use super::osrm::{NO_ROUTE, RouteResponse, TableResponse};
use crate::client::{BuildError, http_client};
use crate::{RateLimiter, RetryPolicy};

/// Default user agent for OSRM requests.
pub const DEFAULT_USER_AGENT: &str = "carpool-routing/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`HttpLegEstimator`].
#[derive(Debug, Clone)]
pub struct HttpEstimatorConfig {
    /// Base URL for the OSRM service (e.g., `"http://localhost:5000"`).
    pub base_url: String,
    /// OSRM routing profile, e.g. `"driving"`.
    pub profile: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Retry schedule for transient failures.
    pub retry: RetryPolicy,
}

impl Default for HttpEstimatorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            profile: "driving".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpEstimatorConfig {
    /// Create a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the routing profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// HTTP-based leg estimator using the OSRM Route and Table APIs.
///
/// Single legs use the Route service; matrices use one Table request
/// annotated with both durations and distances. Every request passes
/// through the optional shared [`RateLimiter`], and transient failures are
/// retried per the configured [`RetryPolicy`].
///
/// # Runtime behaviour
///
/// When called from outside any Tokio runtime, the estimator uses its own
/// stored runtime. When called from within an existing multi-threaded Tokio
/// runtime (detected via [`Handle::try_current()`] and
/// [`RuntimeFlavor::MultiThread`]), it uses that runtime's handle with
/// [`tokio::task::block_in_place`] to avoid nested runtime panics.
///
/// When called from within a `current_thread` Tokio runtime, the estimator
/// falls back to using its own internal runtime. This avoids the panic that
/// `block_in_place` would cause, but may lead to deadlocks if the caller's
/// runtime is driving IO or timers that this request depends on.
pub struct HttpLegEstimator {
    client: Client,
    config: HttpEstimatorConfig,
    limiter: Option<Arc<RateLimiter>>,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpLegEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLegEstimator")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpLegEstimator {
    /// Create a new estimator with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BuildError> {
        Self::with_config(HttpEstimatorConfig::new(base_url))
    }

    /// Create a new estimator with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: HttpEstimatorConfig) -> Result<Self, BuildError> {
        let client = http_client(&config.user_agent, config.timeout)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(BuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            limiter: None,
            runtime,
        })
    }

    /// Admit every request through `limiter`.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    fn service_url(&self, service: &str, points: &[Coordinate]) -> String {
        let coords = points
            .iter()
            .map(|point| format!("{},{}", point.lng, point.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/{service}/v1/{}/{coords}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
        )
    }

    /// Build the OSRM Route API URL for a single leg.
    fn build_route_url(&self, from: Coordinate, to: Coordinate) -> String {
        format!("{}?overview=false", self.service_url("route", &[from, to]))
    }

    /// Build the OSRM Table API URL for the given points.
    fn build_table_url(&self, points: &[Coordinate]) -> String {
        format!(
            "{}?annotations=duration,distance",
            self.service_url("table", points)
        )
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, EstimateError> {
        if let Some(limiter) = &self.limiter {
            limiter
                .acquire()
                .await
                .map_err(|timeout| EstimateError::RateLimited {
                    waited_ms: u64::try_from(timeout.max_wait.as_millis()).unwrap_or(u64::MAX),
                })?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;

        response
            .json()
            .await
            .map_err(|err| EstimateError::ParseError {
                message: err.to_string(),
            })
    }

    async fn fetch_with_retry<T: DeserializeOwned>(&self, url: &str) -> Result<T, EstimateError> {
        let (result, attempts) = self
            .config
            .retry
            .run(EstimateError::is_transient, || self.fetch::<T>(url))
            .await;
        if attempts > 1 {
            log::debug!("OSRM request to {url} took {attempts} attempts");
        }
        result
    }

    /// Convert a reqwest error to an `EstimateError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> EstimateError {
        if error.is_timeout() {
            return EstimateError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return EstimateError::HttpError {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        EstimateError::NetworkError {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        // block_in_place requires a multi-threaded runtime; for
        // current_thread runtimes we fall back to our own stored runtime.
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}

/// Convert an OSRM route response to a leg estimate.
fn convert_route(response: RouteResponse) -> Result<LegEstimate, EstimateError> {
    if response.code == NO_ROUTE {
        return Err(EstimateError::Unreachable);
    }
    if !response.is_ok() {
        return Err(EstimateError::ServiceError {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }
    let best = response
        .routes
        .into_iter()
        .next()
        .ok_or(EstimateError::Unreachable)?;
    leg_from_cells(Some(best.distance), Some(best.duration)).ok_or_else(|| {
        EstimateError::ParseError {
            message: format!(
                "OSRM route has invalid totals: {} m, {} s",
                best.distance, best.duration
            ),
        }
    })
}

/// Convert an OSRM table response to a leg matrix of `expected` points.
///
/// Null or invalid cells (negative, NaN, infinite) off the diagonal fail
/// with [`EstimateError::Unreachable`] for that pair.
fn convert_table(response: TableResponse, expected: usize) -> Result<LegMatrix, MatrixError> {
    if !response.is_ok() {
        return Err(MatrixError::Request(EstimateError::ServiceError {
            code: response.code,
            message: response.message.unwrap_or_default(),
        }));
    }
    let missing = |what: &str| {
        MatrixError::Request(EstimateError::ParseError {
            message: format!("OSRM response missing {what} array"),
        })
    };
    let durations = response.durations.ok_or_else(|| missing("durations"))?;
    let distances = response.distances.ok_or_else(|| missing("distances"))?;

    let matrix: LegMatrix = durations
        .into_iter()
        .zip(distances)
        .enumerate()
        .map(|(from, (duration_row, distance_row))| {
            duration_row
                .into_iter()
                .zip(distance_row)
                .enumerate()
                .map(|(to, (duration, distance))| {
                    if from == to {
                        return Ok(LegEstimate::ZERO);
                    }
                    leg_from_cells(distance, duration).ok_or(MatrixError::Leg {
                        from,
                        to,
                        source: EstimateError::Unreachable,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<_, _>>()?;

    check_matrix_shape(&matrix, expected)?;
    Ok(matrix)
}

fn leg_from_cells(distance: Option<f64>, duration: Option<f64>) -> Option<LegEstimate> {
    let distance_m = distance.filter(|value| value.is_finite() && *value >= 0.0)?;
    let duration = duration
        .filter(|value| value.is_finite() && *value >= 0.0)
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())?;
    Some(LegEstimate::new(distance_m, duration))
}

impl LegEstimator for HttpLegEstimator {
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        if from == to {
            return Ok(LegEstimate::ZERO);
        }
        let url = self.build_route_url(from, to);
        let response = self.block_on(self.fetch_with_retry::<RouteResponse>(&url))?;
        convert_route(response)
    }

    /// Fetch the leg matrix for the given points in one Table request.
    ///
    /// # Runtime requirements
    ///
    /// When called from within an existing Tokio runtime, the runtime must be
    /// multi-threaded (`flavor = "multi_thread"`). If called from within a
    /// `current_thread` runtime, the method falls back to using its own
    /// internal runtime, which may block the caller's runtime and cause
    /// deadlocks if the caller's runtime is driving IO or timers needed by
    /// this request.
    fn estimate_matrix(&self, points: &[Coordinate]) -> Result<LegMatrix, MatrixError> {
        if points.is_empty() {
            return Err(MatrixError::Request(EstimateError::EmptyInput));
        }
        let url = self.build_table_url(points);
        let response = self
            .block_on(self.fetch_with_retry::<TableResponse>(&url))
            .map_err(MatrixError::Request)?;
        convert_table(response, points.len())
    }
}
