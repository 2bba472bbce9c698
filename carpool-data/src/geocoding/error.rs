//! Failure types for geocoding providers and the service chaining them.

use std::fmt;
use std::time::Duration;

use carpool_core::CoordinateError;
use thiserror::Error;

use crate::RateLimitTimeout;

/// One failed attempt against one provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The provider did not answer within the slot timeout.
    #[error("timed out after {after:?}")]
    Timeout {
        /// Configured bound.
        after: Duration,
    },
    /// The provider answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error detail from the client.
        message: String,
    },
    /// The request never reached the provider.
    #[error("network error: {message}")]
    Network {
        /// Error detail from the client.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse response: {message}")]
    Parse {
        /// Decoder error detail.
        message: String,
    },
    /// The provider knows nothing matching the lookup.
    #[error("no results")]
    NoResults,
    /// The lookup could not be expressed as a request.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What was wrong.
        message: String,
    },
    /// The shared rate limiter did not admit the request in time.
    #[error(transparent)]
    RateLimited(#[from] RateLimitTimeout),
}

impl ProviderError {
    /// Whether retrying the same provider may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A provider that gave up, with the attempts spent on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    /// Provider name.
    pub provider: String,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// The last error seen.
    pub error: ProviderError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} attempt(s): {}",
            self.provider, self.attempts, self.error
        )
    }
}

/// Errors surfaced by [`super::GeocodingService`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeocodeError {
    /// The query was empty after normalisation.
    #[error("geocoding query is empty")]
    InvalidQuery,
    /// A coordinate passed in was not on the globe.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),
    /// Every provider answered, and none knew the place.
    #[error("no geocoding results for {query}")]
    NotFound {
        /// Normalised query or coordinate looked up.
        query: String,
    },
    /// Every provider failed.
    #[error("all geocoding providers failed: {}", join(.failures))]
    Exhausted {
        /// One entry per provider, in chain order.
        failures: Vec<ProviderFailure>,
    },
    /// The shared rate limiter did not admit a request in time.
    #[error(transparent)]
    RateLimitTimeout(#[from] RateLimitTimeout),
    /// The service has no providers configured.
    #[error("no geocoding providers configured")]
    NoProviders,
}

fn join(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
