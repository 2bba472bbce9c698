use thiserror::Error;

/// Errors from [`crate::estimate::LegEstimator::estimate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    /// No coordinates were provided.
    ///
    /// Matrix requests need at least one point. Callers should pre-filter
    /// input to avoid this condition.
    #[error("at least one coordinate is required")]
    EmptyInput,
    /// The estimator was configured with unusable parameters.
    #[error("estimator misconfigured: {message}")]
    InvalidConfiguration {
        /// Description of the bad setting.
        message: String,
    },
    /// The routing service did not answer within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The routing service answered with a non-success status.
    #[error("HTTP {status} from {url}: {message}")]
    HttpError {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail from the client.
        message: String,
    },
    /// The request never reached the routing service.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Request URL.
        url: String,
        /// Error detail from the client.
        message: String,
    },
    /// The routing service reported a failure in its payload.
    #[error("routing service returned {code}: {message}")]
    ServiceError {
        /// Service status code, e.g. `"NoRoute"`.
        code: String,
        /// Service message.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse routing response: {message}")]
    ParseError {
        /// Decoder error detail.
        message: String,
    },
    /// No road connects the two points.
    #[error("no route connects the requested points")]
    Unreachable,
    /// The shared rate limiter did not admit the request in time.
    #[error("rate limiter did not admit the request within {waited_ms} ms")]
    RateLimited {
        /// Configured wait bound.
        waited_ms: u64,
    },
}

impl EstimateError {
    /// Whether retrying the same request may succeed.
    ///
    /// Timeouts, connection failures, HTTP 429 and 5xx responses are
    /// transient; everything else will fail the same way again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::NetworkError { .. } => true,
            Self::HttpError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Errors from [`crate::estimate::LegEstimator::estimate_matrix`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    /// A single leg failed; indices refer to the input slice.
    #[error("leg {from} -> {to} could not be estimated: {source}")]
    Leg {
        /// Index of the leg's start point.
        from: usize,
        /// Index of the leg's end point.
        to: usize,
        /// Underlying failure.
        #[source]
        source: EstimateError,
    },
    /// The whole matrix request failed.
    #[error("travel matrix request failed: {0}")]
    Request(#[source] EstimateError),
    /// The estimator returned a matrix of the wrong size.
    #[error("travel matrix has {rows} rows and a row of {columns} columns, expected {expected}x{expected}")]
    Shape {
        /// Rows returned.
        rows: usize,
        /// Width of the first mis-sized row, or of the first row.
        columns: usize,
        /// Number of input points.
        expected: usize,
    },
}

impl MatrixError {
    /// The point the failure is attributed to, when it concerns one leg.
    #[must_use]
    pub const fn leg(&self) -> Option<(usize, usize)> {
        match self {
            Self::Leg { from, to, .. } => Some((*from, *to)),
            _ => None,
        }
    }
}
