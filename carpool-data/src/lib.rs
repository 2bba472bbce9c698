//! Network integrations for the carpool route engine.
//!
//! Responsibilities:
//! - Estimate legs through an OSRM routing service, falling back to the
//!   offline haversine estimator.
//! - Resolve place names and coordinates through a chain of geocoding
//!   providers with caching, retries and a shared rate limiter.
//!
//! Boundaries:
//! - Do not encode sequencing rules (live in `carpool-core` and
//!   `carpool-solver`).
//! - Keep blocking calls off async executors; sync entry points bridge onto
//!   a Tokio runtime explicitly.
//!
//! Invariants:
//! - No global mutable state: rate limiters and caches are constructed by
//!   callers and injected.

#![forbid(unsafe_code)]

mod client;
pub mod geocoding;
mod retry;
pub mod routing;
mod throttle;

pub use client::BuildError;
pub use retry::RetryPolicy;
pub use throttle::{RateLimitTimeout, RateLimiter};
