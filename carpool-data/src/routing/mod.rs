//! Network-backed leg estimators for routing services.
//!
//! This module provides [`HttpLegEstimator`], an implementation of
//! [`carpool_core::LegEstimator`] that fetches distances and travel times
//! from an OSRM routing service, and [`FallbackEstimator`], which degrades
//! to a secondary estimator when the primary one fails.
//!
//! # Architecture
//!
//! Single legs go through the OSRM Route API and matrices through one
//! Table API request. The synchronous [`carpool_core::LegEstimator`] trait
//! is implemented by blocking on async HTTP calls internally, keeping the
//! sequencer embeddable in synchronous contexts.
//!
//! # Example
//!
//! ```no_run
//! use carpool_core::{Coordinate, HaversineEstimator, LegEstimator};
//! use carpool_data::routing::{FallbackEstimator, HttpEstimatorConfig, HttpLegEstimator};
//! use std::time::Duration;
//!
//! let config = HttpEstimatorConfig::new("http://localhost:5000")
//!     .with_timeout(Duration::from_secs(10))
//!     .with_user_agent("my-app/1.0");
//! let estimator = FallbackEstimator::new(
//!     HttpLegEstimator::with_config(config)?,
//!     HaversineEstimator::default(),
//! );
//!
//! let points = [
//!     Coordinate { lat: 32.7767, lng: -96.7970 },
//!     Coordinate { lat: 32.90, lng: -96.70 },
//! ];
//! let matrix = estimator.estimate_matrix(&points)?;
//! println!("Travel time: {:?}", matrix[0][1].duration);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod fallback;
mod osrm;
mod provider;

#[doc(hidden)]
pub mod test_support;

pub use fallback::FallbackEstimator;
pub use provider::{DEFAULT_USER_AGENT, HttpEstimatorConfig, HttpLegEstimator};
