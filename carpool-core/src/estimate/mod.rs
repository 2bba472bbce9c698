//! Estimate distance and travel time between coordinates.
//!
//! The [`LegEstimator`] trait abstracts the retrieval of leg costs. Callers
//! supply coordinates and receive either a single [`LegEstimate`] or a square
//! [`LegMatrix`]. [`HaversineEstimator`] answers offline; network-backed
//! implementations live in `carpool-data`.

mod error;
mod haversine;
mod provider;

pub use error::{EstimateError, MatrixError};
pub use haversine::HaversineEstimator;
pub use provider::{LegEstimate, LegEstimator, LegMatrix, check_matrix_shape};
