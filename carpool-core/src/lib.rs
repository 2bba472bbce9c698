//! Core domain types for the carpool route engine.
//!
//! The crate defines coordinates, waypoints and routes, the
//! [`LegEstimator`] abstraction with an offline haversine implementation,
//! the [`Sequencer`] contract, recomputation bookkeeping, and the
//! [`DocumentStore`] collaborator. Constructors and validators return
//! `Result` so invalid input is surfaced before any estimator is called.

#![forbid(unsafe_code)]

mod coordinate;
pub mod estimate;
mod recompute;
mod route;
mod sequencer;
mod serde_secs;
pub mod store;
mod waypoint;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use coordinate::{Coordinate, CoordinateError};
pub use estimate::{
    EstimateError, HaversineEstimator, LegEstimate, LegEstimator, LegMatrix, MatrixError,
    check_matrix_shape,
};
pub use recompute::{DEFAULT_DEBOUNCE, Debouncer, RecomputeGate, RequestToken};
pub use route::{Route, RouteError, Stop};
pub use sequencer::{
    Diagnostics, InvalidInputError, Objective, RequestKey, RouteComputationError, RouteConstraints,
    RouteCost, SearchStrategy, SequenceError, SequenceRequest, SequenceResponse, Sequencer,
    TimeWindow,
};
pub use store::{
    DocumentStore, DocumentStoreExt, Listener, MemoryDocumentStore, Query, StoreError,
    StoredDocument, Subscription,
};
pub use waypoint::{Waypoint, WaypointKind};

#[cfg(feature = "store-sqlite")]
pub use store::SqliteDocumentStore;
