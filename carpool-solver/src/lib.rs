//! Pickup sequencing for the carpool engine.
//!
//! This crate provides [`WaypointSequencer`], the default implementation of
//! the [`Sequencer`](carpool_core::Sequencer) trait. It asks a
//! [`LegEstimator`](carpool_core::LegEstimator) for one matrix covering the
//! origin, every pickup and the destination, then searches visiting orders:
//! exhaustively for small groups, and with nearest-neighbour construction
//! plus 2-opt for larger ones.
//!
//! [`RouteSession`] wraps a sequencer for interactive editing, debouncing
//! bursts of edits and discarding results that a newer request superseded.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod search;
mod sequencer;
mod session;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use sequencer::{DEFAULT_EXHAUSTIVE_LIMIT, SequencerConfig, WaypointSequencer};
pub use session::{PendingRequest, RouteSession, SessionUpdate};
