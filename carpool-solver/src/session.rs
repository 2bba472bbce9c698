//! Debounced recomputation of a route whose inputs keep changing.

use std::time::{Duration, Instant};

use carpool_core::{
    DEFAULT_DEBOUNCE, Debouncer, RecomputeGate, RequestKey, RequestToken, SequenceError,
    SequenceRequest, SequenceResponse, Sequencer,
};

/// A request whose quiet period has elapsed and which is ready to compute.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Token the result must be accepted with.
    pub token: RequestToken,
    /// Input to sequence.
    pub request: SequenceRequest,
}

/// Result applied to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    /// Token of the request that produced the result.
    pub token: RequestToken,
    /// Sequencing outcome.
    pub result: Result<SequenceResponse, SequenceError>,
}

/// Owns a sequencer and keeps its route in step with edited input.
///
/// Every [`submit`](Self::submit) issues a new token, which makes any
/// computation already in flight stale. Once input has been quiet for the
/// debounce period the latest request is computed, unless it is identical to
/// the last request that produced a route.
///
/// # Examples
/// ```
/// use std::time::{Duration, Instant};
/// use carpool_core::HaversineEstimator;
/// use carpool_solver::{RouteSession, WaypointSequencer};
/// use carpool_solver::test_support::dallas_request;
///
/// let mut session = RouteSession::new(WaypointSequencer::new(HaversineEstimator::default()));
/// let start = Instant::now();
/// session.submit(dallas_request(), start);
/// assert!(session.poll(start).is_none());
///
/// let update = session.poll(start + Duration::from_millis(400)).expect("quiet period elapsed");
/// assert!(update.result.is_ok());
/// assert!(session.current().is_some());
/// ```
#[derive(Debug)]
pub struct RouteSession<S> {
    sequencer: S,
    debouncer: Debouncer,
    gate: RecomputeGate,
    pending: Option<PendingRequest>,
    in_flight: Option<(RequestToken, RequestKey)>,
    last_key: Option<RequestKey>,
    current: Option<SequenceResponse>,
}

impl<S: Sequencer> RouteSession<S> {
    /// Create a session with the default quiet period.
    #[must_use]
    pub fn new(sequencer: S) -> Self {
        Self::with_quiet_period(sequencer, DEFAULT_DEBOUNCE)
    }

    /// Create a session with an explicit quiet period.
    #[must_use]
    pub fn with_quiet_period(sequencer: S, quiet_period: Duration) -> Self {
        Self {
            sequencer,
            debouncer: Debouncer::new(quiet_period),
            gate: RecomputeGate::default(),
            pending: None,
            in_flight: None,
            last_key: None,
            current: None,
        }
    }

    /// Record edited input at `now`.
    pub fn submit(&mut self, request: SequenceRequest, now: Instant) -> RequestToken {
        let token = self.gate.issue();
        self.pending = Some(PendingRequest { token, request });
        self.debouncer.touch(now);
        token
    }

    /// Hand out the latest request once its quiet period has elapsed.
    ///
    /// Returns `None` while input is still changing, when nothing is
    /// pending, or when the request matches the last computed one.
    pub fn take_due(&mut self, now: Instant) -> Option<PendingRequest> {
        if !self.debouncer.poll(now) {
            return None;
        }
        let pending = self.pending.take()?;
        let key = pending.request.key();
        if self.last_key == Some(key) {
            log::debug!("request {} matches the current route; skipping", pending.token.get());
            return None;
        }
        self.in_flight = Some((pending.token, key));
        Some(pending)
    }

    /// Apply a result computed for `token`.
    ///
    /// Results for superseded tokens, and repeated results for the same
    /// token, are discarded and yield `None`.
    pub fn accept(
        &mut self,
        token: RequestToken,
        result: Result<SequenceResponse, SequenceError>,
    ) -> Option<SessionUpdate> {
        if !self.gate.accept(token) {
            log::debug!("discarding stale result for request {}", token.get());
            return None;
        }
        match &result {
            Ok(response) => {
                self.last_key = self
                    .in_flight
                    .take()
                    .filter(|(issued, _)| *issued == token)
                    .map(|(_, key)| key);
                self.current = Some(response.clone());
            }
            Err(err) => {
                log::warn!("recomputing route failed: {err}");
                self.in_flight = None;
            }
        }
        Some(SessionUpdate { token, result })
    }

    /// Compute and apply the latest request if it is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<SessionUpdate> {
        let PendingRequest { token, request } = self.take_due(now)?;
        let result = self.sequencer.sequence(&request);
        self.accept(token, result)
    }

    /// Most recently applied route.
    #[must_use]
    pub const fn current(&self) -> Option<&SequenceResponse> {
        self.current.as_ref()
    }

    /// Instant at which pending input becomes due.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// The wrapped sequencer.
    #[must_use]
    pub const fn sequencer(&self) -> &S {
        &self.sequencer
    }
}
