//! Bookkeeping for recomputing a route while its inputs keep changing.
//!
//! [`Debouncer`] decides when input has been quiet long enough to start a
//! computation. [`RecomputeGate`] hands out monotonically increasing
//! [`RequestToken`]s so that a result is applied only if no newer request
//! was issued after it. Both are clock-agnostic: callers pass `now`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default quiet period before a recomputation starts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Identifies one recomputation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Sequence number of the request.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Drops results that were overtaken by a newer request.
///
/// # Examples
/// ```
/// use carpool_core::RecomputeGate;
///
/// let gate = RecomputeGate::default();
/// let stale = gate.issue();
/// let fresh = gate.issue();
/// assert!(!gate.accept(stale));
/// assert!(gate.accept(fresh));
/// ```
#[derive(Debug, Default)]
pub struct RecomputeGate {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl RecomputeGate {
    /// Issue a token for a new request. Earlier tokens become stale.
    #[must_use]
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.issued.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `token` is the most recently issued one.
    #[must_use]
    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.issued.load(Ordering::Acquire) == token.0
    }

    /// Mark `token`'s result as applied if it is still the latest.
    ///
    /// Returns `false` for stale tokens and for a token whose result was
    /// already applied, so each result is applied at most once.
    #[must_use]
    pub fn accept(&self, token: RequestToken) -> bool {
        if !self.is_latest(token) {
            return false;
        }
        self.applied.fetch_max(token.0, Ordering::AcqRel) < token.0
    }

    /// Token of the most recently applied result, if any.
    #[must_use]
    pub fn last_applied(&self) -> Option<RequestToken> {
        match self.applied.load(Ordering::Acquire) {
            0 => None,
            value => Some(RequestToken(value)),
        }
    }
}

/// Trailing-edge debounce driven by explicit timestamps.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet_period: Duration,
    pending_since: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub const fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending_since: None,
        }
    }

    /// Configured quiet period.
    #[must_use]
    pub const fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Record an input change at `now`, restarting the quiet period.
    pub fn touch(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    /// Whether a change is waiting to fire.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Instant at which the pending change fires.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending_since.map(|since| since + self.quiet_period)
    }

    /// Fire if the quiet period has elapsed at `now`.
    ///
    /// Returns `true` once per burst of changes.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }
}
