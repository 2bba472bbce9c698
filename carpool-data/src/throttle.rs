//! Minimum-interval rate limiting shared by every outbound request.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default spacing between requests; public geocoders ask for at most one
/// request per second.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// The limiter did not admit a request within the configured bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limiter queue wait exceeded {max_wait:?}")]
pub struct RateLimitTimeout {
    /// Configured bound on queue wait.
    pub max_wait: Duration,
}

/// First-in, first-out limiter spacing requests by a minimum interval.
///
/// Construct one per upstream budget and share it via `Arc` between every
/// client drawing on that budget. Waiters are admitted in arrival order
/// because Tokio's mutex is fair.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use carpool_data::RateLimiter;
///
/// let limiter = RateLimiter::new(Duration::from_millis(10));
/// let runtime = tokio::runtime::Builder::new_current_thread()
///     .enable_time()
///     .build()?;
/// runtime.block_on(async {
///     limiter.acquire().await?;
///     limiter.acquire().await
/// })?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    max_wait: Option<Duration>,
    last: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl RateLimiter {
    /// Create a limiter admitting one request per `min_interval`.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            max_wait: None,
            last: Mutex::new(None),
        }
    }

    /// Bound how long a request may wait for admission.
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Configured spacing between requests.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request may be sent.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitTimeout`] when a wait bound is configured and
    /// admission would take longer. A timed-out caller consumes no slot.
    pub async fn acquire(&self) -> Result<(), RateLimitTimeout> {
        match self.max_wait {
            Some(max_wait) => tokio::time::timeout(max_wait, self.admit())
                .await
                .map_err(|_| RateLimitTimeout { max_wait }),
            None => {
                self.admit().await;
                Ok(())
            }
        }
    }

    async fn admit(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.min_interval).await;
        }
        *last = Some(Instant::now());
    }
}
