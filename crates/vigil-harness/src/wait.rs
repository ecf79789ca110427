//! Deadlines and backoff polling for wait-bearing operations.
//!
//! Every wait in the harness (locator resolution, navigation readiness,
//! `WaitFor` steps) polls the live page with exponential backoff, bounded by
//! a [`Deadline`]. There are no unconditioned sleeps: each pause is clamped
//! to the time left, and the condition is evaluated once more at the deadline
//! before giving up.
//!
//! Time comes from `tokio::time`, so tests can run with a paused clock.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};

/// Default timeout for a single step (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// First poll interval (50ms).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound for the poll interval once backoff has grown it (1s).
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Growth factor applied to the poll interval after every miss.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Interval before the second check.
    pub initial: Duration,

    /// Cap on the interval.
    pub max: Duration,

    /// Multiplier applied after each unsuccessful check.
    pub factor: f64,
}

impl PollPolicy {
    /// Creates a policy, clamping nonsensical values.
    #[must_use]
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        Self {
            initial,
            max: max.max(initial),
            factor: if factor.is_finite() && factor >= 1.0 {
                factor
            } else {
                1.0
            },
        }
    }

    /// Returns the interval that follows `current`.
    #[must_use]
    pub fn grow(&self, current: Duration) -> Duration {
        current.mul_f64(self.factor).min(self.max)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_POLL_INTERVAL,
            DEFAULT_MAX_POLL_INTERVAL,
            DEFAULT_BACKOFF_FACTOR,
        )
    }
}

/// A point in time after which waiting must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start: Instant,
    at: Instant,
}

impl Deadline {
    /// A deadline `limit` from now.
    #[must_use]
    pub fn after(limit: Duration) -> Self {
        let start = Instant::now();
        Self {
            start,
            at: start + limit,
        }
    }

    /// Whichever of the two deadlines comes first.
    #[must_use]
    pub fn earliest(self, other: Deadline) -> Self {
        if other.at < self.at {
            other
        } else {
            self
        }
    }

    /// Time left before the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// True once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Time since the deadline was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// The instant at which the deadline expires.
    #[must_use]
    pub fn instant(&self) -> Instant {
        self.at
    }
}

/// Stateful backoff that sleeps between polls.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: PollPolicy,
    next: Duration,
}

impl Backoff {
    /// Starts at the policy's initial interval.
    #[must_use]
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            next: policy.initial,
        }
    }

    /// Sleeps for the next interval, clamped to the deadline.
    ///
    /// Returns `false` without sleeping once the deadline has passed, which
    /// is the caller's signal to stop polling.
    pub async fn pause(&mut self, deadline: &Deadline) -> bool {
        let remaining = deadline.remaining();
        if remaining.is_zero() {
            return false;
        }
        sleep(self.next.min(remaining)).await;
        self.next = self.policy.grow(self.next);
        true
    }
}

/// A wait condition was not satisfied within the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("wait condition '{condition}' timed out after {waited:?}")]
pub struct WaitTimeout {
    /// Description of the condition that timed out
    pub condition: String,
    /// How long we waited before timing out
    pub waited: Duration,
}

/// Waits for a condition that returns a `Result<bool, E>`.
///
/// Errors are treated as transient (the page may be mid-navigation and the
/// execution context gone) and polling continues until the deadline.
pub async fn wait_for_result<F, Fut, E>(
    condition: F,
    policy: PollPolicy,
    deadline: Deadline,
    description: &str,
) -> Result<(), WaitTimeout>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let mut backoff = Backoff::new(policy);

    loop {
        if let Ok(true) = condition().await {
            return Ok(());
        }

        if !backoff.pause(&deadline).await {
            return Err(WaitTimeout {
                condition: description.to_string(),
                waited: deadline.elapsed(),
            });
        }
    }
}
