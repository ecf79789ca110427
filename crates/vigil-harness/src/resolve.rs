//! Locator resolution against the live page.
//!
//! The resolver re-queries the page on every poll (nothing is cached across
//! polls or steps) and backs off exponentially between polls until the
//! caller's condition holds or the deadline passes.
//!
//! Uniqueness is strict: when a caller needs one element and several match,
//! resolution fails with `AmbiguousMatch` immediately. There is no
//! first-match fallback.
//!
//! Query errors are treated as transient, since the execution context
//! disappears during navigations. Only if the page is still erroring at the
//! deadline is the driver error reported.

use crate::error::{DriverError, ResolveError};
use crate::locator::Locator;
use crate::scenario::WaitState;
use crate::session::{ElementSnapshot, Session};
use crate::wait::{Backoff, Deadline, PollPolicy};
use tracing::trace;

/// What became of a unique element while waiting for a predicate.
#[derive(Debug)]
pub struct Observation {
    /// The most recent snapshot of the element.
    pub snapshot: ElementSnapshot,
    /// Whether the predicate held on that snapshot.
    pub satisfied: bool,
}

/// Resolves locators against one session.
#[derive(Clone, Copy)]
pub struct LocatorResolver<'a> {
    session: &'a dyn Session,
    poll: PollPolicy,
}

impl<'a> LocatorResolver<'a> {
    /// Creates a resolver polling with `poll`.
    pub fn new(session: &'a dyn Session, poll: PollPolicy) -> Self {
        Self { session, poll }
    }

    /// Resolves exactly one element, optionally waiting for it to be visible.
    ///
    /// # Errors
    ///
    /// - `NotFound` if nothing matched before the deadline
    /// - `AmbiguousMatch` as soon as more than one element matches
    /// - `Timeout` if the element existed but never became visible
    /// - `Driver` if the page kept failing until the deadline
    pub async fn resolve_unique(
        &self,
        locator: &Locator,
        require_visible: bool,
        deadline: Deadline,
    ) -> Result<ElementSnapshot, ResolveError> {
        let observation = self
            .observe_unique(locator, deadline, |el| !require_visible || el.visible)
            .await?;

        if observation.satisfied {
            Ok(observation.snapshot)
        } else {
            Err(ResolveError::Timeout {
                locator: locator.to_string(),
                waited: deadline.elapsed(),
            })
        }
    }

    /// Waits for exactly one element to satisfy `accept`.
    ///
    /// Returns the last observation when the deadline passes with the
    /// element present but the predicate unmet; callers decide whether that
    /// is a timeout or an assertion failure.
    ///
    /// # Errors
    ///
    /// `InvalidLocator`, `NotFound`, `AmbiguousMatch`, or `Driver`.
    pub async fn observe_unique<F>(
        &self,
        locator: &Locator,
        deadline: Deadline,
        accept: F,
    ) -> Result<Observation, ResolveError>
    where
        F: Fn(&ElementSnapshot) -> bool,
    {
        locator.validate().map_err(ResolveError::InvalidLocator)?;

        let mut backoff = Backoff::new(self.poll);
        let mut last: Option<ElementSnapshot> = None;
        let mut last_error: Option<DriverError> = None;

        loop {
            match self.session.query(locator).await {
                Ok(matches) if matches.len() > 1 => {
                    return Err(ResolveError::AmbiguousMatch {
                        locator: locator.to_string(),
                        count: matches.len(),
                    });
                }
                Ok(mut matches) => {
                    last_error = None;
                    if let Some(found) = matches.pop() {
                        if accept(&found) {
                            return Ok(Observation {
                                snapshot: found,
                                satisfied: true,
                            });
                        }
                        last = Some(found);
                    }
                }
                Err(e) => {
                    trace!(%locator, error = %e, "query failed, retrying");
                    last_error = Some(e);
                }
            }

            if !backoff.pause(&deadline).await {
                break;
            }
        }

        match (last, last_error) {
            (Some(snapshot), _) => Ok(Observation {
                snapshot,
                satisfied: false,
            }),
            (None, Some(e)) => Err(ResolveError::Driver(e)),
            (None, None) => Err(ResolveError::NotFound {
                locator: locator.to_string(),
            }),
        }
    }

    /// Waits until the set of matches reaches `state`.
    ///
    /// No uniqueness is required. A state that never holds is always a
    /// `Timeout`, never `NotFound`.
    ///
    /// # Errors
    ///
    /// `InvalidLocator`, `Timeout`, or `Driver`.
    pub async fn wait_for_state(
        &self,
        locator: &Locator,
        state: WaitState,
        deadline: Deadline,
    ) -> Result<(), ResolveError> {
        self.wait_for_matches(locator, deadline, |matches| state_holds(state, matches))
            .await
            .map(|_| ())
    }

    /// Waits until no match is visible, returning the last count of visible
    /// matches when the deadline passes (zero on success).
    ///
    /// # Errors
    ///
    /// `InvalidLocator` or `Driver`.
    pub async fn wait_until_hidden(
        &self,
        locator: &Locator,
        deadline: Deadline,
    ) -> Result<usize, ResolveError> {
        match self
            .wait_for_matches(locator, deadline, |matches| {
                state_holds(WaitState::Hidden, matches)
            })
            .await
        {
            Ok(_) => Ok(0),
            Err(ResolveError::Timeout { .. }) => {
                let matches = self.session.query(locator).await?;
                Ok(matches.iter().filter(|el| el.visible).count())
            }
            Err(e) => Err(e),
        }
    }

    async fn wait_for_matches<F>(
        &self,
        locator: &Locator,
        deadline: Deadline,
        holds: F,
    ) -> Result<Vec<ElementSnapshot>, ResolveError>
    where
        F: Fn(&[ElementSnapshot]) -> bool,
    {
        locator.validate().map_err(ResolveError::InvalidLocator)?;

        let mut backoff = Backoff::new(self.poll);
        let mut last_error: Option<DriverError> = None;

        loop {
            match self.session.query(locator).await {
                Ok(matches) if holds(&matches) => return Ok(matches),
                Ok(_) => last_error = None,
                Err(e) => last_error = Some(e),
            }

            if !backoff.pause(&deadline).await {
                break;
            }
        }

        match last_error {
            Some(e) => Err(ResolveError::Driver(e)),
            None => Err(ResolveError::Timeout {
                locator: locator.to_string(),
                waited: deadline.elapsed(),
            }),
        }
    }
}

fn state_holds(state: WaitState, matches: &[ElementSnapshot]) -> bool {
    match state {
        WaitState::Attached => !matches.is_empty(),
        WaitState::Visible => matches.iter().any(|el| el.visible),
        WaitState::Hidden => matches.iter().all(|el| !el.visible),
        WaitState::Detached => matches.is_empty(),
    }
}
