//! Step execution.
//!
//! [`StepExecutor`] performs one step against the live session and reports
//! either success or a [`StepError`]. Every browser call is bounded by the
//! step's deadline, so a hung collaborator turns into a timeout rather than
//! a stuck run.

use crate::config::RunSettings;
use crate::error::{DriverError, ResolveError};
use crate::evidence::EvidenceRecorder;
use crate::locator::Locator;
use crate::resolve::LocatorResolver;
use crate::result::FailureReason;
use crate::scenario::{Readiness, Scenario, Step, StepKind, UrlPattern};
use crate::session::{ElementHandle, ElementSnapshot, Session};
use crate::wait::{wait_for_result, Deadline};
use std::future::Future;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, trace};

/// Why a step did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The step failed for a recorded reason.
    Failed(FailureReason),
    /// The step ran out of time.
    TimedOut,
}

impl From<FailureReason> for StepError {
    fn from(reason: FailureReason) -> Self {
        Self::Failed(reason)
    }
}

type StepResult = Result<(), StepError>;

/// The action an element is being prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interaction {
    Fill,
    Click,
}

/// Executes steps of one scenario against one session.
pub struct StepExecutor<'a> {
    scenario: &'a Scenario,
    session: &'a dyn Session,
    settings: &'a RunSettings,
}

impl<'a> StepExecutor<'a> {
    /// Creates an executor for a scenario run.
    pub fn new(scenario: &'a Scenario, session: &'a dyn Session, settings: &'a RunSettings) -> Self {
        Self {
            scenario,
            session,
            settings,
        }
    }

    /// Executes `step`, which is at position `index` in the scenario.
    ///
    /// `Capture` steps record into `recorder` and never fail.
    ///
    /// # Errors
    ///
    /// Returns `StepError::TimedOut` when the deadline passes before the
    /// step's condition holds, and `StepError::Failed` for every other
    /// failure.
    pub async fn execute(
        &self,
        index: usize,
        step: &Step,
        deadline: Deadline,
        recorder: &mut EvidenceRecorder,
    ) -> StepResult {
        match &step.kind {
            StepKind::Navigate { url } => self.navigate(url, deadline).await,
            StepKind::Fill { locator, value } => self.fill(locator, value, deadline).await,
            StepKind::Click { locator } => self.click(locator, deadline).await,
            StepKind::WaitFor { locator, state } => self
                .resolver()
                .wait_for_state(locator, *state, deadline)
                .await
                .map_err(resolve_failure),
            StepKind::AssertVisible { locator } => self.assert_visible(locator, deadline).await,
            StepKind::AssertHidden { locator } => self.assert_hidden(locator, deadline).await,
            StepKind::AssertText { locator, expected } => {
                self.assert_text(locator, expected, deadline).await
            }
            StepKind::WaitForUrl { pattern } => self.wait_for_url(pattern, deadline).await,
            StepKind::Capture { label } => {
                let capture_timeout = self.settings.capture_timeout.min(deadline.remaining());
                recorder
                    .capture(self.session, index, label, capture_timeout)
                    .await;
                Ok(())
            }
        }
    }

    fn resolver(&self) -> LocatorResolver<'a> {
        LocatorResolver::new(self.session, self.settings.poll)
    }

    async fn navigate(&self, url: &str, deadline: Deadline) -> StepResult {
        let target = self.scenario.resolve_url(url);
        debug!(url = %target, "navigating");

        bounded(deadline, self.session.goto(&target))
            .await?
            .map_err(|e| navigation_failure(&target, e))?;

        self.await_readiness(deadline).await
    }

    async fn await_readiness(&self, deadline: Deadline) -> StepResult {
        let readiness = self.settings.readiness;
        let complete_only = readiness != Readiness::DomContentLoaded;
        let session = self.session;

        wait_for_result(
            move || async move {
                let state = session.document_state().await?;
                Ok::<_, DriverError>(match state.ready_state.as_str() {
                    "complete" => true,
                    "interactive" => !complete_only,
                    _ => false,
                })
            },
            self.settings.poll,
            deadline,
            "document ready",
        )
        .await
        .map_err(|_| StepError::TimedOut)?;

        if readiness == Readiness::NetworkIdle {
            self.await_network_idle(deadline).await?;
        }
        Ok(())
    }

    /// Waits until no new resource entries appear for the idle window.
    async fn await_network_idle(&self, deadline: Deadline) -> StepResult {
        let window = self.settings.network_idle;
        let interval = self.settings.poll.initial;

        let mut last = self.resource_count().await;
        let mut quiet_since = Instant::now();

        while quiet_since.elapsed() < window {
            if deadline.is_expired() {
                return Err(StepError::TimedOut);
            }
            sleep(interval.min(deadline.remaining())).await;

            let count = self.resource_count().await;
            if count != last {
                trace!(?count, "network activity");
                last = count;
                quiet_since = Instant::now();
            }
        }
        Ok(())
    }

    async fn resource_count(&self) -> Option<u64> {
        self.session
            .document_state()
            .await
            .ok()
            .map(|state| state.resource_count)
    }

    async fn fill(&self, locator: &Locator, value: &str, deadline: Deadline) -> StepResult {
        let target = self
            .resolver()
            .resolve_unique(locator, true, deadline)
            .await
            .map_err(resolve_failure)?;
        let handle = self
            .ensure_interactable(locator, target, Interaction::Fill, deadline)
            .await?;

        bounded(deadline, self.session.fill(handle, value))
            .await?
            .map_err(driver_failure)?;
        Ok(())
    }

    async fn click(&self, locator: &Locator, deadline: Deadline) -> StepResult {
        let target = self
            .resolver()
            .resolve_unique(locator, true, deadline)
            .await
            .map_err(resolve_failure)?;
        let handle = self
            .ensure_interactable(locator, target, Interaction::Click, deadline)
            .await?;

        bounded(deadline, self.session.click(handle))
            .await?
            .map_err(driver_failure)?;
        Ok(())
    }

    /// Re-reads the element at the moment of action.
    async fn ensure_interactable(
        &self,
        locator: &Locator,
        target: ElementSnapshot,
        interaction: Interaction,
        deadline: Deadline,
    ) -> Result<ElementHandle, StepError> {
        let current = bounded(deadline, self.session.inspect(&target.handle))
            .await?
            .map_err(driver_failure)?;

        let problem = match current {
            None => Some("detached"),
            Some(el) if !el.visible => Some("hidden"),
            Some(el) if !el.enabled => Some("disabled"),
            Some(el) if interaction == Interaction::Fill && !el.editable => Some("not editable"),
            Some(_) => None,
        };

        match problem {
            Some(reason) => Err(StepError::Failed(FailureReason::NotInteractable {
                locator: locator.to_string(),
                reason: reason.to_string(),
            })),
            None => Ok(target.handle),
        }
    }

    async fn assert_visible(&self, locator: &Locator, deadline: Deadline) -> StepResult {
        let observed = self
            .resolver()
            .observe_unique(locator, deadline, |el| el.visible)
            .await;

        match observed {
            Ok(observation) if observation.satisfied => Ok(()),
            Ok(_) => Err(assertion_failed("visible", "hidden")),
            Err(ResolveError::NotFound { .. }) => Err(assertion_failed("visible", "no match")),
            Err(e) => Err(StepError::Failed(e.into())),
        }
    }

    async fn assert_hidden(&self, locator: &Locator, deadline: Deadline) -> StepResult {
        match self.resolver().wait_until_hidden(locator, deadline).await {
            Ok(0) => Ok(()),
            Ok(visible) => Err(assertion_failed(
                "hidden",
                &format!("{visible} visible match(es)"),
            )),
            Err(e) => Err(StepError::Failed(e.into())),
        }
    }

    async fn assert_text(&self, locator: &Locator, expected: &str, deadline: Deadline) -> StepResult {
        let wanted = normalize_text(expected);
        let observed = self
            .resolver()
            .observe_unique(locator, deadline, |el| normalize_text(&el.text) == wanted)
            .await;

        match observed {
            Ok(observation) if observation.satisfied => Ok(()),
            Ok(observation) => Err(assertion_failed(
                &format!("{wanted:?}"),
                &format!("{:?}", normalize_text(&observation.snapshot.text)),
            )),
            Err(ResolveError::NotFound { .. }) => {
                Err(assertion_failed(&format!("{wanted:?}"), "no match"))
            }
            Err(e) => Err(StepError::Failed(e.into())),
        }
    }

    async fn wait_for_url(&self, pattern: &str, deadline: Deadline) -> StepResult {
        let pattern = UrlPattern::new(pattern).map_err(|reason| {
            StepError::Failed(FailureReason::Driver {
                message: reason,
            })
        })?;
        let pattern = &pattern;
        let session = self.session;

        wait_for_result(
            move || async move {
                let url = session.current_url().await?;
                Ok::<_, DriverError>(pattern.matches(&url))
            },
            self.settings.poll,
            deadline,
            "url matches",
        )
        .await
        .map_err(|_| StepError::TimedOut)
    }
}

/// Runs a collaborator call, giving up at the deadline.
async fn bounded<F: Future>(deadline: Deadline, call: F) -> Result<F::Output, StepError> {
    timeout_at(deadline.instant(), call)
        .await
        .map_err(|_| StepError::TimedOut)
}

fn resolve_failure(err: ResolveError) -> StepError {
    match err {
        ResolveError::Timeout { .. } => StepError::TimedOut,
        other => StepError::Failed(other.into()),
    }
}

fn driver_failure(err: DriverError) -> StepError {
    StepError::Failed(FailureReason::Driver {
        message: err.to_string(),
    })
}

fn navigation_failure(target: &str, err: DriverError) -> StepError {
    let (url, reason) = match err {
        DriverError::NavigationFailed { url, reason } => (url, reason),
        other => (target.to_string(), other.to_string()),
    };
    StepError::Failed(FailureReason::Navigation { url, reason })
}

fn assertion_failed(expected: &str, actual: &str) -> StepError {
    StepError::Failed(FailureReason::AssertionFailed {
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Collapses runs of whitespace to one space and trims the ends.
pub(crate) fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  Remix\n  This\tAnimation "), "Remix This Animation");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn resolve_timeout_is_a_step_timeout() {
        let err = resolve_failure(ResolveError::Timeout {
            locator: "testid=x".into(),
            waited: std::time::Duration::from_secs(1),
        });
        assert_eq!(err, StepError::TimedOut);

        let err = resolve_failure(ResolveError::NotFound {
            locator: "testid=x".into(),
        });
        assert_eq!(
            err,
            StepError::Failed(FailureReason::NotFound {
                locator: "testid=x".into()
            })
        );
    }

    #[test]
    fn navigation_failure_keeps_browser_reason() {
        let err = navigation_failure(
            "http://localhost:3000/",
            DriverError::NavigationFailed {
                url: "http://localhost:3000/".into(),
                reason: "net::ERR_CONNECTION_REFUSED".into(),
            },
        );
        assert_eq!(
            err,
            StepError::Failed(FailureReason::Navigation {
                url: "http://localhost:3000/".into(),
                reason: "net::ERR_CONNECTION_REFUSED".into(),
            })
        );
    }
}
