//! Scenario execution state machine.
//!
//! `Pending → Running → (Completed | Failed | TimedOut)`. Steps run strictly
//! in order on one session; the first failing step ends the run, and nothing
//! is retried. Whatever the outcome, a final capture is attempted before the
//! result is assembled.

use crate::collector::{PageError, PageEvents};
use crate::config::RunSettings;
use crate::evidence::{EvidenceRecorder, FINAL_CAPTURE_LABEL};
use crate::executor::{StepError, StepExecutor};
use crate::result::{FailureReason, RunOutcome, RunResult, RunState};
use crate::scenario::Scenario;
use crate::session::Session;
use crate::wait::Deadline;
use chrono::Utc;
use tracing::{debug, debug_span, info, info_span, warn, Instrument};

/// Name of the text artifact listing a run's page errors.
pub const PAGE_ERRORS_ARTIFACT: &str = "page-errors.txt";

/// Runs one scenario on a session it does not own.
///
/// The caller acquires and releases the session; the runner only drives it.
pub struct ScenarioRunner<'a> {
    scenario: &'a Scenario,
    session: &'a dyn Session,
    events: PageEvents,
    recorder: EvidenceRecorder,
    settings: RunSettings,
    state: RunState,
}

impl<'a> ScenarioRunner<'a> {
    /// Creates a runner in the `Pending` state.
    pub fn new(
        scenario: &'a Scenario,
        session: &'a dyn Session,
        events: PageEvents,
        recorder: EvidenceRecorder,
        settings: RunSettings,
    ) -> Self {
        Self {
            scenario,
            session,
            events,
            recorder,
            settings,
            state: RunState::Pending,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Executes every step, then takes the final capture.
    ///
    /// Never fails: every step-level problem ends up in the outcome.
    pub async fn run(self) -> RunResult {
        let span = info_span!("scenario", scenario = %self.scenario.name());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(mut self) -> RunResult {
        let started_at = Utc::now();
        let steps = self.scenario.steps();
        let run_deadline = self.settings.run_timeout.map(Deadline::after);

        self.transition(RunState::Running);
        info!(steps = steps.len(), "scenario started");

        let executor = StepExecutor::new(self.scenario, self.session, &self.settings);
        let mut outcome = RunOutcome::Success;
        let mut steps_completed = 0;

        for (index, step) in steps.iter().enumerate() {
            let budget_spent = || run_deadline.is_some_and(|d| d.is_expired());
            if budget_spent() {
                warn!(index, "run budget exhausted");
                outcome = RunOutcome::Timeout { index };
                break;
            }

            let step_deadline =
                Deadline::after(step.timeout().unwrap_or(self.settings.step_timeout));
            let deadline = run_deadline.map_or(step_deadline, |run| step_deadline.earliest(run));

            // Backstop for a collaborator call that ignores the deadline.
            let hard_limit = deadline.remaining() + self.settings.poll.max;
            let span = debug_span!("step", step = index, action = step.kind.name());
            let result = tokio::time::timeout(
                hard_limit,
                executor.execute(index, step, deadline, &mut self.recorder),
            )
            .instrument(span)
            .await
            .unwrap_or(Err(StepError::TimedOut));

            match result {
                Ok(()) => {
                    steps_completed += 1;
                    debug!(index, action = step.kind.name(), "step passed");
                }
                Err(StepError::TimedOut) => {
                    warn!(index, action = step.kind.name(), "step timed out");
                    outcome = RunOutcome::Timeout { index };
                    break;
                }
                Err(StepError::Failed(
                    FailureReason::NotFound { .. } | FailureReason::AssertionFailed { .. },
                )) if budget_spent() => {
                    warn!(index, "run budget exhausted while waiting");
                    outcome = RunOutcome::Timeout { index };
                    break;
                }
                Err(StepError::Failed(reason)) => {
                    warn!(index, action = step.kind.name(), %reason, "step failed");
                    outcome = RunOutcome::StepFailure { index, reason };
                    break;
                }
            }
        }

        self.transition(outcome.state());

        self.recorder
            .capture(
                self.session,
                steps.len(),
                FINAL_CAPTURE_LABEL,
                self.settings.capture_timeout,
            )
            .await;

        let page_errors = self.events.errors();
        let console = self.events.console();
        let error_log = if page_errors.is_empty() {
            None
        } else {
            self.recorder
                .store_text(PAGE_ERRORS_ARTIFACT, &render_page_errors(&page_errors))
                .await
        };

        let finished_at = Utc::now().max(started_at);
        info!(
            %outcome,
            steps_completed,
            page_errors = page_errors.len(),
            "scenario finished"
        );

        RunResult {
            scenario: self.scenario.name().to_string(),
            outcome,
            steps_completed,
            started_at,
            finished_at,
            evidence: self.recorder.into_entries(),
            page_errors,
            console,
            error_log,
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "state change");
        self.state = next;
    }
}

fn render_page_errors(errors: &[PageError]) -> String {
    errors
        .iter()
        .map(|e| format!("[{}] {}\n", e.timestamp.to_rfc3339(), e.message))
        .collect()
}
