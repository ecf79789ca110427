//! Run outcomes.
//!
//! A scenario run always produces exactly one [`RunResult`], whether it
//! completed or stopped at a failing step, so a failed run is as inspectable
//! as a successful one.

use crate::collector::{ConsoleMessage, PageError};
use crate::error::ResolveError;
use crate::evidence::{ArtifactRef, Evidence};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Session acquired, nothing executed yet.
    Pending,
    /// Steps are executing.
    Running,
    /// Every step succeeded.
    Completed,
    /// A step failed.
    Failed,
    /// A step, or the run budget, ran out of time.
    TimedOut,
}

impl RunState {
    /// True for `Completed`, `Failed` and `TimedOut`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The locator had no usable discriminator.
    InvalidLocator {
        /// What is missing
        reason: String,
    },
    /// No element matched before the timeout.
    NotFound {
        /// The locator that matched nothing
        locator: String,
    },
    /// Several elements matched an action or assertion target.
    AmbiguousMatch {
        /// The locator that matched too much
        locator: String,
        /// Number of matches
        count: usize,
    },
    /// The element could not take the action at the moment of acting.
    NotInteractable {
        /// The target locator
        locator: String,
        /// `disabled`, `hidden`, `detached` or `not editable`
        reason: String,
    },
    /// A verification did not hold.
    AssertionFailed {
        /// What the step expected
        expected: String,
        /// What was last observed
        actual: String,
    },
    /// The page could not be loaded.
    Navigation {
        /// URL that failed
        url: String,
        /// Reason reported by the browser
        reason: String,
    },
    /// The browser collaborator reported an error.
    Driver {
        /// Error message
        message: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLocator { reason } => write!(f, "invalid locator: {reason}"),
            Self::NotFound { locator } => write!(f, "not found: {locator}"),
            Self::AmbiguousMatch { locator, count } => {
                write!(f, "ambiguous match: {count} elements match {locator}")
            }
            Self::NotInteractable { locator, reason } => {
                write!(f, "not interactable: {locator} is {reason}")
            }
            Self::AssertionFailed { expected, actual } => {
                write!(f, "assertion failed: expected {expected}, got {actual}")
            }
            Self::Navigation { url, reason } => write!(f, "navigation to {url} failed: {reason}"),
            Self::Driver { message } => write!(f, "browser error: {message}"),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// All steps executed without error.
    Success,
    /// A step failed.
    StepFailure {
        /// Index of the failing step
        index: usize,
        /// Why it failed
        reason: FailureReason,
    },
    /// A step exceeded its timeout, or the run exceeded its budget.
    Timeout {
        /// Index of the step that was abandoned
        index: usize,
    },
}

impl RunOutcome {
    /// The terminal state this outcome corresponds to.
    #[must_use]
    pub fn state(&self) -> RunState {
        match self {
            Self::Success => RunState::Completed,
            Self::StepFailure { .. } => RunState::Failed,
            Self::Timeout { .. } => RunState::TimedOut,
        }
    }

    /// Index of the step the run stopped at, if it stopped early.
    #[must_use]
    pub fn failed_step(&self) -> Option<usize> {
        match self {
            Self::Success => None,
            Self::StepFailure { index, .. } | Self::Timeout { index } => Some(*index),
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("completed"),
            Self::StepFailure { index, reason } => write!(f, "failed at step {index}: {reason}"),
            Self::Timeout { index } => write!(f, "timed out at step {index}"),
        }
    }
}

/// The complete outcome of one scenario execution.
///
/// Owned by the caller; the harness keeps no reference to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Scenario name.
    pub scenario: String,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Number of steps that succeeded.
    pub steps_completed: usize,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the final capture was taken.
    pub finished_at: DateTime<Utc>,
    /// Captured evidence, in capture order; the last entry is the final capture.
    pub evidence: Vec<Evidence>,
    /// Uncaught page errors, in arrival order.
    pub page_errors: Vec<PageError>,
    /// Console output, in arrival order.
    pub console: Vec<ConsoleMessage>,
    /// Text artifact listing the page errors, when there were any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_log: Option<ArtifactRef>,
}

impl RunResult {
    /// True if every step succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Success)
    }

    /// Terminal state of the run.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.outcome.state()
    }

    /// Evidence labels in capture order.
    #[must_use]
    pub fn evidence_labels(&self) -> Vec<&str> {
        self.evidence.iter().map(|e| e.label.as_str()).collect()
    }
}

impl From<ResolveError> for FailureReason {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidLocator(reason) => Self::InvalidLocator { reason },
            ResolveError::NotFound { locator } => Self::NotFound { locator },
            ResolveError::AmbiguousMatch { locator, count } => {
                Self::AmbiguousMatch { locator, count }
            }
            ResolveError::Timeout { locator, waited } => Self::Driver {
                message: format!("condition on {locator} did not hold within {waited:?}"),
            },
            ResolveError::Driver(e) => Self::Driver {
                message: e.to_string(),
            },
        }
    }
}
