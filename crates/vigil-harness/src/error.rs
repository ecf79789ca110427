//! Error types for the verification harness.
//!
//! Failures are split by who has to act on them. `ScenarioError` is a caller
//! bug caught while a scenario is being built. `DriverError` is whatever the
//! browser collaborator reports. `HarnessError` is reserved for
//! infrastructure faults that stop the harness itself; everything that goes
//! wrong inside a step is folded into the `RunResult` instead.

use std::time::Duration;
use thiserror::Error;

/// Infrastructure faults that are fatal to the harness driver.
///
/// Step-level problems (missing elements, failed assertions, timeouts)
/// never surface here. They are recorded in the run's outcome.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Failed to launch the browser process.
    ///
    /// This typically occurs when Chrome/Chromium is not installed,
    /// or when there are permission issues with the executable.
    #[error("failed to launch browser: {reason}")]
    LaunchFailed {
        /// Human-readable reason for the launch failure
        reason: String,
        /// Optional underlying error that caused the failure
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to establish a Chrome DevTools Protocol connection or page.
    #[error("CDP connection failed: {0}")]
    ConnectionFailed(String),

    /// A scenario definition was rejected.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// A component panicked while a scenario was running.
    ///
    /// The session is still released before this is returned.
    #[error("scenario '{scenario}' aborted: {message}")]
    RunAborted {
        /// Name of the scenario whose run was aborted
        scenario: String,
        /// Panic payload, when it was a string
        message: String,
    },

    /// Generic I/O errors (artifact directories, report files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A malformed scenario definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    /// A locator has no usable discriminator.
    #[error("invalid locator at step {index}: {reason}")]
    InvalidLocator {
        /// Index of the offending step
        index: usize,
        /// What is missing
        reason: String,
    },

    /// The scenario name is empty.
    #[error("scenario name cannot be empty")]
    EmptyName,

    /// The entry URL is empty.
    #[error("scenario '{0}' has an empty entry URL")]
    EmptyEntryUrl(String),

    /// A step argument is unusable (empty URL, empty capture label, bad pattern).
    #[error("invalid step {index}: {reason}")]
    InvalidStep {
        /// Index of the offending step
        index: usize,
        /// What is wrong with it
        reason: String,
    },
}

/// Errors reported by the browser collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Navigation to a URL failed.
    #[error("navigation to '{url}' failed: {reason}")]
    NavigationFailed {
        /// The URL that failed to load
        url: String,
        /// Reason for the navigation failure
        reason: String,
    },

    /// JavaScript execution in the page context failed.
    #[error("JavaScript execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// An element handle no longer points at a live element.
    #[error("element handle '{0}' is stale")]
    StaleHandle(String),

    /// Input dispatch (click, typing) failed.
    #[error("input dispatch failed: {0}")]
    InputFailed(String),

    /// Screenshot capture failed.
    #[error("screenshot failed: {0}")]
    ScreenshotFailed(String),

    /// The browser did not shut down cleanly.
    #[error("browser shutdown failed: {0}")]
    ShutdownFailed(String),

    /// The session was already closed.
    #[error("browser session is already closed")]
    SessionClosed,
}

/// Why a locator could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The locator has no usable discriminator.
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// Nothing matched before the deadline.
    #[error("no element matches {locator}")]
    NotFound {
        /// Display form of the locator
        locator: String,
    },

    /// More than one element matched where exactly one was required.
    #[error("{count} elements match {locator}, expected exactly one")]
    AmbiguousMatch {
        /// Display form of the locator
        locator: String,
        /// How many elements matched
        count: usize,
    },

    /// The element appeared but the awaited condition never held.
    #[error("condition on {locator} did not hold within {waited:?}")]
    Timeout {
        /// Display form of the locator
        locator: String,
        /// How long the resolver waited
        waited: Duration,
    },

    /// The collaborator kept failing until the deadline.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// A specialized Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Result type returned by the browser collaborator.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
