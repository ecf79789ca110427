//! Passive capture of page errors and console output.
//!
//! The Error Collector listens to the page for the whole life of a session,
//! independently of which step (if any) is executing. Backends push into a
//! [`PageEvents`] handle from their event tasks; the runner drains it into
//! the `RunResult` at the end.
//!
//! # Design
//!
//! We use `Arc<Mutex<Vec<_>>>` instead of channels because the event task
//! and the runner are the only parties, ordering must be preserved, and the
//! runner needs a consistent snapshot at finalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// An uncaught runtime fault surfaced by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    /// When the harness observed it.
    pub timestamp: DateTime<Utc>,
    /// Exception description as reported by the page.
    pub message: String,
}

/// The severity level of a console message.
///
/// Maps directly to JavaScript console methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleLevel {
    /// `console.log()`
    Log,
    /// `console.info()`
    Info,
    /// `console.warn()`
    Warning,
    /// `console.error()`
    Error,
    /// `console.debug()`
    Debug,
    /// Catch-all for other console APIs
    Other,
}

impl ConsoleLevel {
    /// Returns true if this is an error-level message.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, ConsoleLevel::Error)
    }
}

impl From<&str> for ConsoleLevel {
    fn from(s: &str) -> Self {
        match s {
            "log" => ConsoleLevel::Log,
            "info" => ConsoleLevel::Info,
            "warning" | "warn" => ConsoleLevel::Warning,
            "error" => ConsoleLevel::Error,
            "debug" => ConsoleLevel::Debug,
            _ => ConsoleLevel::Other,
        }
    }
}

/// A captured console message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Severity level (log, warn, error, etc.)
    pub level: ConsoleLevel,
    /// The formatted message text. Multiple arguments are joined with spaces.
    pub text: String,
    /// When the message was captured (harness time, not page time).
    pub timestamp: DateTime<Utc>,
    /// Source location if available (e.g., "app.js:42:10").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Default)]
struct EventLog {
    errors: Vec<PageError>,
    console: Vec<ConsoleMessage>,
    last: Option<DateTime<Utc>>,
}

impl EventLog {
    /// Wall-clock time, never earlier than the previous event.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamped = match self.last {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last = Some(stamped);
        stamped
    }
}

/// Thread-safe sink for page errors and console messages.
///
/// Cheaply cloneable; every clone feeds the same log.
#[derive(Debug, Clone, Default)]
pub struct PageEvents {
    inner: Arc<Mutex<EventLog>>,
}

impl PageEvents {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an uncaught page error.
    pub fn record_error(&self, message: impl Into<String>) {
        let mut log = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let timestamp = log.stamp();
        let message = message.into();
        tracing::debug!(%message, "page error");
        log.errors.push(PageError { timestamp, message });
    }

    /// Records a console message.
    pub fn record_console(&self, level: ConsoleLevel, text: impl Into<String>, source: Option<String>) {
        let mut log = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let timestamp = log.stamp();
        log.console.push(ConsoleMessage {
            level,
            text: text.into(),
            timestamp,
            source,
        });
    }

    /// Snapshot of the page errors collected so far.
    #[must_use]
    pub fn errors(&self) -> Vec<PageError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .errors
            .clone()
    }

    /// Snapshot of the console messages collected so far.
    #[must_use]
    pub fn console(&self) -> Vec<ConsoleMessage> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .console
            .clone()
    }

    /// Number of page errors collected so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .errors
            .len()
    }
}
