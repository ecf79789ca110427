//! Harness configuration.
//!
//! `HarnessConfig` is plain serde data so callers can load it from any
//! source (the CLI layers defaults, a `vigil.toml`, environment variables
//! and flags with figment). Per-scenario overrides are folded in by
//! [`RunDefaults::settings_for`].

use crate::chrome::ChromeConfig;
use crate::scenario::{Readiness, Scenario};
use crate::wait::{PollPolicy, DEFAULT_BACKOFF_FACTOR};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Browser launch options.
    pub browser: ChromeConfig,
    /// Timeouts, readiness and polling defaults.
    pub defaults: RunDefaults,
    /// Where artifacts and reports are written.
    pub artifacts_dir: PathBuf,
    /// How many scenarios may run at once, each in its own session.
    pub parallelism: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            browser: ChromeConfig::default(),
            defaults: RunDefaults::default(),
            artifacts_dir: PathBuf::from("vigil-artifacts"),
            parallelism: 1,
        }
    }
}

/// Defaults applied to every scenario unless it overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    /// Timeout for a step without its own override.
    pub step_timeout_ms: u64,
    /// Budget for a whole run; unbounded when absent.
    pub run_timeout_ms: Option<u64>,
    /// Readiness signal for `Navigate`.
    pub readiness: Readiness,
    /// First poll interval.
    pub poll_initial_ms: u64,
    /// Poll interval cap.
    pub poll_max_ms: u64,
    /// Poll interval growth factor.
    pub poll_factor: f64,
    /// Time allowed for one evidence capture.
    pub capture_timeout_ms: u64,
    /// Quiet window for `network_idle` readiness.
    pub network_idle_ms: u64,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            step_timeout_ms: 30_000,
            run_timeout_ms: None,
            readiness: Readiness::DomContentLoaded,
            poll_initial_ms: 50,
            poll_max_ms: 1_000,
            poll_factor: DEFAULT_BACKOFF_FACTOR,
            capture_timeout_ms: 10_000,
            network_idle_ms: 500,
        }
    }
}

impl RunDefaults {
    /// Effective settings for one scenario run.
    #[must_use]
    pub fn settings_for(&self, scenario: &Scenario) -> RunSettings {
        let overrides = scenario.settings();
        RunSettings {
            step_timeout: Duration::from_millis(
                overrides.step_timeout_ms.unwrap_or(self.step_timeout_ms),
            ),
            run_timeout: overrides
                .run_timeout_ms
                .or(self.run_timeout_ms)
                .map(Duration::from_millis),
            readiness: overrides.readiness.unwrap_or(self.readiness),
            poll: PollPolicy::new(
                Duration::from_millis(self.poll_initial_ms),
                Duration::from_millis(self.poll_max_ms),
                self.poll_factor,
            ),
            capture_timeout: Duration::from_millis(self.capture_timeout_ms),
            network_idle: Duration::from_millis(self.network_idle_ms),
        }
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSettings {
    /// Timeout for steps without an override.
    pub step_timeout: Duration,
    /// Budget for the whole run.
    pub run_timeout: Option<Duration>,
    /// Readiness signal for `Navigate`.
    pub readiness: Readiness,
    /// Backoff for every poll.
    pub poll: PollPolicy,
    /// Time allowed for one evidence capture.
    pub capture_timeout: Duration,
    /// Quiet window for `network_idle`.
    pub network_idle: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        let defaults = RunDefaults::default();
        Self {
            step_timeout: Duration::from_millis(defaults.step_timeout_ms),
            run_timeout: None,
            readiness: defaults.readiness,
            poll: PollPolicy::default(),
            capture_timeout: Duration::from_millis(defaults.capture_timeout_ms),
            network_idle: Duration::from_millis(defaults.network_idle_ms),
        }
    }
}
