//! The harness driver.
//!
//! Acquires one exclusive session per scenario, hands it to a
//! [`ScenarioRunner`], and releases it exactly once afterwards, including
//! when the run panicked.

use crate::chrome::ChromeLauncher;
use crate::collector::PageEvents;
use crate::config::{HarnessConfig, RunDefaults};
use crate::error::{HarnessError, Result};
use crate::evidence::{ArtifactStore, EvidenceRecorder, FsArtifactStore};
use crate::result::RunResult;
use crate::runner::ScenarioRunner;
use crate::scenario::Scenario;
use crate::session::Launcher;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs scenarios, each in its own browser session.
pub struct Harness<L> {
    launcher: L,
    store: Arc<dyn ArtifactStore>,
    defaults: RunDefaults,
    parallelism: usize,
}

impl Harness<ChromeLauncher> {
    /// A Chrome-backed harness writing artifacts to `config.artifacts_dir`.
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Harness::new(
            ChromeLauncher::new(config.browser.clone()),
            Arc::new(FsArtifactStore::new(&config.artifacts_dir)),
        )
        .with_defaults(config.defaults.clone())
        .with_parallelism(config.parallelism)
    }
}

impl<L: Launcher> Harness<L> {
    /// Creates a harness with default timeouts and sequential execution.
    pub fn new(launcher: L, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            launcher,
            store,
            defaults: RunDefaults::default(),
            parallelism: 1,
        }
    }

    /// Replaces the run defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: RunDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets how many scenarios `run_all` executes at once (at least one).
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// The launcher sessions come from.
    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Runs one scenario.
    ///
    /// # Errors
    ///
    /// Only infrastructure faults are errors: the session could not be
    /// acquired, or the run panicked (the session is released first).
    /// Everything that goes wrong inside a step is in the `RunResult`.
    pub async fn run(&self, scenario: &Scenario) -> Result<RunResult> {
        let events = PageEvents::new();
        let session = self.launcher.launch(events.clone()).await?;
        debug!(scenario = scenario.name(), "session acquired");

        let settings = self.defaults.settings_for(scenario);
        let recorder = EvidenceRecorder::new(scenario.name(), Arc::clone(&self.store));
        let runner = ScenarioRunner::new(scenario, session.as_ref(), events, recorder, settings);

        let outcome = AssertUnwindSafe(runner.run()).catch_unwind().await;

        if let Err(e) = session.close().await {
            warn!(scenario = scenario.name(), error = %e, "failed to release session");
        } else {
            debug!(scenario = scenario.name(), "session released");
        }

        outcome.map_err(|panic| HarnessError::RunAborted {
            scenario: scenario.name().to_string(),
            message: panic_message(panic.as_ref()),
        })
    }

    /// Runs scenarios with up to `parallelism` sessions at once.
    ///
    /// Results come back in input order.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> Vec<Result<RunResult>> {
        stream::iter(scenarios)
            .map(|scenario| self.run(scenario))
            .buffered(self.parallelism)
            .collect()
            .await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
