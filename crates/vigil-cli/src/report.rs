//! The JSON run report written after `vigil run`.

use crate::error::{Result, ResultExt};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use vigil_harness::{HarnessError, RunResult};

/// File name of the report inside the artifacts directory.
pub const REPORT_FILE: &str = "report.json";

/// Every scenario attempted in one invocation.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// When the report was written.
    pub generated_at: DateTime<Utc>,
    /// Runs that completed.
    pub passed: usize,
    /// Runs that failed, timed out or never got a session.
    pub failed: usize,
    /// One entry per scenario, in input order.
    pub runs: Vec<ReportEntry>,
}

/// Outcome of one scenario as recorded in the report.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReportEntry {
    /// The scenario ran to a terminal state.
    Ran(RunResult),
    /// The harness could not run it at all.
    Errored {
        /// Scenario name
        scenario: String,
        /// Infrastructure error
        error: String,
    },
}

impl ReportEntry {
    /// Whether the scenario completed.
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Self::Ran(result) if result.is_success())
    }
}

impl RunReport {
    /// Builds the report from `run_all` output, pairing errors with their
    /// scenario names.
    pub fn new<'a>(
        names: impl IntoIterator<Item = &'a str>,
        results: Vec<std::result::Result<RunResult, HarnessError>>,
    ) -> Self {
        let runs: Vec<ReportEntry> = names
            .into_iter()
            .zip(results)
            .map(|(name, result)| match result {
                Ok(result) => ReportEntry::Ran(result),
                Err(e) => ReportEntry::Errored {
                    scenario: name.to_string(),
                    error: e.to_string(),
                },
            })
            .collect();
        let passed = runs.iter().filter(|r| r.passed()).count();

        Self {
            generated_at: Utc::now(),
            passed,
            failed: runs.len() - passed,
            runs,
        }
    }

    /// Whether every scenario completed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Writes `report.json` into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns I/O or serialization errors.
    pub async fn write(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .context(format!("Failed to create {}", dir.display()))?;
        let path = dir.join(REPORT_FILE);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json)
            .await
            .context(format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
