//! Run command implementation.

use crate::cli::RunArgs;
use crate::config;
use crate::error::{CliError, Result};
use crate::report::RunReport;
use crate::scenarios;
use crate::ui;
use std::time::Instant;
use tracing::debug;
use vigil_harness::Harness;

/// Execute the run command.
///
/// 1. Load the harness configuration (defaults, file, env, flags)
/// 2. Load and validate every scenario file
/// 3. Run them, `parallelism` sessions at a time
/// 4. Print the summary and write `report.json`
///
/// # Errors
///
/// Configuration and scenario file problems fail before any browser is
/// launched. After the run, returns [`CliError::ScenariosFailed`] if any
/// scenario did not complete.
pub async fn execute(args: RunArgs) -> Result<()> {
    let config = config::load(args.config.as_deref(), &args.config_flags())?;
    let files = scenarios::discover(&args.scenarios)?;
    let scenarios = scenarios::load_all(&files)?;

    if scenarios.is_empty() {
        ui::warning("No scenario files found");
        return Ok(());
    }

    debug!(?config, "harness configuration");
    ui::info(&format!(
        "Running {} scenario(s), {} at a time",
        scenarios.len(),
        config.parallelism.min(scenarios.len())
    ));

    let harness = Harness::from_config(&config);
    let started = Instant::now();
    let results = harness.run_all(&scenarios).await;
    let elapsed = started.elapsed();

    let report = RunReport::new(scenarios.iter().map(|s| s.name()), results);
    ui::print_run_summary(&report, elapsed);

    let path = report.write(&config.artifacts_dir).await?;
    ui::info(&format!("Report written to {}", path.display()));

    if report.all_passed() {
        ui::success("All scenarios completed");
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: report.failed,
            total: report.runs.len(),
        })
    }
}
