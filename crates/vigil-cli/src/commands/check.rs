//! Check command implementation.
//!
//! Validates configuration and scenario files without launching a browser.

use crate::cli::CheckArgs;
use crate::config::{self, ConfigFlags};
use crate::error::{CliError, Result};
use crate::scenarios;
use crate::ui;
use std::collections::HashSet;

/// Execute the check command.
///
/// Every file is checked, so one run reports all problems at once.
///
/// # Errors
///
/// Returns configuration errors immediately and
/// [`CliError::InvalidScenarios`] when any scenario file is invalid.
pub async fn execute(args: CheckArgs) -> Result<()> {
    ui::info("Checking configuration...");
    config::load(args.config.as_deref(), &ConfigFlags::default())?;
    ui::success("Configuration is valid");

    let files = scenarios::discover(&args.scenarios)?;
    if files.is_empty() {
        ui::warning("No scenario files found");
        return Ok(());
    }

    ui::info(&format!("Checking {} scenario file(s)...", files.len()));
    let mut names = HashSet::new();
    let mut invalid = 0;
    for path in &files {
        match scenarios::load(path) {
            Ok(scenario) if !names.insert(scenario.name().to_string()) => {
                invalid += 1;
                ui::error(&format!(
                    "{}: duplicate scenario name '{}'",
                    path.display(),
                    scenario.name()
                ));
            }
            Ok(scenario) => ui::success(&format!(
                "{}: '{}' ({} steps)",
                path.display(),
                scenario.name(),
                scenario.steps().len()
            )),
            Err(e) => {
                invalid += 1;
                ui::error(&e.to_string());
            }
        }
    }

    if invalid > 0 {
        return Err(CliError::InvalidScenarios {
            invalid,
            total: files.len(),
        });
    }
    ui::success("All checks passed!");
    Ok(())
}
