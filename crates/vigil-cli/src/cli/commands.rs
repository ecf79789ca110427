use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::validation::{parse_parallelism, parse_timeout_ms};
use crate::config::ConfigFlags;

/// Available vigil subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run scenarios in headless Chrome
    ///
    /// Each scenario gets its own browser session. Screenshots and the run
    /// report (report.json) are written to the artifacts directory. Exits
    /// with a non-zero status if any scenario did not complete.
    Run(RunArgs),

    /// Validate scenario files and configuration
    ///
    /// Parses every scenario and the harness configuration without
    /// launching a browser.
    Check(CheckArgs),
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario files (TOML or JSON) or directories containing them
    ///
    /// Examples:
    ///   vigil run scenarios/create.toml
    ///   vigil run scenarios/
    #[arg(required = true, value_name = "SCENARIO")]
    pub scenarios: Vec<PathBuf>,

    /// Path to a harness config file (TOML or JSON)
    ///
    /// Defaults to ./vigil.toml when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of scenarios to run at once, each in its own browser
    #[arg(short = 'j', long, value_name = "N", value_parser = parse_parallelism)]
    pub parallel: Option<usize>,

    /// Directory for screenshots, page error logs and report.json
    #[arg(short = 'o', long, value_name = "DIR")]
    pub artifacts_dir: Option<PathBuf>,

    /// Default per-step timeout in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_timeout_ms)]
    pub step_timeout: Option<u64>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,
}

impl RunArgs {
    /// Flag values that override the loaded configuration.
    #[must_use]
    pub fn config_flags(&self) -> ConfigFlags {
        ConfigFlags {
            parallelism: self.parallel,
            artifacts_dir: self.artifacts_dir.clone(),
            step_timeout_ms: self.step_timeout,
            headed: self.headed,
        }
    }
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Scenario files (TOML or JSON) or directories containing them
    #[arg(required = true, value_name = "SCENARIO")]
    pub scenarios: Vec<PathBuf>,

    /// Path to a harness config file (TOML or JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
