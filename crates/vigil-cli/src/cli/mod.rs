//! Command-line interface definition for vigil.
//!
//! # Command Structure
//!
//! - `vigil run` - Run scenario files in headless Chrome
//! - `vigil check` - Validate scenario files and configuration without a browser

mod commands;
mod tests;
mod validation;

use clap::Parser;

pub use commands::{CheckArgs, Command, RunArgs};
pub use validation::{parse_parallelism, parse_timeout_ms};

/// vigil - scenario verification for web applications
#[derive(Parser, Debug)]
#[command(
    name = "vigil",
    version,
    about = "Verify user journeys against a running web application",
    long_about = "vigil drives a headless browser through declarative scenarios\n\
                  (navigate, fill, click, wait, assert, capture) and reports how each\n\
                  run ended, the screenshots captured as evidence, and every uncaught\n\
                  page error seen along the way."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    ///
    /// Outputs plain text without ANSI color codes. Useful for logging to
    /// files or CI systems.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
