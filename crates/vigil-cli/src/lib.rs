//! vigil CLI - run scenario verifications against a web application.
//!
//! This crate provides the command-line interface over `vigil-harness`:
//! it loads scenario files and harness configuration, runs the scenarios in
//! headless Chrome, prints a summary and writes a JSON run report.
//!
//! # Architecture
//!
//! - [`cli`] - Argument definitions (clap derive)
//! - [`config`] - Layered harness configuration (figment)
//! - [`scenarios`] - Scenario file discovery and parsing
//! - [`report`] - The `report.json` written after a run
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal output helpers
//! - `commands` - `run` and `check`
//!
//! # Example
//!
//! ```rust,no_run
//! use vigil_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     // CLI command implementations...
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod report;
pub mod scenarios;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt, ScenarioFileError};
