//! Command implementations for the vigil CLI.
//!
//! - [`run`] - Run scenarios in headless Chrome
//! - [`check`] - Validate scenario files and configuration
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and returns a Result.

pub mod check;
pub mod run;

pub use check::execute as check_execute;
pub use run::execute as run_execute;
