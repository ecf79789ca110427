//! Error handling for the vigil CLI.
//!
//! `CliError` is the top-level type returned by commands. Domain errors
//! (`ConfigError`, `ScenarioFileError`, the harness's `HarnessError`)
//! convert into it with `?`. At `main`, [`cli_error_to_miette`] turns it
//! into a miette report.
//!
//! A scenario that fails or times out is not an error of the CLI itself;
//! `run` reports it and then returns [`CliError::ScenariosFailed`] so the
//! process exits non-zero.

use std::path::PathBuf;
use thiserror::Error;
use vigil_harness::HarnessError;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Harness configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A scenario file could not be loaded
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioFileError),

    /// Infrastructure fault from the harness
    #[error("Harness error: {0}")]
    Harness(#[from] HarnessError),

    /// Some scenario files failed validation
    #[error("{invalid} of {total} scenario file(s) are invalid")]
    InvalidScenarios {
        /// Files that failed to load
        invalid: usize,
        /// Files checked
        total: usize,
    },

    /// Some scenarios did not complete
    #[error("{failed} of {total} scenario(s) did not complete")]
    ScenariosFailed {
        /// Runs that failed, timed out or were aborted
        failed: usize,
        /// Runs attempted
        total: usize,
    },

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a vigil.toml file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// The config file extension is neither .toml nor .json
    #[error("Unsupported config format: {}\n\nHint: Use a .toml or .json file", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Layered configuration failed to deserialize
    #[error("Invalid configuration: {0}\n\nHint: Check vigil.toml and VIGIL_* environment variables")]
    Invalid(String),

    /// A value is out of range
    #[error("Invalid value for {field}: {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Config key
        field: String,
        /// The rejected value
        value: String,
        /// How to fix it
        hint: String,
    },
}

/// Errors loading one scenario file.
#[derive(Debug, Error)]
pub enum ScenarioFileError {
    /// The path doesn't exist
    #[error("Scenario file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The extension is neither .toml nor .json
    #[error("Unsupported scenario format: {}\n\nHint: Scenario files must end in .toml or .json", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The file exists but couldn't be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// The file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file doesn't describe a valid scenario
    #[error("Invalid scenario in {}: {message}", .path.display())]
    Invalid {
        /// The file
        path: PathBuf,
        /// Parser or validation message
        message: String,
    },

    /// Two files declare the same scenario name
    #[error("Duplicate scenario name '{name}' in {}\n\nHint: Scenario names must be unique, they key the artifact directories", .path.display())]
    DuplicateName {
        /// The repeated name
        name: String,
        /// The second file using it
        path: PathBuf,
    },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turns a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Prefixes the error with a message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{msg}: {err}"))
        })
    }
}

/// Convert a `CliError` into a miette report.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::ScenariosFailed { .. } => miette::miette!(
            help = "See report.json in the artifacts directory for evidence and page errors",
            "{}",
            err
        ),
        CliError::Harness(HarnessError::LaunchFailed { .. }) => miette::miette!(
            help = "Install Chrome or Chromium, or set browser.chrome_path in vigil.toml",
            "{}",
            err
        ),
        _ => miette::miette!("{}", err),
    }
}
