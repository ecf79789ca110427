//! Layered harness configuration.
//!
//! Priority: command-line flags > `VIGIL_*` environment variables > config
//! file (`--config`, or `./vigil.toml` when present) > defaults.
//!
//! Environment variables nest with `__`, e.g.
//! `VIGIL_DEFAULTS__STEP_TIMEOUT_MS=5000` or `VIGIL_BROWSER__HEADLESS=false`.

use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};
use vigil_harness::HarnessConfig;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "vigil.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "VIGIL_";

/// Command-line values that override every other source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFlags {
    /// `--parallel`
    pub parallelism: Option<usize>,
    /// `--artifacts-dir`
    pub artifacts_dir: Option<PathBuf>,
    /// `--step-timeout`
    pub step_timeout_ms: Option<u64>,
    /// `--headed`
    pub headed: bool,
}

impl ConfigFlags {
    fn merge_into(&self, mut figment: Figment) -> Figment {
        if let Some(n) = self.parallelism {
            figment = figment.merge(Serialized::default("parallelism", n));
        }
        if let Some(dir) = &self.artifacts_dir {
            figment = figment.merge(Serialized::default("artifacts_dir", dir));
        }
        if let Some(ms) = self.step_timeout_ms {
            figment = figment.merge(Serialized::default("defaults.step_timeout_ms", ms));
        }
        if self.headed {
            figment = figment.merge(Serialized::default("browser.headless", false));
        }
        figment
    }
}

/// Load the harness configuration from all sources.
///
/// # Errors
///
/// Fails when an explicit `config_path` is missing or has an unknown
/// extension, when a layer doesn't deserialize, or when a value is out of
/// range.
pub fn load(config_path: Option<&Path>, flags: &ConfigFlags) -> Result<HarnessConfig> {
    let mut figment = Figment::new().merge(Serialized::defaults(HarnessConfig::default()));

    let config_file = match config_path {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf()).into()),
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            default_path.exists().then(|| default_path.to_path_buf())
        }
    };

    if let Some(path) = config_file {
        tracing::debug!(path = %path.display(), "loading config file");
        figment = match extension(&path).as_deref() {
            Some("toml") => figment.merge(Toml::file(&path)),
            Some("json") => figment.merge(Json::file(&path)),
            _ => return Err(ConfigError::UnsupportedFormat(path).into()),
        };
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    figment = flags.merge_into(figment);

    let config: HarnessConfig = figment
        .extract()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Reject values the harness can't run with.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` naming the offending key.
pub fn validate(config: &HarnessConfig) -> Result<()> {
    if config.parallelism == 0 {
        return Err(invalid("parallelism", "0", "Use at least 1 session"));
    }
    let defaults = &config.defaults;
    if defaults.step_timeout_ms == 0 {
        return Err(invalid(
            "defaults.step_timeout_ms",
            "0",
            "Step timeouts must be greater than zero",
        ));
    }
    if defaults.run_timeout_ms == Some(0) {
        return Err(invalid(
            "defaults.run_timeout_ms",
            "0",
            "Omit run_timeout_ms for an unbounded run",
        ));
    }
    if defaults.poll_initial_ms == 0 || defaults.poll_max_ms < defaults.poll_initial_ms {
        return Err(invalid(
            "defaults.poll_max_ms",
            &defaults.poll_max_ms.to_string(),
            "poll_initial_ms must be positive and no larger than poll_max_ms",
        ));
    }
    if defaults.poll_factor.is_nan() || defaults.poll_factor < 1.0 {
        return Err(invalid(
            "defaults.poll_factor",
            &defaults.poll_factor.to_string(),
            "The backoff factor must be at least 1.0",
        ));
    }
    let (width, height) = config.browser.window_size;
    if width == 0 || height == 0 {
        return Err(invalid(
            "browser.window_size",
            &format!("[{width}, {height}]"),
            "Both dimensions must be positive",
        ));
    }
    Ok(())
}

fn invalid(field: &str, value: &str, hint: &str) -> crate::error::CliError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        hint: hint.to_string(),
    }
    .into()
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}
