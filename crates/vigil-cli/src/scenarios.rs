//! Scenario file discovery and parsing.
//!
//! A scenario file holds one scenario in TOML or JSON. Directories given on
//! the command line are expanded to the `.toml` and `.json` files directly
//! inside them, sorted by name.

use crate::error::{Result, ScenarioFileError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use vigil_harness::Scenario;

const EXTENSIONS: [&str; 2] = ["toml", "json"];

/// Expand the command-line paths into scenario files, keeping their order.
///
/// # Errors
///
/// Returns `ScenarioFileError::NotFound` for a path that doesn't exist.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_scenario_extension(p))
                .collect();
            entries.sort();
            files.extend(entries);
        } else if path.exists() {
            files.push(path.clone());
        } else {
            return Err(ScenarioFileError::NotFound(path.clone()).into());
        }
    }
    Ok(files)
}

/// Parse one scenario file.
///
/// # Errors
///
/// Fails for unknown extensions, unreadable files, syntax errors and
/// scenarios that don't validate (blank locators, malformed URL patterns).
pub fn load(path: &Path) -> std::result::Result<Scenario, ScenarioFileError> {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ScenarioFileError::NotFound(path.to_path_buf())
        } else {
            ScenarioFileError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let invalid = |message: String| ScenarioFileError::Invalid {
        path: path.to_path_buf(),
        message,
    };

    match format.as_deref() {
        Some("toml") => toml::from_str(&text).map_err(|e| invalid(e.message().to_string())),
        Some("json") => serde_json::from_str(&text).map_err(|e| invalid(e.to_string())),
        _ => Err(ScenarioFileError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Load every file, failing on the first problem or on a repeated name.
///
/// # Errors
///
/// See [`load`]; also `DuplicateName` when two files share a scenario name.
pub fn load_all(files: &[PathBuf]) -> Result<Vec<Scenario>> {
    let mut names = HashSet::new();
    let mut scenarios = Vec::with_capacity(files.len());
    for path in files {
        let scenario = load(path)?;
        if !names.insert(scenario.name().to_string()) {
            return Err(ScenarioFileError::DuplicateName {
                name: scenario.name().to_string(),
                path: path.clone(),
            }
            .into());
        }
        scenarios.push(scenario);
    }
    Ok(scenarios)
}

fn has_scenario_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
