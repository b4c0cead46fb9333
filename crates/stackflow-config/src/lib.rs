pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// Environment variable pointing directly at a configuration file
pub const CONFIG_PATH_ENV: &str = "STACKFLOW_CONFIG_PATH";

/// File names searched for, highest priority first
const CANDIDATES: [&str; 4] = [
    "stackflow.local.kdl",
    "stackflow.kdl",
    "stackflow.json",
    "cdk.json",
];

/// Returns the StackFlow configuration directory, creating it if needed
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Finds the configuration file for the current project
///
/// Search order:
/// 1. `STACKFLOW_CONFIG_PATH`
/// 2. current directory: stackflow.local.kdl, stackflow.kdl, stackflow.json, cdk.json
/// 3. the same names under `./.stackflow/`
/// 4. `~/.config/stackflow/stackflow.kdl`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            tracing::debug!(path = %path.display(), "Using config from environment");
            return Ok(path);
        }
        tracing::warn!(path = %path.display(), "{} points at a missing file", CONFIG_PATH_ENV);
    }

    let current_dir = std::env::current_dir()?;
    if let Some(path) = find_in_dir(&current_dir) {
        return Ok(path);
    }

    let project_dir = current_dir.join(".stackflow");
    if project_dir.is_dir()
        && let Some(path) = find_in_dir(&project_dir)
    {
        return Ok(path);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("stackflow").join("stackflow.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}
