//! Path utility functions

use anyhow::{anyhow, Result};
use std::path::PathBuf;

/// Path to the machine-wide WSL config (`~/.wslconfig`)
pub fn machine_config_path() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow!("no home directory found"))?
        .join(".wslconfig"))
}

/// Get the wslm settings directory path
pub fn app_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config directory found"))?
        .join("wslm"))
}

/// Path to the persisted profiles/rules file
pub fn settings_path() -> Result<PathBuf> {
    Ok(app_config_dir()?.join("config.json"))
}

/// Uniquely-named tar path in the OS temp dir for export/import staging.
/// A plain file, not a guarded tempfile: the move failure path relies on
/// it surviving the process.
pub fn temp_archive_path(name: &str, op: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}_{}_{}.tar", name, op, uuid::Uuid::new_v4()))
}
