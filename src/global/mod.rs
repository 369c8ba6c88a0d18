use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "meeting-archive";
const LOCK_FILE: &str = ".meeting-archive.lock";

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .context("Unable to determine config directory")
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Name of the single-instance lock file placed in the transcript directory.
pub fn lock_file_name() -> &'static str {
    LOCK_FILE
}
