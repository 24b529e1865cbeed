//! Config file location and resolution of the data paths it names.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::config::Config;
use crate::constants::APP_NAME;
use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Per-user configuration directory, e.g. `~/.config/feedercam/` on Linux.
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Default config file inside [`config_dir`].
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Anchor a relative data path at the directory holding `config_path`.
pub fn resolve_data_path(config_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match config_path.parent() {
        Some(base) if !base.as_os_str().is_empty() => base.join(path),
        _ => path.to_path_buf(),
    }
}

/// Resolve the recordings root and the verification log directory so the
/// service does not depend on its working directory.
pub fn resolve_data_paths(config: &mut Config, config_path: &Path) {
    let processor = &mut config.processor;
    processor.recordings_dir = resolve_data_path(config_path, &processor.recordings_dir);
    if let Some(dir) = config.ai.llm_verification.log_dir.as_mut() {
        *dir = resolve_data_path(config_path, dir);
    }
}
