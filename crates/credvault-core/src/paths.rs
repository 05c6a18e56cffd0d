//! Path resolution utilities.

use crate::env;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the CredVault base directory (~/.credvault).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".credvault"))
}

/// Get the default config file path (~/.credvault/credvault.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("credvault.json5"))
}

/// Resolve the config file to use.
///
/// An explicit path wins, then `CREDVAULT_CONFIG`, then the default location.
pub fn resolve_config_file(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env::get_var(env::vars::CONFIG) {
        return Ok(PathBuf::from(path));
    }
    config_file()
}
