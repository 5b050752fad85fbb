use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::ConfigError;

/// Env var overriding the location of the user defaults file.
pub const USER_CONFIG_ENV: &str = "TOXR_USER_CONFIG_FILE";

/// Per-user command line defaults (`~/.config/toxr/config.toml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserDefaults {
    /// Base verbosity before `-v`/`-q` are applied.
    pub verbosity: Option<i32>,
    pub no_provision: Option<bool>,
    /// Command used when none is given on the command line.
    pub default_command: Option<String>,
}

impl UserDefaults {
    /// `TOXR_USER_CONFIG_FILE` if set, else `<config_dir>/toxr/config.toml`.
    pub fn path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(USER_CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("toxr").join("config.toml"))
    }

    /// Load user defaults; a missing file yields the empty defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
