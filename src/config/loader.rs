use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::{ConfigFile, Configuration};
use crate::error::Fault;
use crate::options::ParsedOptions;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file '{path}' does not exist")]
    NotFound { path: PathBuf },

    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Turns parsed options and positional arguments into a [`Configuration`].
pub trait ConfigResolver: Send + Sync {
    fn resolve(&self, options: &ParsedOptions, pos_args: &[String]) -> Result<Configuration, Fault>;
}

/// Resolves `toxr.toml` from `--conf`, or by discovery from `--root`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileConfigResolver;

impl ConfigResolver for FileConfigResolver {
    fn resolve(&self, options: &ParsedOptions, pos_args: &[String]) -> Result<Configuration, Fault> {
        let cwd = std::env::current_dir().map_err(|err| {
            Fault::handled(format!("cannot determine the working directory: {err}"))
        })?;
        let root = options
            .value("root")
            .map(|dir| cwd.join(dir))
            .unwrap_or_else(|| cwd.clone());

        let config = match options.value("conf") {
            Some(path) => Configuration::load_from(&cwd.join(path), pos_args.to_vec())?,
            None => match Configuration::discover(&root) {
                Some(path) => Configuration::load_from(&path, pos_args.to_vec())?,
                None => {
                    tracing::debug!(root = %root.display(), "no {} found, using empty configuration", Configuration::FILE_NAME);
                    Configuration::empty(root, pos_args.to_vec())
                }
            },
        };
        Ok(config)
    }
}

impl Configuration {
    /// File name looked up during discovery.
    pub const FILE_NAME: &'static str = "toxr.toml";

    /// Find `toxr.toml` in `start` or the closest ancestor that has one.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(Self::FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load and validate configuration from a specific file.
    ///
    /// Unlike discovery, an explicitly named file must exist.
    pub fn load_from(path: &Path, pos_args: Vec<String>) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: ConfigFile = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let root = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let config = Configuration::from_file(file, root, Some(path.to_path_buf()), pos_args);
        config.validate()?;
        tracing::debug!(path = %path.display(), envs = config.envs().len(), "configuration loaded");
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - `min_version` parses
    /// - every `env_list` entry names a declared environment
    /// - no environment declares an empty command
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.min_version()?;

        if let Some(missing) = self
            .core()
            .env_list
            .iter()
            .find(|name| !self.envs().contains_key(name.as_str()))
        {
            return Err(ConfigError::ValidationError {
                message: format!("env_list names unknown environment '{}'", missing),
            });
        }

        for (name, env) in self.envs() {
            if let Some(index) = env.commands.iter().position(Vec::is_empty) {
                return Err(ConfigError::ValidationError {
                    message: format!("env '{}': command #{} is empty", name, index + 1),
                });
            }
        }

        Ok(())
    }
}
