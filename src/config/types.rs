use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::version::Version;
use crate::config::ConfigError;
use crate::error::HandledError;

/// Placeholder inside a command replaced by the positional arguments.
pub const POSARGS: &str = "{posargs}";

/// Selector meaning "every declared environment".
pub const ALL_ENVS: &str = "ALL";

/// On-disk shape of `toxr.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub toxr: CoreConfig,
    /// Environments in declaration order.
    #[serde(default)]
    pub env: IndexMap<String, EnvConfig>,
}

/// Project-wide settings (`[toxr]` table).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Minimum toxr version the project needs (e.g. "0.4" or "1.2.3").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    /// Environments run when none are selected on the command line.
    pub env_list: Vec<String>,
    /// Binary re-executed when `min_version` is not met, relative to the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provision_binary: Option<PathBuf>,
}

/// One environment (`[env.<name>]` table).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvConfig {
    pub description: String,
    /// Commands run in order; each is a program followed by its arguments.
    pub commands: Vec<Vec<String>>,
    /// Working directory, relative to the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_dir: Option<PathBuf>,
    /// Keep running the remaining commands after a failure.
    pub ignore_errors: bool,
    pub set_env: IndexMap<String, String>,
}

/// Fully resolved configuration of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub(crate) file: ConfigFile,
    pub(crate) root: PathBuf,
    pub(crate) source: Option<PathBuf>,
    pub(crate) pos_args: Vec<String>,
}

impl Configuration {
    /// Configuration with no environments, used when no file is found.
    pub fn empty(root: impl Into<PathBuf>, pos_args: Vec<String>) -> Self {
        Self::from_file(ConfigFile::default(), root, None, pos_args)
    }

    pub fn from_file(
        file: ConfigFile,
        root: impl Into<PathBuf>,
        source: Option<PathBuf>,
        pos_args: Vec<String>,
    ) -> Self {
        Self {
            file,
            root: root.into(),
            source,
            pos_args,
        }
    }

    pub fn core(&self) -> &CoreConfig {
        &self.file.toxr
    }

    pub fn envs(&self) -> &IndexMap<String, EnvConfig> {
        &self.file.env
    }

    pub fn env(&self, name: &str) -> Option<&EnvConfig> {
        self.file.env.get(name)
    }

    /// Directory the configuration file lives in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file this configuration was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn pos_args(&self) -> &[String] {
        &self.pos_args
    }

    pub fn min_version(&self) -> Result<Option<Version>, ConfigError> {
        self.core()
            .min_version
            .as_deref()
            .map(|raw| {
                raw.parse::<Version>()
                    .map_err(|message| ConfigError::ValidationError {
                        message: format!("min_version: {message}"),
                    })
            })
            .transpose()
    }

    pub fn provision_binary(&self) -> Option<PathBuf> {
        self.core()
            .provision_binary
            .as_ref()
            .map(|path| self.root.join(path))
    }

    /// `env_list` if set, otherwise every declared environment.
    pub fn default_envs(&self) -> Vec<String> {
        if self.core().env_list.is_empty() {
            self.file.env.keys().cloned().collect()
        } else {
            self.core().env_list.clone()
        }
    }

    /// Resolve an `-e` selection into environment names, in the order given.
    pub fn select(&self, requested: &[String]) -> Result<Vec<String>, HandledError> {
        if requested.is_empty() {
            return Ok(self.default_envs());
        }
        if requested.iter().any(|name| name == ALL_ENVS) {
            return Ok(self.file.env.keys().cloned().collect());
        }

        let missing: Vec<&str> = requested
            .iter()
            .filter(|name| !self.file.env.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(HandledError::new(format!(
                "provided environments not found in configuration file: {}",
                missing.join(", ")
            )));
        }

        let mut selected: Vec<String> = Vec::with_capacity(requested.len());
        for name in requested {
            if !selected.contains(name) {
                selected.push(name.clone());
            }
        }
        Ok(selected)
    }

    /// Working directory of an environment.
    pub fn env_dir(&self, env: &EnvConfig) -> PathBuf {
        match &env.change_dir {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }

    /// Expand `{posargs}` in a command.
    ///
    /// A word equal to `{posargs}` becomes zero or more words; inside a word
    /// it is replaced by the space-joined positional arguments.
    pub fn expand_command(&self, command: &[String]) -> Vec<String> {
        let mut argv = Vec::with_capacity(command.len() + self.pos_args.len());
        for word in command {
            if word == POSARGS {
                argv.extend(self.pos_args.iter().cloned());
            } else if word.contains(POSARGS) {
                argv.push(word.replace(POSARGS, &self.pos_args.join(" ")));
            } else {
                argv.push(word.clone());
            }
        }
        argv
    }

    /// A copy of the file restricted to the named environments.
    pub fn subset(&self, names: &[String]) -> ConfigFile {
        ConfigFile {
            toxr: self.file.toxr.clone(),
            env: names
                .iter()
                .filter_map(|name| {
                    self.file
                        .env
                        .get(name)
                        .map(|env| (name.clone(), env.clone()))
                })
                .collect(),
        }
    }
}
