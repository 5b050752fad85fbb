//! Project configuration: `toxr.toml` types, loading and validation.

mod loader;
mod types;
mod version;

pub use loader::{ConfigError, ConfigResolver, FileConfigResolver};
pub use types::{ConfigFile, Configuration, CoreConfig, EnvConfig, ALL_ENVS, POSARGS};
pub use version::Version;
