use std::io::{self, Write};

use anyhow::Context;

use crate::config::Configuration;
use crate::error::Fault;
use crate::session::SessionState;

/// `list`: print environment names and descriptions.
pub fn list_envs(state: &SessionState) -> Result<i32, Fault> {
    let defaults_only = state.options().flag("defaults_only");
    let mut stdout = io::stdout().lock();
    write_env_list(state.config(), defaults_only, &mut stdout)
        .context("failed to write environment list")?;
    Ok(0)
}

/// Write one line per environment: `name -> description`, aligned.
pub fn write_env_list(
    config: &Configuration,
    defaults_only: bool,
    out: &mut impl Write,
) -> io::Result<()> {
    let names = if defaults_only {
        config.default_envs()
    } else {
        config.envs().keys().cloned().collect()
    };
    let width = names.iter().map(String::len).max().unwrap_or(0);

    for name in &names {
        let description = config
            .env(name)
            .map(|env| env.description.as_str())
            .unwrap_or_default();
        if description.is_empty() {
            writeln!(out, "{name}")?;
        } else {
            writeln!(out, "{name:<width$} -> {description}")?;
        }
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;

    fn config() -> Configuration {
        let file: ConfigFile = toml::from_str(
            r#"
[toxr]
env_list = ["lint"]

[env.test]
description = "unit tests"

[env.lint]
description = "clippy"

[env.bench]
"#,
        )
        .unwrap();
        Configuration::from_file(file, ".", None, Vec::new())
    }

    #[test]
    fn lists_all_envs_aligned() {
        let mut out = Vec::new();
        write_env_list(&config(), false, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "test  -> unit tests\nlint  -> clippy\nbench\n"
        );
    }

    #[test]
    fn defaults_only_uses_env_list() {
        let mut out = Vec::new();
        write_env_list(&config(), true, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "lint -> clippy\n");
    }
}
