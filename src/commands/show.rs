use std::io::Write;
use std::str::FromStr;

use anyhow::Context;

use crate::config::Configuration;
use crate::error::{Fault, HandledError};
use crate::session::SessionState;

/// Output format of `config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Json,
}

impl FromStr for ConfigFormat {
    type Err = HandledError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            other => Err(HandledError::new(format!("unknown config format '{other}'"))),
        }
    }
}

/// `config`: print the configuration of the selected environments.
pub fn show_config(state: &SessionState) -> Result<i32, Fault> {
    let format = state
        .options()
        .value("format")
        .map(str::parse::<ConfigFormat>)
        .transpose()?
        .unwrap_or_default();
    let requested = state.options().list("env");
    let names = if requested.is_empty() {
        state.config().envs().keys().cloned().collect()
    } else {
        state.config().select(requested)?
    };

    let rendered = render_config(state.config(), &names, format)?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write configuration")?;
    Ok(0)
}

/// Serialize the `[toxr]` table plus the named environments.
pub fn render_config(
    config: &Configuration,
    names: &[String],
    format: ConfigFormat,
) -> Result<String, Fault> {
    let subset = config.subset(names);
    let rendered = match format {
        ConfigFormat::Toml => toml::to_string(&subset).context("failed to render TOML")?,
        ConfigFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(&subset).context("failed to render JSON")?;
            json.push('\n');
            json
        }
    };
    Ok(rendered)
}
