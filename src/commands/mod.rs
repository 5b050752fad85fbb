//! Default command handlers.

mod list;
mod run;
mod show;

use std::io::Write;

use anyhow::Context;

use crate::error::Fault;
use crate::options::CommandHandlerTable;
use crate::session::SessionState;

pub use list::{list_envs, write_env_list};
pub use run::{run_envs, run_envs_parallel, EnvOutcome};
pub use show::{render_config, show_config, ConfigFormat};

pub const RUN: &str = "run";
pub const RUN_PARALLEL: &str = "run-parallel";
pub const LIST: &str = "list";
pub const CONFIG: &str = "config";
pub const HELP: &str = "help";
pub const VERSION: &str = "version";

/// Handler table used by the default option parser.
pub fn default_table() -> CommandHandlerTable {
    CommandHandlerTable::new()
        .with(RUN, run_envs)
        .with(RUN_PARALLEL, run_envs_parallel)
        .with(LIST, list_envs)
        .with(CONFIG, show_config)
        .with(HELP, print_rendered)
        .with(VERSION, print_rendered)
}

/// Print text rendered at parse time (help, version).
fn print_rendered(state: &SessionState) -> Result<i32, Fault> {
    let text = state.options().value("text").unwrap_or_default();
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write to stdout")?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_every_command() {
        let table = default_table();
        for name in [RUN, RUN_PARALLEL, LIST, CONFIG, HELP, VERSION] {
            assert!(table.contains(name), "missing handler for {name}");
        }
        assert_eq!(table.len(), 6);
    }
}
