use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Configuration, EnvConfig};
use crate::error::Fault;
use crate::interrupt::InterruptFlag;
use crate::session::SessionState;

/// Exit code recorded for a command that could not be started.
const SPAWN_FAILURE: i32 = 1;

/// Result of running one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOutcome {
    pub name: String,
    pub code: i32,
    pub elapsed: Duration,
}

impl EnvOutcome {
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

/// `run`: selected environments one after another.
pub fn run_envs(state: &SessionState) -> Result<i32, Fault> {
    let config = state.config();
    let names = config.select(state.options().list("env"))?;

    let mut outcomes = Vec::with_capacity(names.len());
    for name in &names {
        let Some(env) = config.env(name) else {
            continue;
        };
        outcomes.push(run_env(name, env, config, state.interrupt())?);
    }
    Ok(report(&outcomes, state.elapsed()))
}

/// `run-parallel`: one worker thread per selected environment.
pub fn run_envs_parallel(state: &SessionState) -> Result<i32, Fault> {
    let config = Arc::new(state.config().clone());
    let names = config.select(state.options().list("env"))?;

    let mut workers = Vec::with_capacity(names.len());
    for name in names {
        let Some(env) = config.env(&name).cloned() else {
            continue;
        };
        let config = Arc::clone(&config);
        let interrupt = state.interrupt().clone();
        let worker_name = name.clone();
        let handle = state
            .context()
            .spawn(format!("env-{name}"), move || {
                run_env(&worker_name, &env, &config, &interrupt)
            })
            .map_err(|err| anyhow::anyhow!("failed to start worker for '{name}': {err}"))?;
        workers.push((name, handle));
    }

    let mut outcomes = Vec::with_capacity(workers.len());
    let mut first_fault = None;
    for (name, handle) in workers {
        match handle.join() {
            Ok(Ok(outcome)) => outcomes.push(outcome),
            Ok(Err(fault)) => {
                if first_fault.is_none() {
                    first_fault = Some(fault);
                }
            }
            Err(_) => {
                if first_fault.is_none() {
                    first_fault = Some(Fault::Defect(anyhow::anyhow!(
                        "worker for '{name}' panicked"
                    )));
                }
            }
        }
    }
    if let Some(fault) = first_fault {
        return Err(fault);
    }
    Ok(report(&outcomes, state.elapsed()))
}

/// Run the commands of one environment.
///
/// A failing command stops the environment unless `ignore_errors` is set;
/// the environment's code is the first failure seen.
fn run_env(
    name: &str,
    env: &EnvConfig,
    config: &Configuration,
    interrupt: &InterruptFlag,
) -> Result<EnvOutcome, Fault> {
    let started = Instant::now();
    let dir = config.env_dir(env);
    let mut code = 0;

    for command in &env.commands {
        interrupt.check()?;
        let argv = config.expand_command(command);
        let Some((program, args)) = argv.split_first() else {
            continue;
        };
        let cmdline = argv.join(" ");
        tracing::info!(env = name, "commands> {cmdline}");

        let exit = match Command::new(program)
            .args(args)
            .current_dir(&dir)
            .envs(&env.set_env)
            .status()
        {
            Ok(status) => match status.code() {
                Some(exit) => exit,
                None => {
                    interrupt.check()?;
                    tracing::error!(env = name, "'{cmdline}' terminated by a signal ({status})");
                    SPAWN_FAILURE
                }
            },
            Err(err) => {
                tracing::error!(env = name, error = %err, "failed to start '{program}'");
                SPAWN_FAILURE
            }
        };

        if exit != 0 {
            tracing::warn!(env = name, exit, "'{cmdline}' failed");
            if code == 0 {
                code = exit;
            }
            if !env.ignore_errors {
                break;
            }
        }
    }

    Ok(EnvOutcome {
        name: name.to_string(),
        code,
        elapsed: started.elapsed(),
    })
}

/// Log a summary line per environment and compute the overall exit code.
fn report(outcomes: &[EnvOutcome], total: Duration) -> i32 {
    for outcome in outcomes {
        if outcome.succeeded() {
            tracing::info!(
                "  {}: OK ({:.2} seconds)",
                outcome.name,
                outcome.elapsed.as_secs_f64()
            );
        } else {
            tracing::warn!(
                "  {}: FAIL code {} ({:.2} seconds)",
                outcome.name,
                outcome.code,
                outcome.elapsed.as_secs_f64()
            );
        }
    }

    let code = outcomes
        .iter()
        .map(|outcome| outcome.code)
        .find(|&code| code != 0)
        .unwrap_or(0);
    if code == 0 {
        tracing::info!("  congratulations :) ({:.2} seconds)", total.as_secs_f64());
    } else {
        tracing::warn!("  evaluation failed :( ({:.2} seconds)", total.as_secs_f64());
    }
    code
}
