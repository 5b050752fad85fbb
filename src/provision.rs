//! Provisioning gate: optionally re-run the whole session in another runtime.

use std::path::Path;
use std::process::Command;

use crate::config::Version;
use crate::error::{Fault, HandledError};
use crate::scope::RUN_ID_ENV;
use crate::session::SessionState;

/// Set in the environment of a provisioned child run.
pub const PROVISIONED_ENV: &str = "TOXR_PROVISIONED";

const CLASSIFICATION: &str = "ProvisionError";

/// Decision of the provisioning gate.
///
/// `Exited(0)` is a completed provisioned run, not "nothing happened".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provision {
    /// The current runtime is suitable; continue to dispatch.
    NotProvisioned,
    /// A provisioned run finished with this exit code.
    Exited(i32),
}

impl Provision {
    pub fn exit_code(self) -> Option<i32> {
        match self {
            Provision::NotProvisioned => None,
            Provision::Exited(code) => Some(code),
        }
    }
}

pub trait Provisioner: Send + Sync {
    fn provision(&self, state: &SessionState) -> Result<Provision, Fault>;
}

/// Never provisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProvision;

impl Provisioner for NoProvision {
    fn provision(&self, _state: &SessionState) -> Result<Provision, Fault> {
        Ok(Provision::NotProvisioned)
    }
}

/// Re-runs the invocation with `provision_binary` when the running version
/// is below the configured `min_version`.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeProvisioner {
    current: Version,
}

impl RuntimeProvisioner {
    pub fn new(current: Version) -> Self {
        Self { current }
    }
}

impl Default for RuntimeProvisioner {
    fn default() -> Self {
        Self::new(Version::current())
    }
}

impl Provisioner for RuntimeProvisioner {
    fn provision(&self, state: &SessionState) -> Result<Provision, Fault> {
        let Some(required) = state.config().min_version()? else {
            return Ok(Provision::NotProvisioned);
        };
        if self.current >= required {
            tracing::debug!(%required, current = %self.current, "runtime satisfies min_version");
            return Ok(Provision::NotProvisioned);
        }

        let reason = format!(
            "toxr>={} is required, running {}",
            required, self.current
        );
        if state.options().flag("no_provision") {
            return Err(provision_error(format!(
                "{reason}; provisioning disabled by --no-provision"
            )));
        }
        if std::env::var_os(PROVISIONED_ENV).is_some() {
            return Err(provision_error(format!(
                "{reason} inside an already provisioned runtime"
            )));
        }
        let Some(binary) = state.config().provision_binary() else {
            return Err(provision_error(format!(
                "{reason} and no provision_binary is configured"
            )));
        };
        if !binary.is_file() {
            return Err(provision_error(format!(
                "{reason} and provision_binary '{}' does not exist",
                binary.display()
            )));
        }

        tracing::info!(binary = %binary.display(), "{reason}, provisioning");
        let code = reexec(&binary, state)?;
        tracing::debug!(code, "provisioned run finished");
        Ok(Provision::Exited(code))
    }
}

fn reexec(binary: &Path, state: &SessionState) -> Result<i32, Fault> {
    let status = Command::new(binary)
        .args(state.args())
        .env(PROVISIONED_ENV, "1")
        .env(RUN_ID_ENV, state.context().run_id())
        .status()
        .map_err(|err| {
            provision_error(format!("failed to start '{}': {err}", binary.display()))
        })?;

    match status.code() {
        Some(code) => Ok(code),
        None => {
            state.interrupt().check()?;
            Err(provision_error(format!(
                "provisioned run was terminated by a signal ({status})"
            )))
        }
    }
}

fn provision_error(message: String) -> Fault {
    HandledError::classified(CLASSIFICATION, message).into()
}
