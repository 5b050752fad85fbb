//! Run orchestrator: invocation in, exit code out.
//!
//! ```text
//! RunScope ─┬─ build_state ─→ provision ─┬─ Exited(code) ──────────→ code
//!           │                            └─ NotProvisioned → dispatch → code
//!           └─ classify(outcome)
//! ```

use anyhow::Context;

use crate::config::{ConfigResolver, FileConfigResolver};
use crate::dispatch::dispatch;
use crate::error::{classify, Fault};
use crate::options::{ClapParser, OptionParser};
use crate::provision::{Provision, Provisioner, RuntimeProvisioner};
use crate::scope::{RunContext, RunScope, ScopeSettings, ThreadRegistry};
use crate::session::build_state;

/// Presence of this variable prints the run's threads after it finishes.
pub const SHOW_THREADS_ENV: &str = "_TOXR_SHOW_THREAD";

/// Drives one invocation through its collaborators.
pub struct Orchestrator {
    parser: Box<dyn OptionParser>,
    resolver: Box<dyn ConfigResolver>,
    provisioner: Box<dyn Provisioner>,
    settings: ScopeSettings,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(
            ClapParser::default(),
            FileConfigResolver,
            RuntimeProvisioner::default(),
        )
    }
}

impl Orchestrator {
    pub fn new(
        parser: impl OptionParser + 'static,
        resolver: impl ConfigResolver + 'static,
        provisioner: impl Provisioner + 'static,
    ) -> Self {
        Self {
            parser: Box::new(parser),
            resolver: Box::new(resolver),
            provisioner: Box::new(provisioner),
            settings: ScopeSettings::default(),
        }
    }

    pub fn with_scope_settings(mut self, settings: ScopeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Run one invocation and classify its outcome.
    ///
    /// `Ok` carries the exit code for every success, command failure, handled
    /// error and interruption. `Err` is an unhandled fault.
    pub fn execute(&self, args: &[String]) -> anyhow::Result<i32> {
        let mut threads = scopeguard::guard(None::<ThreadRegistry>, |threads| {
            if std::env::var_os(SHOW_THREADS_ENV).is_some() {
                if let Some(threads) = threads {
                    for line in threads.describe() {
                        println!("{line}");
                    }
                }
            }
        });

        let scope = RunScope::enter(&self.settings).context("failed to enter run scope")?;
        let context = scope.context();
        *threads = Some(context.threads().clone());

        let span = tracing::info_span!(
            "run",
            run_id = context.run_id(),
            parent_run_id = context.parent_run_id()
        );
        let _entered = span.enter();

        classify(self.run_session(args, context))
    }

    /// The stage sequence, unclassified.
    ///
    /// Once the run is interrupted, any failure a stage reports is the
    /// interruption itself.
    pub fn run_session(&self, args: &[String], context: &RunContext) -> Result<i32, Fault> {
        match self.run_stages(args, context) {
            Err(fault) if context.interrupt().is_raised() => {
                if !matches!(fault, Fault::Interrupted) {
                    tracing::debug!("stage failed after interrupt, reporting interruption");
                }
                Err(Fault::Interrupted)
            }
            outcome => outcome,
        }
    }

    fn run_stages(&self, args: &[String], context: &RunContext) -> Result<i32, Fault> {
        let interrupt = context.interrupt();

        let state = build_state(args, &*self.parser, &*self.resolver, context)?;
        interrupt.check()?;

        let provision = self.provisioner.provision(&state)?;
        interrupt.check()?;
        if let Provision::Exited(code) = provision {
            tracing::debug!(code, "provisioned run decided the outcome");
            return Ok(code);
        }

        let code = dispatch(&state)?;
        interrupt.check()?;
        tracing::debug!(code, elapsed = ?state.elapsed(), "command finished");
        Ok(code)
    }
}

/// Process entry point: run `args` (default: the process arguments) and exit.
///
/// This is the only place the process terminates. Unhandled faults panic
/// here with their full diagnostic chain instead of becoming an exit code.
pub fn run(args: Option<Vec<String>>) -> ! {
    let args = args.unwrap_or_else(|| {
        std::env::args_os()
            .skip(1)
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    });

    match Orchestrator::default().execute(&args) {
        Ok(code) => std::process::exit(code),
        Err(defect) => panic!("unhandled fault: {defect:?}"),
    }
}
