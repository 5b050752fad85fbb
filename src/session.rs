//! Session state of one invocation and the builder that assembles it.

use std::time::{Duration, Instant};

use crate::config::{ConfigResolver, Configuration};
use crate::error::Fault;
use crate::interrupt::InterruptFlag;
use crate::logging::LogHandler;
use crate::options::{CommandHandlerTable, OptionParser, Parsed, ParsedOptions};
use crate::scope::RunContext;

/// Raw arguments of one process run plus the moment they were captured.
#[derive(Debug, Clone)]
pub struct Invocation {
    args: Vec<String>,
    start: Instant,
}

impl Invocation {
    pub fn capture(args: &[String]) -> Self {
        Self {
            start: Instant::now(),
            args: args.to_vec(),
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn start(&self) -> Instant {
        self.start
    }
}

/// Everything downstream stages need to know about the run.
///
/// Only [`build_state`] constructs it; nothing mutates it afterwards.
pub struct SessionState {
    config: Configuration,
    options: ParsedOptions,
    handlers: CommandHandlerTable,
    invocation: Invocation,
    log_handler: LogHandler,
    context: RunContext,
}

impl SessionState {
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn options(&self) -> &ParsedOptions {
        &self.options
    }

    pub fn handlers(&self) -> &CommandHandlerTable {
        &self.handlers
    }

    /// The original invocation arguments, unchanged.
    pub fn args(&self) -> &[String] {
        self.invocation.args()
    }

    pub fn log_handler(&self) -> &LogHandler {
        &self.log_handler
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn interrupt(&self) -> &InterruptFlag {
        self.context.interrupt()
    }

    /// Time since the invocation was captured.
    pub fn elapsed(&self) -> Duration {
        self.invocation.start().elapsed()
    }
}

/// Build the session state of a run.
///
/// The steps run in this order and no other: capture the start time, parse
/// the arguments, inject the start time into the parsed options, resolve the
/// configuration, assemble the state.
pub fn build_state(
    args: &[String],
    parser: &dyn OptionParser,
    resolver: &dyn ConfigResolver,
    context: &RunContext,
) -> Result<SessionState, Fault> {
    let invocation = Invocation::capture(args);

    let Parsed {
        mut options,
        handlers,
        positional,
        log_handler,
    } = parser.parse(invocation.args())?;

    options.set_start(invocation.start());
    context.apply_log_handler(&log_handler);
    tracing::debug!(command = options.command(), "options parsed");

    let config = resolver.resolve(&options, &positional)?;

    Ok(SessionState {
        config,
        options,
        handlers,
        invocation,
        log_handler,
        context: context.clone(),
    })
}
