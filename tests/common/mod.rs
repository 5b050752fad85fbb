//! Shared test utilities: scripted collaborators and log capture.

#![allow(dead_code, unused_imports)]

use parking_lot::Mutex;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use toxr::config::{ConfigResolver, Configuration};
use toxr::logging::{LogHandler, LogSink};
use toxr::options::{CommandHandlerTable, OptionParser, Parsed, ParsedOptions};
use toxr::provision::{Provision, Provisioner};
use toxr::scope::ScopeSettings;
use toxr::session::SessionState;
use toxr::{Fault, HandledError};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|a| a.to_string()).collect()
}

/// In-memory log destination.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Scope settings writing into this capture, without signal handlers.
    pub fn settings(&self) -> ScopeSettings {
        let capture = self.clone();
        ScopeSettings {
            sink: LogSink::custom(move || {
                let capture = capture.clone();
                BoxMakeWriter::new(move || capture.clone())
            }),
            handle_signals: false,
        }
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).to_string()
    }

    /// Lines carrying a `<classification>| <message>` report.
    pub fn classified_lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains("| "))
            .map(str::to_string)
            .collect()
    }
}

/// What a scripted collaborator does when called.
#[derive(Clone)]
pub enum Step {
    Succeed,
    Handled(&'static str),
    Interrupt,
    Defect(&'static str),
    /// Succeed, but deliver SIGINT to the process first.
    RaiseSigint,
    /// Deliver SIGINT, then fail with a handled error.
    RaiseSigintThenHandled(&'static str),
    /// Deliver SIGINT, then fail with a defect.
    RaiseSigintThenDefect(&'static str),
}

impl Step {
    fn outcome(&self) -> Result<(), Fault> {
        match self {
            Step::Succeed => Ok(()),
            Step::Handled(message) => Err(HandledError::new(*message).into()),
            Step::Interrupt => Err(Fault::Interrupted),
            Step::Defect(message) => Err(Fault::Defect(anyhow::anyhow!(*message))),
            Step::RaiseSigint => {
                raise_sigint();
                Ok(())
            }
            Step::RaiseSigintThenHandled(message) => {
                raise_sigint();
                Err(HandledError::classified("ConfigError", *message).into())
            }
            Step::RaiseSigintThenDefect(message) => {
                raise_sigint();
                Err(Fault::Defect(anyhow::anyhow!(*message)))
            }
        }
    }
}

fn raise_sigint() {
    signal_hook::low_level::raise(signal_hook::consts::SIGINT).expect("raise SIGINT");
}

/// Counts invocations of a collaborator or handler.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Shared record of which stages ran, in call order.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<&'static str>>>);

impl Journal {
    pub fn push(&self, stage: &'static str) {
        self.0.lock().push(stage);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }
}

pub struct ScriptedParser {
    pub command: String,
    pub handlers: CommandHandlerTable,
    pub positional: Vec<String>,
    pub step: Step,
    pub calls: Calls,
    pub journal: Journal,
}

impl ScriptedParser {
    pub fn new(command: &str, handlers: CommandHandlerTable) -> Self {
        Self {
            command: command.to_string(),
            handlers,
            positional: Vec::new(),
            step: Step::Succeed,
            calls: Calls::default(),
            journal: Journal::default(),
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.step = step;
        self
    }

    pub fn journal(mut self, journal: &Journal) -> Self {
        self.journal = journal.clone();
        self
    }
}

impl OptionParser for ScriptedParser {
    fn parse(&self, _args: &[String]) -> Result<Parsed, Fault> {
        self.calls.hit();
        self.journal.push("parse");
        self.step.outcome()?;
        Ok(Parsed {
            options: ParsedOptions::new(self.command.clone()),
            handlers: self.handlers.clone(),
            positional: self.positional.clone(),
            log_handler: LogHandler::default(),
        })
    }
}

#[derive(Clone)]
pub struct ScriptedResolver {
    pub step: Step,
    pub calls: Calls,
    pub journal: Journal,
}

impl ScriptedResolver {
    pub fn new(step: Step) -> Self {
        Self {
            step,
            calls: Calls::default(),
            journal: Journal::default(),
        }
    }

    pub fn journal(mut self, journal: &Journal) -> Self {
        self.journal = journal.clone();
        self
    }
}

impl ConfigResolver for ScriptedResolver {
    fn resolve(&self, options: &ParsedOptions, pos_args: &[String]) -> Result<Configuration, Fault> {
        self.calls.hit();
        assert!(options.start().is_some(), "start time must be injected before resolution");
        self.journal.push("resolve");
        self.step.outcome()?;
        Ok(Configuration::empty(".", pos_args.to_vec()))
    }
}

#[derive(Clone)]
pub struct ScriptedProvisioner {
    pub result: Provision,
    pub step: Step,
    pub calls: Calls,
    pub journal: Journal,
    /// Raise the run's interrupt flag before acting on `step`.
    pub interrupt_first: bool,
}

impl ScriptedProvisioner {
    pub fn returning(result: Provision) -> Self {
        Self {
            result,
            step: Step::Succeed,
            calls: Calls::default(),
            journal: Journal::default(),
            interrupt_first: false,
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.step = step;
        self
    }

    pub fn journal(mut self, journal: &Journal) -> Self {
        self.journal = journal.clone();
        self
    }

    pub fn interrupting(mut self) -> Self {
        self.interrupt_first = true;
        self
    }
}

impl Provisioner for ScriptedProvisioner {
    fn provision(&self, state: &SessionState) -> Result<Provision, Fault> {
        self.calls.hit();
        self.journal.push("provision");
        if self.interrupt_first {
            state.interrupt().trigger();
        }
        self.step.outcome()?;
        Ok(self.result)
    }
}

/// Handler table with one command returning `code`, counted by `calls`.
pub fn table_returning(command: &str, code: i32, calls: &Calls) -> CommandHandlerTable {
    let calls = calls.clone();
    CommandHandlerTable::new().with(command, move |_| {
        calls.hit();
        Ok(code)
    })
}

/// Create a temporary directory holding `toxr.toml` with `content`.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("toxr.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}
