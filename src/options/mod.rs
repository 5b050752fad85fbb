//! Parsed command line and the command handler table.
//!
//! ```text
//! raw args → OptionParser::parse → Parsed { options, handlers, positional, log_handler }
//! ```

pub mod cli;
mod user;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::error::Fault;
use crate::logging::LogHandler;
use crate::session::SessionState;

pub use cli::ClapParser;
pub use user::{UserDefaults, USER_CONFIG_ENV};

/// A single parsed flag or option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Flag(bool),
    Count(u8),
    Value(String),
    List(Vec<String>),
}

/// Result of argument parsing: command name plus named arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOptions {
    command: String,
    arguments: BTreeMap<String, ArgValue>,
    start: Option<Instant>,
}

impl ParsedOptions {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            arguments: BTreeMap::new(),
            start: None,
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.arguments.insert(name.into(), value);
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.arguments.get(name)
    }

    pub fn arguments(&self) -> &BTreeMap<String, ArgValue> {
        &self.arguments
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(ArgValue::Flag(true)))
    }

    pub fn count(&self, name: &str) -> u8 {
        match self.get(name) {
            Some(ArgValue::Count(n)) => *n,
            _ => 0,
        }
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ArgValue::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> &[String] {
        match self.get(name) {
            Some(ArgValue::List(items)) => items,
            _ => &[],
        }
    }

    /// Monotonic start of the run; `None` until the session builder sets it.
    pub fn start(&self) -> Option<Instant> {
        self.start
    }

    /// Set once by the session builder, right after parsing.
    pub(crate) fn set_start(&mut self, start: Instant) {
        self.start = Some(start);
    }
}

/// Executable bound to a command name.
pub type CommandHandler = Arc<dyn Fn(&SessionState) -> Result<i32, Fault> + Send + Sync>;

/// Command name → handler.
#[derive(Clone, Default)]
pub struct CommandHandlerTable {
    handlers: BTreeMap<String, CommandHandler>,
}

impl CommandHandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&SessionState) -> Result<i32, Fault> + Send + Sync + 'static,
    {
        self.register(name, handler);
        self
    }

    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&SessionState) -> Result<i32, Fault> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&CommandHandler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for CommandHandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Everything argument parsing hands to the session builder.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub options: ParsedOptions,
    pub handlers: CommandHandlerTable,
    /// Positional arguments for `{posargs}` expansion.
    pub positional: Vec<String>,
    pub log_handler: LogHandler,
}

/// Parses raw invocation arguments.
pub trait OptionParser: Send + Sync {
    fn parse(&self, args: &[String]) -> Result<Parsed, Fault>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_fall_back_when_absent_or_mistyped() {
        let options = ParsedOptions::new("run")
            .with("env", ArgValue::List(vec!["lint".into()]))
            .with("verbose", ArgValue::Count(2))
            .with("no_provision", ArgValue::Flag(true))
            .with("conf", ArgValue::Value("toxr.toml".into()));

        assert_eq!(options.command(), "run");
        assert_eq!(options.list("env"), ["lint"]);
        assert_eq!(options.count("verbose"), 2);
        assert!(options.flag("no_provision"));
        assert_eq!(options.value("conf"), Some("toxr.toml"));

        assert!(options.list("missing").is_empty());
        assert_eq!(options.count("env"), 0);
        assert!(!options.flag("conf"));
        assert_eq!(options.value("verbose"), None);
    }

    #[test]
    fn start_is_unset_until_injected() {
        let mut options = ParsedOptions::new("list");
        assert!(options.start().is_none());
        let now = Instant::now();
        options.set_start(now);
        assert_eq!(options.start(), Some(now));
    }

    #[test]
    fn handler_table_lists_registered_names() {
        let table = CommandHandlerTable::new()
            .with("list", |_| Ok(0))
            .with("run", |_| Ok(1));
        assert_eq!(table.names().collect::<Vec<_>>(), ["list", "run"]);
        assert!(table.contains("run"));
        assert!(table.get("config").is_none());
        assert_eq!(format!("{table:?}"), r#"{"list", "run"}"#);
    }
}
