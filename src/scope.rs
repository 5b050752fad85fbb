//! Scoped execution context of one run.
//!
//! [`RunScope`] is acquired before anything else happens and released when
//! it drops, on every exit path including unwinding. While it is held:
//!
//! - the run's tracing dispatcher is the default on the driving thread,
//! - SIGINT/SIGTERM raise the run's [`InterruptFlag`] instead of killing
//!   the process,
//! - threads started through [`RunContext::spawn`] inherit the dispatcher
//!   and are recorded in the [`ThreadRegistry`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};

use parking_lot::Mutex;
use tracing::dispatcher::DefaultGuard;
use tracing::Dispatch;

use crate::interrupt::{InterruptFlag, SignalRegistration};
use crate::logging::{build_dispatch, LogControl, LogHandler, LogSink};

/// Env var carrying the run id of a parent run into a provisioned child.
pub const RUN_ID_ENV: &str = "TOXR_RUN_ID";

/// How a scope is set up.
#[derive(Clone)]
pub struct ScopeSettings {
    pub sink: LogSink,
    /// Install SIGINT/SIGTERM handlers for the duration of the scope.
    pub handle_signals: bool,
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            sink: LogSink::FromEnv,
            handle_signals: true,
        }
    }
}

/// One thread known to the run.
#[derive(Clone)]
struct ThreadRecord {
    name: String,
    id: ThreadId,
    finished: Arc<AtomicBool>,
}

impl fmt::Display for ThreadRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.finished.load(Ordering::SeqCst) {
            "stopped"
        } else {
            "alive"
        };
        write!(f, "<Thread({}, {:?}, {})>", self.name, self.id, state)
    }
}

/// Threads observed during a run, in start order.
#[derive(Clone, Default)]
pub struct ThreadRegistry {
    records: Arc<Mutex<Vec<ThreadRecord>>>,
}

impl ThreadRegistry {
    fn with_current() -> Self {
        let registry = Self::default();
        let current = std::thread::current();
        registry.records.lock().push(ThreadRecord {
            name: current.name().unwrap_or("<unnamed>").to_string(),
            id: current.id(),
            finished: Arc::new(AtomicBool::new(false)),
        });
        registry
    }

    fn record(&self, record: ThreadRecord) {
        self.records.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// One line per thread, e.g. `<Thread(env-lint, ThreadId(4), stopped)>`.
    pub fn describe(&self) -> Vec<String> {
        self.records.lock().iter().map(ToString::to_string).collect()
    }
}

/// Handles shared with everything that runs inside the scope.
#[derive(Clone)]
pub struct RunContext {
    run_id: Arc<str>,
    parent_run_id: Option<Arc<str>>,
    interrupt: InterruptFlag,
    log: LogControl,
    dispatch: Dispatch,
    threads: ThreadRegistry,
}

impl RunContext {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn parent_run_id(&self) -> Option<&str> {
        self.parent_run_id.as_deref()
    }

    pub fn interrupt(&self) -> &InterruptFlag {
        &self.interrupt
    }

    pub fn threads(&self) -> &ThreadRegistry {
        &self.threads
    }

    pub fn apply_log_handler(&self, handler: &LogHandler) {
        self.log.apply(handler);
    }

    /// Start a named thread that logs through the run's dispatcher.
    pub fn spawn<F, T>(&self, name: impl Into<String>, work: F) -> std::io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let name = name.into();
        let dispatch = self.dispatch.clone();
        let finished = Arc::new(AtomicBool::new(false));
        let done = Arc::clone(&finished);

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _done = scopeguard::guard(done, |flag| flag.store(true, Ordering::SeqCst));
                tracing::dispatcher::with_default(&dispatch, work)
            })?;

        self.threads.record(ThreadRecord {
            name,
            id: handle.thread().id(),
            finished,
        });
        Ok(handle)
    }
}

/// RAII guard over the run's execution context.
pub struct RunScope {
    context: RunContext,
    // Dropped in declaration order: signals first, dispatcher last.
    _signals: Option<SignalRegistration>,
    _log: DefaultGuard,
}

impl RunScope {
    pub fn enter(settings: &ScopeSettings) -> std::io::Result<Self> {
        let (dispatch, log) = build_dispatch(&settings.sink);
        let guard = tracing::dispatcher::set_default(&dispatch);

        let interrupt = InterruptFlag::new();
        let signals = if settings.handle_signals {
            Some(interrupt.register_signals()?)
        } else {
            None
        };

        let parent_run_id = std::env::var(RUN_ID_ENV)
            .ok()
            .filter(|id| !id.is_empty())
            .map(Arc::from);

        let context = RunContext {
            run_id: Arc::from(uuid::Uuid::new_v4().to_string()),
            parent_run_id,
            interrupt,
            log,
            dispatch,
            threads: ThreadRegistry::with_current(),
        };
        tracing::debug!(run_id = %context.run_id, "run scope entered");

        Ok(Self {
            context,
            _signals: signals,
            _log: guard,
        })
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }
}

impl Drop for RunScope {
    fn drop(&mut self) {
        tracing::debug!(run_id = %self.context.run_id, "run scope released");
    }
}
