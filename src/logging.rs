use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, EnvFilter, Registry};

/// Verbosity used before the command line has been parsed.
pub const DEFAULT_VERBOSITY: i32 = 2;

/// Env var naming a log file; output goes to stderr when unset.
pub const LOG_FILE_ENV: &str = "TOXR_LOG";

/// Factory for a custom log destination.
pub type WriterFactory = Arc<dyn Fn() -> BoxMakeWriter + Send + Sync>;

/// Where the run's log lines go.
#[derive(Clone, Default)]
pub enum LogSink {
    /// `TOXR_LOG` file if set, stderr otherwise.
    #[default]
    FromEnv,
    Stderr,
    Custom(WriterFactory),
}

impl LogSink {
    pub fn custom<F>(factory: F) -> Self
    where
        F: Fn() -> BoxMakeWriter + Send + Sync + 'static,
    {
        LogSink::Custom(Arc::new(factory))
    }

    fn make_writer(&self) -> BoxMakeWriter {
        match self {
            LogSink::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogSink::Custom(factory) => factory(),
            LogSink::FromEnv => match log_file_path() {
                Some(path) => match std::fs::File::create(&path) {
                    Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
                    Err(_) => {
                        eprintln!("Warning: Failed to create log file: {}", path.display());
                        BoxMakeWriter::new(std::io::stderr)
                    }
                },
                None => BoxMakeWriter::new(std::io::stderr),
            },
        }
    }
}

/// Log file path derived from `TOXR_LOG`.
///
/// Names are made unique as `{path}.{timestamp}.{pid}` so nested
/// (provisioned) runs and concurrent invocations never share a file.
fn log_file_path() -> Option<PathBuf> {
    let base = std::env::var(LOG_FILE_ENV).ok()?;
    let pid = std::process::id();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Some(PathBuf::from(format!("{}.{}.{}", base, timestamp, pid)))
}

/// Map a verbosity count onto a level filter.
///
/// 0 error, 1 warn, 2 info, 3 debug, 4+ trace; negative values silence output.
pub fn level_for(verbosity: i32) -> LevelFilter {
    match verbosity {
        i32::MIN..=-1 => LevelFilter::OFF,
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Logging preference produced by option parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHandler {
    verbosity: i32,
}

impl LogHandler {
    pub fn new(verbosity: i32) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> i32 {
        self.verbosity
    }

    pub fn level(&self) -> LevelFilter {
        level_for(self.verbosity)
    }
}

impl Default for LogHandler {
    fn default() -> Self {
        Self::new(DEFAULT_VERBOSITY)
    }
}

/// Runtime control over the filter of an installed dispatcher.
#[derive(Clone)]
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
}

impl LogControl {
    /// Apply the parsed log preference. `RUST_LOG` wins when it is set.
    pub fn apply(&self, handler: &LogHandler) {
        if self.env_override {
            return;
        }
        let level = handler.level();
        if let Err(err) = self
            .handle
            .modify(|filter| *filter = EnvFilter::new(level.to_string()))
        {
            tracing::warn!(error = %err, "failed to apply log level");
        }
    }
}

/// Build the dispatcher for one run without installing it.
pub fn build_dispatch(sink: &LogSink) -> (Dispatch, LogControl) {
    let from_env = std::env::var_os("RUST_LOG")
        .is_some()
        .then(EnvFilter::try_from_default_env)
        .and_then(Result::ok);
    let env_override = from_env.is_some();
    let filter = from_env
        .unwrap_or_else(|| EnvFilter::new(level_for(DEFAULT_VERBOSITY).to_string()));
    let (filter_layer, handle) = reload::Layer::new(filter);

    let fmt_layer = fmt::layer()
        .with_writer(sink.make_writer())
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer);

    (
        Dispatch::new(subscriber),
        LogControl {
            handle,
            env_override,
        },
    )
}
