//! toxr: run project test and automation environments.
//!
//! ```text
//! args → RunScope → build_state → provision → dispatch → exit code
//! ```

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod options;
pub mod provision;
pub mod run;
pub mod scope;
pub mod session;

pub use error::{Fault, HandledError, SENTINEL_EXIT};
pub use run::{run, Orchestrator};
