//! Operator cancellation.
//!
//! The flag is set from a signal handler and polled by the orchestrator
//! between stages (and by command handlers between units of work).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::SigId;

use crate::error::Fault;

/// Exit status used when a second signal arrives while the first is still
/// being honoured.
pub const FORCED_EXIT: i32 = 130;

/// Cloneable handle on the cancellation state of one run.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the run as cancelled.
    pub fn trigger(&self) {
        if !self.raised.swap(true, Ordering::SeqCst) {
            tracing::warn!("interrupt received, aborting remaining work");
        }
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// `Err(Fault::Interrupted)` once the flag is raised.
    pub fn check(&self) -> Result<(), Fault> {
        if self.is_raised() {
            Err(Fault::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Route SIGINT/SIGTERM into this flag.
    ///
    /// The first signal raises the flag; a second one while it is raised
    /// terminates the process with [`FORCED_EXIT`].
    pub fn register_signals(&self) -> std::io::Result<SignalRegistration> {
        let mut ids = Vec::with_capacity(4);
        for signal in [SIGINT, SIGTERM] {
            // Order matters: the conditional shutdown must see the flag
            // before this signal sets it.
            ids.push(signal_hook::flag::register_conditional_shutdown(
                signal,
                FORCED_EXIT,
                Arc::clone(&self.raised),
            )?);
            ids.push(signal_hook::flag::register(signal, Arc::clone(&self.raised))?);
        }
        Ok(SignalRegistration { ids })
    }
}

/// Installed signal actions; removed on drop.
pub struct SignalRegistration {
    ids: Vec<SigId>,
}

impl Drop for SignalRegistration {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_clear() {
        let flag = InterruptFlag::new();
        assert!(!flag.is_raised());
        assert!(flag.check().is_ok());
    }

    #[test]
    fn trigger_is_visible_through_clones() {
        let flag = InterruptFlag::new();
        let handle = flag.clone();
        handle.trigger();
        assert!(flag.is_raised());
        assert!(matches!(flag.check(), Err(Fault::Interrupted)));
    }

    #[test]
    fn trigger_twice_is_idempotent() {
        let flag = InterruptFlag::new();
        flag.trigger();
        flag.trigger();
        assert!(flag.is_raised());
    }
}
