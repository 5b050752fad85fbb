//! Delivers real SIGINTs, so these tests live in their own test binary and
//! take turns holding the signal handlers.

#![cfg(unix)]

mod common;

use common::{args, table_returning, Calls, LogCapture, ScriptedParser, ScriptedResolver, Step};
use parking_lot::Mutex;
use toxr::provision::NoProvision;
use toxr::scope::ScopeSettings;
use toxr::{Orchestrator, SENTINEL_EXIT};

static SIGNALS: Mutex<()> = Mutex::new(());

/// Resolve with `step` while signal handlers are installed.
fn run_with_resolver(step: Step) -> (anyhow::Result<i32>, LogCapture, Calls) {
    let _turn = SIGNALS.lock();
    let capture = LogCapture::default();
    let calls = Calls::default();
    let settings = ScopeSettings {
        handle_signals: true,
        ..capture.settings()
    };

    let outcome = Orchestrator::new(
        ScriptedParser::new("run", table_returning("run", 0, &calls)),
        ScriptedResolver::new(step),
        NoProvision,
    )
    .with_scope_settings(settings)
    .execute(&args(&["run"]));
    (outcome, capture, calls)
}

#[test]
fn sigint_during_config_resolution_yields_sentinel() {
    let (outcome, capture, calls) = run_with_resolver(Step::RaiseSigint);

    assert_eq!(outcome.unwrap(), SENTINEL_EXIT);
    assert_eq!(calls.count(), 0);
    assert!(capture.classified_lines().is_empty());
}

#[test]
fn config_error_after_sigint_is_not_reported() {
    let (outcome, capture, calls) =
        run_with_resolver(Step::RaiseSigintThenHandled("read interrupted"));

    assert_eq!(outcome.unwrap(), SENTINEL_EXIT);
    assert_eq!(calls.count(), 0);
    let lines = capture.classified_lines();
    assert!(lines.is_empty(), "{lines:?}");
}

#[test]
fn defect_after_sigint_does_not_crash() {
    let (outcome, capture, _calls) =
        run_with_resolver(Step::RaiseSigintThenDefect("collaborator torn down by interrupt"));

    assert_eq!(outcome.unwrap(), SENTINEL_EXIT);
    assert!(capture.classified_lines().is_empty());
}
