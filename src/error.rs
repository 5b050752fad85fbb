//! Fault taxonomy and the single classification point of a run.
//!
//! Every stage of the orchestrator reports failure as a [`Fault`]. Only
//! [`classify`] decides what a fault means for the process:
//!
//! ```text
//! Fault::Handled     → log "<classification>| <message>" → SENTINEL_EXIT
//! Fault::Interrupted → (no log line)                      → SENTINEL_EXIT
//! Fault::Defect      → re-raised to the caller
//! ```

use std::borrow::Cow;

use thiserror::Error;

use crate::config::ConfigError;

/// Exit code for handled errors and operator interruptions.
pub const SENTINEL_EXIT: i32 = -2;

/// Classification used when a collaborator does not name one.
pub const DEFAULT_CLASSIFICATION: &str = "HandledError";

/// An expected, user-facing failure (bad CLI usage, bad config file, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandledError {
    classification: Cow<'static, str>,
    message: String,
}

impl HandledError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            classification: Cow::Borrowed(DEFAULT_CLASSIFICATION),
            message: message.into(),
        }
    }

    /// Create a handled error reported under a specific classification name.
    pub fn classified(
        classification: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            classification: classification.into(),
            message: message.into(),
        }
    }

    pub fn classification(&self) -> &str {
        &self.classification
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The single line shown to the operator.
    pub fn report_line(&self) -> String {
        format!("{}| {}", self.classification, self.message)
    }
}

impl From<ConfigError> for HandledError {
    fn from(err: ConfigError) -> Self {
        HandledError::classified("ConfigError", err.to_string())
    }
}

/// Any failure raised while a run is in progress.
#[derive(Debug, Error)]
pub enum Fault {
    /// Expected failure, reported as a single concise line.
    #[error(transparent)]
    Handled(#[from] HandledError),

    /// The operator cancelled the run (SIGINT/SIGTERM).
    #[error("run interrupted")]
    Interrupted,

    /// A defect in the orchestrator or a collaborator.
    #[error(transparent)]
    Defect(#[from] anyhow::Error),
}

impl From<ConfigError> for Fault {
    fn from(err: ConfigError) -> Self {
        Fault::Handled(err.into())
    }
}

impl Fault {
    pub fn handled(message: impl Into<String>) -> Self {
        Fault::Handled(HandledError::new(message))
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Fault::Handled(_) | Fault::Interrupted)
    }
}

/// Translate the outcome of a run into an exit code.
///
/// Handled faults are logged at error level and mapped to [`SENTINEL_EXIT`];
/// interruptions map to the same code silently. Defects come back as `Err`
/// untouched so the caller can fail loudly.
pub fn classify(outcome: Result<i32, Fault>) -> anyhow::Result<i32> {
    match outcome {
        Ok(code) => Ok(code),
        Err(Fault::Handled(err)) => {
            tracing::error!("{}", err.report_line());
            Ok(SENTINEL_EXIT)
        }
        Err(Fault::Interrupted) => {
            tracing::debug!("run interrupted by operator");
            Ok(SENTINEL_EXIT)
        }
        Err(Fault::Defect(err)) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handled_error_report_line_uses_default_classification() {
        let err = HandledError::new("unrecognized flag");
        assert_eq!(err.report_line(), "HandledError| unrecognized flag");
    }

    #[test]
    fn config_error_keeps_its_classification() {
        let err: HandledError = ConfigError::ValidationError {
            message: "env_list names unknown environment 'docs'".to_string(),
        }
        .into();
        assert_eq!(err.classification(), "ConfigError");
        assert!(err.message().contains("docs"));
    }

    #[test]
    fn classify_passes_codes_through() {
        assert_eq!(classify(Ok(0)).unwrap(), 0);
        assert_eq!(classify(Ok(3)).unwrap(), 3);
    }

    #[test]
    fn classify_maps_handled_and_interrupted_to_sentinel() {
        assert_eq!(classify(Err(Fault::handled("bad"))).unwrap(), SENTINEL_EXIT);
        assert_eq!(classify(Err(Fault::Interrupted)).unwrap(), SENTINEL_EXIT);
    }

    #[test]
    fn classify_returns_defects() {
        let outcome = classify(Err(Fault::Defect(anyhow::anyhow!("broken invariant"))));
        let err = outcome.unwrap_err();
        assert_eq!(err.to_string(), "broken invariant");
    }

    #[test]
    fn only_handled_kinds_report_as_handled() {
        assert!(Fault::handled("x").is_handled());
        assert!(Fault::Interrupted.is_handled());
        assert!(!Fault::Defect(anyhow::anyhow!("x")).is_handled());
    }
}
