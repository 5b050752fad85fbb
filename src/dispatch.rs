use thiserror::Error;

use crate::error::Fault;
use crate::session::SessionState;

/// Errors raised while selecting a command handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Parsing accepted a command that has no handler.
    #[error("no handler registered for command '{command}'")]
    UnknownCommand { command: String },
}

impl From<DispatchError> for Fault {
    fn from(err: DispatchError) -> Self {
        // A parser/table mismatch is a defect, never a user error.
        Fault::Defect(err.into())
    }
}

/// Invoke the handler bound to the parsed command and return its exit code
/// unchanged.
pub fn dispatch(state: &SessionState) -> Result<i32, Fault> {
    let command = state.options().command();
    let handler = state
        .handlers()
        .get(command)
        .ok_or_else(|| DispatchError::UnknownCommand {
            command: command.to_string(),
        })?;

    tracing::debug!(command, "dispatching");
    handler(state)
}
