//! Errors reported by the engine's public operations.

use thiserror::Error;

/// Misuse of a machine's lifecycle.
///
/// Every other state-discipline violation (events or state changes on a
/// stopped machine, stopping twice) is a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("machine `{machine}` is already started")]
    AlreadyStarted { machine: String },

    /// Reported as the fault of an activation that entered a state whose
    /// `State::is_error()` is true.
    #[error("machine `{machine}` entered error state `{state}`")]
    ErrorState { machine: String, state: String },
}
