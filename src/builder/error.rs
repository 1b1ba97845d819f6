//! Build errors for the machine builder.

use crate::engine::HookKind;
use thiserror::Error;

/// Errors that can occur when building a machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("No transitions defined. Add at least one event or tick rule")]
    NoTransitions,

    #[error("Duplicate {kind} hook for state `{state}`")]
    DuplicateHook { kind: HookKind, state: String },

    #[error("Duplicate {0} hook")]
    DuplicateLifecycleHook(HookKind),
}
