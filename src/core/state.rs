//! State and event traits for machine enumerations.
//!
//! Every machine is parameterized by a state enumeration and an event
//! enumeration. Both traits are pure: they only describe values.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for machine states.
///
/// All methods are pure - no side effects. States are plain values; the
/// engine clones them into history records and snapshots.
///
/// # Required Traits
///
/// - `Clone`: states are copied into history
/// - `PartialEq`: the transition table looks states up by equality
/// - `Debug`: diagnostics
/// - `Serialize` + `Deserialize`: snapshots
///
/// # Example
///
/// ```rust
/// use trialtree::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum WaveState {
///     Idle,
///     Target,
///     End,
/// }
///
/// impl State for WaveState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "Idle",
///             Self::Target => "Target",
///             Self::End => "End",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::End)
///     }
/// }
///
/// assert!(WaveState::End.is_final());
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + 'static
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) state.
    ///
    /// Entering a final state stops the machine once the state's entry
    /// hook has run.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }

    /// Check if this is an error state.
    ///
    /// Entering an error state aborts the machine with
    /// `MachineError::ErrorState` instead of stopping it normally.
    ///
    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }
}

/// Trait for machine events.
///
/// Events may carry payloads (for example the index of the light that was
/// touched); rules match them either by equality or with a predicate.
pub trait Event: Clone + PartialEq + Debug + 'static {
    /// Get the event's name for display/logging.
    fn name(&self) -> &str;
}
