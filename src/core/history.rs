//! State transition history tracking.
//!
//! Each machine keeps the transitions of its current activation. History is
//! reset by `start()`, so a snapshot taken when a trial finishes shows exactly
//! the path that trial took.

use super::clock::Timestamp;
use super::state::State;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What caused a state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cause {
    /// An event rule matched the named event.
    Event(String),
    /// A tick rule's guard passed.
    Tick,
    /// A hook or the host requested the change directly.
    Direct,
}

/// Record of a single state transition.
///
/// # Example
///
/// ```rust
/// use trialtree::core::{Cause, State, StateTransition, Timestamp};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum TrialState {
///     Idle,
///     Task,
/// }
///
/// impl State for TrialState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "Idle",
///             Self::Task => "Task",
///         }
///     }
/// }
///
/// let transition = StateTransition {
///     from: TrialState::Idle,
///     to: TrialState::Task,
///     at: Timestamp::from_millis(2000),
///     cause: Cause::Tick,
/// };
/// assert_eq!(transition.to, TrialState::Task);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// When the transition occurred, on the machine's clock
    pub at: Timestamp,
    /// Why the transition happened
    pub cause: Cause,
}

/// Ordered history of state transitions.
///
/// `record` is pure and returns a new history with the transition
/// appended. The engine appends in place with `push`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: Vec<StateTransition<S>>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, transition: StateTransition<S>) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Append a transition in place.
    pub fn push(&mut self, transition: StateTransition<S>) {
        self.transitions.push(transition);
    }

    /// Get the path of states traversed.
    ///
    /// Returns references to states in order: the state the first transition
    /// left, then the `to` state of each transition.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Names along the path, convenient for logs and assertions.
    pub fn path_names(&self) -> Vec<String> {
        self.get_path()
            .into_iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Time from the first to the last recorded transition.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            Some(last.at.since(first.at))
        } else {
            None
        }
    }

    /// Get all transitions.
    pub fn transitions(&self) -> &[StateTransition<S>] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
