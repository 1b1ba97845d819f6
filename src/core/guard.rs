//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions evaluated against a `Probe`: a read-only
//! view of the machine's data, the time spent in the current state, the
//! triggering event (for event rules) and the external collaborators.

use crate::collab::Context;
use crate::core::clock::Timestamp;
use std::time::Duration;

/// Read-only view handed to guards.
pub struct Probe<'a, D, E> {
    pub(crate) data: &'a D,
    pub(crate) event: Option<&'a E>,
    pub(crate) time_in_state: Duration,
    pub(crate) now: Timestamp,
    pub(crate) context: &'a Context,
}

impl<'a, D, E> Probe<'a, D, E> {
    /// Build a probe by hand, mainly for testing guards in isolation.
    pub fn new(data: &'a D, time_in_state: Duration, context: &'a Context) -> Self {
        Self {
            data,
            event: None,
            time_in_state,
            now: context.now(),
            context,
        }
    }

    pub fn with_event(mut self, event: &'a E) -> Self {
        self.event = Some(event);
        self
    }

    pub fn data(&self) -> &'a D {
        self.data
    }

    /// The event being dispatched; `None` during tick evaluation.
    pub fn event(&self) -> Option<&'a E> {
        self.event
    }

    pub fn time_in_state(&self) -> Duration {
        self.time_in_state
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn context(&self) -> &'a Context {
        self.context
    }
}

/// Pure predicate that determines if a rule can fire.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use trialtree::collab::Context;
/// use trialtree::core::{Guard, Probe};
///
/// struct Wave {
///     attempts: u32,
/// }
///
/// let timed_out: Guard<Wave, ()> = Guard::after(Duration::from_millis(1500));
/// let retry = Guard::new(|p: &Probe<'_, Wave, ()>| p.data().attempts < 3);
///
/// let context = Context::detached();
/// let wave = Wave { attempts: 1 };
///
/// assert!(!timed_out.check(&Probe::new(&wave, Duration::from_millis(1500), &context)));
/// assert!(timed_out.check(&Probe::new(&wave, Duration::from_millis(1600), &context)));
/// assert!(retry.check(&Probe::new(&wave, Duration::ZERO, &context)));
/// ```
pub struct Guard<D, E> {
    predicate: Box<dyn Fn(&Probe<'_, D, E>) -> bool>,
}

impl<D: 'static, E: 'static> Guard<D, E> {
    /// Create a guard from a pure predicate function.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Probe<'_, D, E>) -> bool + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Passes once the machine has spent strictly more than `threshold` in
    /// its current state.
    pub fn after(threshold: Duration) -> Self {
        Self::new(move |probe| probe.time_in_state() > threshold)
    }

    /// Passes while the input collaborator reports `key` as pressed.
    pub fn pressed(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move |probe| probe.context().input().is_pressed(&key))
    }

    /// Passes when both guards pass. `self` is evaluated first.
    pub fn and(self, other: Guard<D, E>) -> Self {
        Self::new(move |probe| self.check(probe) && other.check(probe))
    }

    /// Passes when the guard does not.
    pub fn not(self) -> Self {
        Self::new(move |probe| !self.check(probe))
    }
}

impl<D, E> Guard<D, E> {
    /// Evaluate the predicate without side effects.
    pub fn check(&self, probe: &Probe<'_, D, E>) -> bool {
        (self.predicate)(probe)
    }
}
