//! Single-fire completion notification.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Stable identity of a machine, used to key completion subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineId(Uuid);

impl MachineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MachineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why an activation ended early: the failing machine and its error.
///
/// Faults are shared as they travel from a leaf up to its root.
#[derive(Clone, Debug)]
pub struct Fault {
    origin: String,
    error: Rc<Error>,
}

impl Fault {
    pub fn new(origin: impl Into<String>, error: impl Into<Error>) -> Self {
        Self {
            origin: origin.into(),
            error: Rc::new(error.into()),
        }
    }

    /// Name of the machine whose hook failed.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn error(&self) -> &Error {
        &self.error
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.error)
    }
}

/// How an activation ended.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Reached a final state or was stopped.
    Completed,
    /// A hook failed, here or in a descendant.
    Aborted(Fault),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Outcome::Completed => None,
            Outcome::Aborted(fault) => Some(fault),
        }
    }
}

type Subscriber = Box<dyn FnOnce(&Outcome)>;

/// Subscribers waiting for the end of the current (or next) activation.
///
/// Subscriptions are keyed by the subscriber's `MachineId`; a second
/// subscription under the same key is refused. Firing drains the list, so
/// every subscriber hears about exactly one activation.
#[derive(Default)]
pub struct Completion {
    subscribers: Vec<(MachineId, Subscriber)>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `notify` under `key`. Returns `false` if `key` is already
    /// subscribed, in which case `notify` is dropped.
    pub fn subscribe<F>(&mut self, key: MachineId, notify: F) -> bool
    where
        F: FnOnce(&Outcome) + 'static,
    {
        if self.is_subscribed(key) {
            return false;
        }
        self.subscribers.push((key, Box::new(notify)));
        true
    }

    pub fn is_subscribed(&self, key: MachineId) -> bool {
        self.subscribers.iter().any(|(k, _)| *k == key)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Notify and forget every subscriber, in subscription order.
    pub(crate) fn fire(&mut self, outcome: &Outcome) -> usize {
        let subscribers = std::mem::take(&mut self.subscribers);
        let count = subscribers.len();
        for (_, notify) in subscribers {
            notify(outcome);
        }
        count
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
