//! Core machine types.
//!
//! This module contains the pure building blocks shared by every machine:
//! - State and event definitions via the `State` and `Event` traits
//! - The monotonic `Clock` machines read time from
//! - Guard predicates for transition control
//! - History of the transitions of one activation
//!
//! Nothing in here performs side effects; the engine lives in `engine`.

mod clock;
mod guard;
mod history;
mod state;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use guard::{Guard, Probe};
pub use history::{Cause, StateHistory, StateTransition};
pub use state::{Event, State};
