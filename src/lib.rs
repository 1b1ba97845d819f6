//! Trialtree: hierarchical state machines for behavioural experiments
//!
//! An experiment is a tree of small machines. A session root steps through a
//! protocol of trials; each trial runs blocks; each block runs the leaf tasks
//! a participant actually sees. Every machine in the tree is the same generic
//! engine driven by a declarative table of rules and a set of hooks.
//!
//! # Core Concepts
//!
//! - **State / Event**: type-safe states and events via the `State` and `Event` traits
//! - **Rules**: event rules and per-tick rules, first declared wins
//! - **Hooks**: start, stop, entry, exit and tick code that steers its machine through a `Control`
//! - **Completion**: keyed, single-fire notification when an activation ends
//! - **Driver**: ticks the roots of a forest, manually or on a real-time interval
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use trialtree::builder::MachineBuilder;
//! use trialtree::collab::Context;
//! use trialtree::core::ManualClock;
//! use trialtree::{event_enum, state_enum};
//!
//! state_enum! {
//!     enum Greeting {
//!         Idle,
//!         Shown,
//!         Done,
//!     }
//!     final: [Done]
//! }
//!
//! event_enum! {
//!     enum Key {
//!         Space,
//!     }
//! }
//!
//! let clock = ManualClock::shared();
//! let mut machine = MachineBuilder::<Greeting, Key, ()>::new("greeting")
//!     .initial(Greeting::Idle)
//!     .after(Greeting::Idle, Duration::from_secs(1), Greeting::Shown)
//!     .on(Greeting::Shown, Key::Space, Greeting::Done)
//!     .build(Context::new(clock.clone()), ())
//!     .unwrap();
//!
//! machine.start().unwrap();
//! clock.advance(Duration::from_millis(1100));
//! machine.tick();
//! assert_eq!(machine.state(), &Greeting::Shown);
//!
//! machine.handle_event(Key::Space);
//! assert!(!machine.is_started());
//! ```

pub mod builder;
pub mod collab;
pub mod compose;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod snapshot;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use collab::Context;
pub use compose::{Children, Driver, Node};
pub use crate::core::{Event, Guard, State, StateHistory, StateTransition};
pub use engine::{Control, Fault, Machine, MachineId, Outcome};
pub use error::{Error, Result};
