//! Composition of machines into orchestration trees.
//!
//! A parent owns its children inside its data and exposes them through
//! `Children`. Children report back through the parent's `Mailbox`: a
//! completion becomes an event the parent dispatches to itself, an abort
//! aborts the parent too. Completions are stamped with the parent's epoch
//! and dropped if the parent left the launching state. Hosts hand input to a
//! child through `Machine::route` on its parent so the parent settles in the
//! same call. The `Driver` ticks the roots.

mod driver;
mod mailbox;
mod node;

pub use driver::Driver;
pub use mailbox::{Mailbox, Signal};
pub use node::{Children, Node, NodeStatus};
