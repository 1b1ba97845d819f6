//! The machine engine.
//!
//! One generic `Machine` drives every machine type. What differs between
//! types is data: a `TransitionTable` of event and tick rules, and a set of
//! `Hooks` run on start, stop, entry, exit and tick. Hooks steer their
//! machine through a `Control`; requests are applied as soon as the hook
//! returns, within the same engine call.

mod completion;
mod control;
mod error;
mod hooks;
mod machine;
mod table;

pub use completion::{Completion, Fault, MachineId, Outcome};
pub use control::Control;
pub use error::MachineError;
pub use hooks::{Hook, HookKind, HookResult, Hooks};
pub use machine::{Machine, MAX_SETTLE_STEPS};
pub use table::{Action, EventRule, Fire, TickRule, TransitionTable, Trigger};
