//! Object-safe view of a machine inside an orchestration tree.

use crate::engine::Fault;
use std::any::Any;
use std::fmt;
use std::time::Duration;

/// A machine seen without its state, event and data types.
///
/// Parents expose their children as `&mut dyn Node` so ticks and stops can
/// walk the tree, and the driver keeps roots as `Box<dyn Node>`.
pub trait Node {
    fn name(&self) -> &str;
    fn is_started(&self) -> bool;
    fn tick(&mut self);
    fn stop(&mut self);
    fn status(&self) -> NodeStatus;
    fn fault(&self) -> Option<&Fault>;
    fn visit_children(&mut self, visit: &mut dyn FnMut(&mut dyn Node));
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Implemented by machine data to expose the children it owns.
///
/// The default exposes none, so leaf data only needs an empty impl.
///
/// ```rust
/// use trialtree::compose::{Children, Node};
///
/// struct Block<W> {
///     waves: u32,
///     wave: W,
/// }
///
/// impl<W: Node> Children for Block<W> {
///     fn visit_children(&mut self, visit: &mut dyn FnMut(&mut dyn Node)) {
///         visit(&mut self.wave);
///     }
/// }
/// ```
pub trait Children {
    fn visit_children(&mut self, _visit: &mut dyn FnMut(&mut dyn Node)) {}
}

impl Children for () {}

/// One line of the driver's status view.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeStatus {
    pub name: String,
    pub state: String,
    pub started: bool,
    pub time_in_state: Duration,
    pub activation: u64,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {:.2}s",
            self.name,
            self.state,
            self.time_in_state.as_secs_f64()
        )
    }
}
