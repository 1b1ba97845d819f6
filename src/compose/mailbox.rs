//! Per-machine queue for signals coming up from children.

use crate::engine::Fault;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// What a child's completion turns into for its parent.
#[derive(Clone, Debug)]
pub enum Signal<E> {
    /// The child completed; the parent dispatches this event to itself if
    /// it is still in the state that launched the child (same `epoch`).
    Event { event: E, epoch: u64 },
    /// The child aborted; the parent aborts with the same fault.
    ChildFailed(Fault),
}

/// Shared FIFO of signals for one machine.
///
/// Completion subscribers hold clones and post into it; the owning machine
/// drains it before its current engine call returns.
pub struct Mailbox<E> {
    queue: Rc<RefCell<VecDeque<Signal<E>>>>,
}

impl<E> Mailbox<E> {
    pub fn new() -> Self {
        Self {
            queue: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub fn post(&self, signal: Signal<E>) {
        self.queue.borrow_mut().push_back(signal);
    }

    pub fn post_event(&self, event: E, epoch: u64) {
        self.post(Signal::Event { event, epoch });
    }

    /// Remove the oldest signal.
    pub fn take(&self) -> Option<Signal<E>> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

impl<E> Clone for Mailbox<E> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
        }
    }
}

impl<E> Default for Mailbox<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Mailbox<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").field("pending", &self.len()).finish()
    }
}
