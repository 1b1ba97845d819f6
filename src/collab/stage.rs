//! Presentation/actuation collaborator.
//!
//! Hooks switch scene elements on and off by id. Implementations must be
//! idempotent: an exit hook may deactivate something that is already off.

use std::cell::RefCell;
use std::collections::BTreeSet;

pub trait Stage {
    fn activate(&self, id: &str);
    fn deactivate(&self, id: &str);
}

/// Stage that ignores every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStage;

impl Stage for NullStage {
    fn activate(&self, _id: &str) {}
    fn deactivate(&self, _id: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOp {
    Activate(String),
    Deactivate(String),
}

/// Stage that remembers what is active and every request it received.
#[derive(Debug, Default)]
pub struct RecordingStage {
    active: RefCell<BTreeSet<String>>,
    log: RefCell<Vec<StageOp>>,
}

impl RecordingStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.borrow().contains(id)
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.active.borrow().iter().cloned().collect()
    }

    pub fn operations(&self) -> Vec<StageOp> {
        self.log.borrow().clone()
    }
}

impl Stage for RecordingStage {
    fn activate(&self, id: &str) {
        self.active.borrow_mut().insert(id.to_string());
        self.log.borrow_mut().push(StageOp::Activate(id.to_string()));
    }

    fn deactivate(&self, id: &str) {
        self.active.borrow_mut().remove(id);
        self.log.borrow_mut().push(StageOp::Deactivate(id.to_string()));
    }
}
