//! Shared handles to the external collaborators.

use super::input::{Input, NullInput};
use super::stage::{NullStage, Stage};
use crate::core::{Clock, ManualClock, SystemClock, Timestamp};
use std::fmt;
use std::rc::Rc;

/// Clock, presentation and input handles shared by every machine in a tree.
///
/// The root's builder receives a `Context` and clones it into each child it
/// constructs, so there is no global state to reach for.
#[derive(Clone)]
pub struct Context {
    clock: Rc<dyn Clock>,
    stage: Rc<dyn Stage>,
    input: Rc<dyn Input>,
}

impl Context {
    /// Context with the given clock and no-op stage and input.
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            stage: Rc::new(NullStage),
            input: Rc::new(NullInput),
        }
    }

    /// Context on the real-time clock.
    pub fn system() -> Self {
        Self::new(Rc::new(SystemClock::new()))
    }

    /// Context on a private manual clock that never advances.
    pub fn detached() -> Self {
        Self::new(Rc::new(ManualClock::new()))
    }

    pub fn with_stage(mut self, stage: Rc<dyn Stage>) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_input(mut self, input: Rc<dyn Input>) -> Self {
        self.input = input;
        self
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn clock(&self) -> &Rc<dyn Clock> {
        &self.clock
    }

    pub fn stage(&self) -> &dyn Stage {
        self.stage.as_ref()
    }

    pub fn input(&self) -> &dyn Input {
        self.input.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("now", &self.now())
            .finish_non_exhaustive()
    }
}
