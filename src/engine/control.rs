//! The handle hooks use to steer their machine.
//!
//! Hooks never mutate the engine directly. They queue requests on a
//! `Control`, and the engine applies them in issue order once the hook has
//! returned, before the current engine call finishes.

use super::completion::{Fault, MachineId, Outcome};
use super::error::MachineError;
use super::machine::Machine;
use crate::collab::{Context, Input, Stage};
use crate::compose::{Children, Mailbox, Signal};
use crate::core::{Cause, Event, State, Timestamp};
use crate::error::Error;
use std::collections::VecDeque;
use std::time::Duration;

/// Request queued by a hook or by the engine itself.
///
/// `Goto` and `Dispatch` remember the epoch they were issued in and are
/// dropped if the machine changed state in between.
#[derive(Debug)]
pub(crate) enum Directive<S, E> {
    Goto { target: S, epoch: u64, cause: Cause },
    Dispatch { event: E, epoch: u64 },
    Stop,
    Abort(Fault),
}

pub struct Control<'a, S, E> {
    pub(crate) id: MachineId,
    pub(crate) name: &'a str,
    pub(crate) state: &'a S,
    pub(crate) epoch: u64,
    pub(crate) now: Timestamp,
    pub(crate) entered_at: Timestamp,
    pub(crate) context: &'a Context,
    pub(crate) mailbox: &'a Mailbox<E>,
    pub(crate) pending: &'a mut VecDeque<Directive<S, E>>,
}

impl<'a, S: State, E: Event> Control<'a, S, E> {
    /// Request a change to `target`.
    pub fn goto(&mut self, target: S) {
        self.pending.push_back(Directive::Goto {
            target,
            epoch: self.epoch,
            cause: Cause::Direct,
        });
    }

    /// Request that `event` be dispatched to this machine.
    pub fn dispatch(&mut self, event: E) {
        self.pending.push_back(Directive::Dispatch {
            event,
            epoch: self.epoch,
        });
    }

    /// Request a normal stop.
    pub fn stop(&mut self) {
        self.pending.push_back(Directive::Stop);
    }

    /// Request an abort with `error` as the fault.
    pub fn fail(&mut self, error: impl Into<Error>) {
        let fault = Fault::new(self.name, error);
        self.pending.push_back(Directive::Abort(fault));
    }

    pub fn id(&self) -> MachineId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// State the machine was in when the hook was called.
    pub fn state(&self) -> &S {
        self.state
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn time_in_state(&self) -> Duration {
        self.now.since(self.entered_at)
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    pub fn stage(&self) -> &dyn Stage {
        self.context.stage()
    }

    pub fn input(&self) -> &dyn Input {
        self.context.input()
    }

    /// Subscriber that turns a child's outcome into a signal for this
    /// machine: `on_done` when it completes, an abort when it fails.
    ///
    /// `on_done` is stamped with the current epoch. A completion that
    /// arrives after this machine left the launching state is dropped.
    pub fn notifier(&self, on_done: E) -> impl FnOnce(&Outcome) + 'static {
        let mailbox = self.mailbox.clone();
        let epoch = self.epoch;
        move |outcome| match outcome {
            Outcome::Completed => mailbox.post_event(on_done, epoch),
            Outcome::Aborted(fault) => mailbox.post(Signal::ChildFailed(fault.clone())),
        }
    }

    /// Subscribe to `child` and start it.
    pub fn launch<CS, CE, CD>(
        &self,
        child: &mut Machine<CS, CE, CD>,
        on_done: E,
    ) -> Result<(), MachineError>
    where
        CS: State,
        CE: Event,
        CD: Children + 'static,
    {
        self.launch_with(child, |_| {}, on_done)
    }

    /// Write the child's start parameters, subscribe to it, then start it.
    ///
    /// Fails without touching the child if it is already running.
    pub fn launch_with<CS, CE, CD, F>(
        &self,
        child: &mut Machine<CS, CE, CD>,
        configure: F,
        on_done: E,
    ) -> Result<(), MachineError>
    where
        CS: State,
        CE: Event,
        CD: Children + 'static,
        F: FnOnce(&mut CD),
    {
        if child.is_started() {
            return Err(MachineError::AlreadyStarted {
                machine: child.name().to_string(),
            });
        }
        configure(child.data_mut());
        child.subscribe(self.id, self.notifier(on_done));
        child.start()
    }
}
