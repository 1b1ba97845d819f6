//! The generic machine engine.
//!
//! A `Machine` owns its current state, its data and a queue of requests.
//! Every public operation ends by settling that queue: requests queued by
//! hooks, and signals posted by children, are applied in order before the
//! call returns. Nothing is deferred to a later tick.
//!
//! Children are owned through the parent's data, so input meant for a child
//! goes through [`Machine::route`]. The parent then reacts to a completion
//! the child posted before `route` returns.

use super::completion::{Completion, Fault, MachineId, Outcome};
use super::control::{Control, Directive};
use super::error::MachineError;
use super::hooks::{Hook, HookResult, Hooks};
use super::table::{Fire, TransitionTable};
use crate::collab::Context;
use crate::compose::{Children, Mailbox, Node, NodeStatus, Signal};
use crate::core::{Cause, Event, Probe, State, StateHistory, StateTransition, Timestamp};
use crate::error::Error;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Upper bound on requests applied by one engine call.
pub const MAX_SETTLE_STEPS: usize = 1024;

/// A state machine instance.
///
/// `S` is the state enumeration, `E` the event enumeration and `D` the
/// machine's own data: the fields its parent writes before starting it and
/// the children it owns.
pub struct Machine<S: State, E: Event, D> {
    id: MachineId,
    name: String,
    initial: S,
    current: S,
    entered_at: Timestamp,
    started: bool,
    epoch: u64,
    activation: u64,
    history: StateHistory<S>,
    fault: Option<Fault>,
    table: Rc<TransitionTable<S, E, D>>,
    hooks: Rc<Hooks<S, E, D>>,
    context: Context,
    data: D,
    pending: VecDeque<Directive<S, E>>,
    mailbox: Mailbox<E>,
    completion: Completion,
}

impl<S: State, E: Event, D: Children + 'static> Machine<S, E, D> {
    /// Assemble a stopped machine. `MachineBuilder` is the usual way in.
    pub fn new(
        name: impl Into<String>,
        initial: S,
        table: TransitionTable<S, E, D>,
        hooks: Hooks<S, E, D>,
        context: Context,
        data: D,
    ) -> Self {
        let entered_at = context.now();
        Self {
            id: MachineId::new(),
            name: name.into(),
            current: initial.clone(),
            initial,
            entered_at,
            started: false,
            epoch: 0,
            activation: 0,
            history: StateHistory::new(),
            fault: None,
            table: Rc::new(table),
            hooks: Rc::new(hooks),
            context,
            data,
            pending: VecDeque::new(),
            mailbox: Mailbox::new(),
            completion: Completion::new(),
        }
    }

    /// Begin a new activation in the initial state.
    ///
    /// Runs the start hook, then the initial state's entry hook, then applies
    /// whatever they requested. A failing hook aborts the activation; that is
    /// reported to completion subscribers, not here.
    pub fn start(&mut self) -> Result<(), MachineError> {
        if self.started {
            return Err(MachineError::AlreadyStarted {
                machine: self.name.clone(),
            });
        }

        self.started = true;
        self.current = self.initial.clone();
        self.entered_at = self.context.now();
        self.epoch += 1;
        self.activation += 1;
        self.history = StateHistory::new();
        self.fault = None;
        self.pending.clear();
        self.mailbox.clear();
        info!(
            machine = %self.name,
            activation = self.activation,
            state = self.current.name(),
            "machine started"
        );

        let hooks = Rc::clone(&self.hooks);
        let clean = match hooks.on_start() {
            Some(hook) => self.run_hook(hook),
            None => true,
        };
        if clean {
            let initial = self.current.clone();
            if let Some(hook) = hooks.enter(&initial) {
                self.run_hook(hook);
            }
            self.queue_terminal(&initial);
        }

        self.settle();
        Ok(())
    }

    /// End the activation normally. No-op when stopped.
    ///
    /// Started children are stopped first, then the stop hook runs, then
    /// every completion subscriber is notified once. The current state's
    /// exit hook does not run.
    pub fn stop(&mut self) {
        self.finish(None);
    }

    /// End the activation with `error` as its fault. No-op when stopped.
    pub fn abort(&mut self, error: impl Into<Error>) {
        if !self.started {
            return;
        }
        let fault = Fault::new(self.name.clone(), error);
        self.finish(Some(fault));
    }

    /// Dispatch `event` to the current state. Ignored when stopped.
    pub fn handle_event(&mut self, event: E) {
        if !self.started {
            trace!(machine = %self.name, event = event.name(), "event ignored, machine stopped");
            return;
        }
        self.dispatch(&event);
        self.settle();
    }

    /// Move to `next` unconditionally. Ignored when stopped.
    pub fn change_state(&mut self, next: S) {
        if !self.started {
            trace!(machine = %self.name, to = next.name(), "state change ignored, machine stopped");
            return;
        }
        self.transition(next, Cause::Direct);
        self.settle();
    }

    /// Run `deliver` against this machine's data, then apply whatever the
    /// children it reached posted back.
    ///
    /// This is how a host hands input to a descendant:
    /// `root.route(|r| r.block.route(|b| b.wave.handle_event(Touch)))`.
    pub fn route<R>(&mut self, deliver: impl FnOnce(&mut D) -> R) -> R {
        let result = deliver(&mut self.data);
        self.settle();
        result
    }

    /// One frame: tick hook, then tick rules, then children.
    ///
    /// Tick rules are skipped when the tick hook already changed state, and
    /// at most one tick rule fires.
    pub fn tick(&mut self) {
        if !self.started {
            return;
        }
        let epoch = self.epoch;

        let hooks = Rc::clone(&self.hooks);
        if let Some(hook) = hooks.tick(&self.current) {
            self.run_hook(hook);
            self.settle();
        }

        if self.started && self.epoch == epoch {
            self.poll_rules();
            self.settle();
        }

        if self.started {
            self.data.visit_children(&mut |child| child.tick());
            self.settle();
        }
    }

    /// Subscribe to the end of the current activation, or of the next one
    /// if the machine is stopped. A second subscription under the same key
    /// is ignored and `false` is returned.
    pub fn subscribe<F>(&mut self, key: MachineId, notify: F) -> bool
    where
        F: FnOnce(&Outcome) + 'static,
    {
        let added = self.completion.subscribe(key, notify);
        if !added {
            warn!(machine = %self.name, subscriber = %key, "duplicate completion subscription ignored");
        }
        added
    }

    pub fn id(&self) -> MachineId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &S {
        &self.current
    }

    pub fn initial_state(&self) -> &S {
        &self.initial
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn entered_at(&self) -> Timestamp {
        self.entered_at
    }

    pub fn time_in_state(&self) -> Duration {
        self.context.now().since(self.entered_at)
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    /// Transitions of the current (or last) activation.
    pub fn history(&self) -> &StateHistory<S> {
        &self.history
    }

    /// Why the last activation aborted, if it did.
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Number of times the machine has been started.
    pub fn activation(&self) -> u64 {
        self.activation
    }

    /// Counter bumped by every start and every state change. Queued
    /// requests and child completions carry the epoch they were issued in.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Handle for posting signals to this machine.
    pub fn mailbox(&self) -> Mailbox<E> {
        self.mailbox.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.completion.len()
    }

    fn invoke<F>(&mut self, hook: F) -> Result<(), Fault>
    where
        F: FnOnce(&mut D, &mut Control<'_, S, E>) -> HookResult,
    {
        let mut control = Control {
            id: self.id,
            name: &self.name,
            state: &self.current,
            epoch: self.epoch,
            now: self.context.now(),
            entered_at: self.entered_at,
            context: &self.context,
            mailbox: &self.mailbox,
            pending: &mut self.pending,
        };
        let result = hook(&mut self.data, &mut control);

        result.map_err(|error| {
            let fault = Fault::new(self.name.clone(), error);
            warn!(
                machine = %self.name,
                state = self.current.name(),
                error = %fault.error(),
                "hook failed"
            );
            fault
        })
    }

    /// Run `hook`; on failure queue an abort ahead of everything else.
    fn run_hook(&mut self, hook: &Hook<S, E, D>) -> bool {
        match self.invoke(|data, control| hook(data, control)) {
            Ok(()) => true,
            Err(fault) => {
                self.pending.push_front(Directive::Abort(fault));
                false
            }
        }
    }

    fn poll_rules(&mut self) {
        let table = Rc::clone(&self.table);
        let now = self.context.now();
        let probe = Probe {
            data: &self.data,
            event: None,
            time_in_state: now.since(self.entered_at),
            now,
            context: &self.context,
        };
        let fired = table.select_tick(&self.current, &probe).cloned();

        match fired {
            Some(Fire::Goto(target)) => self.transition(target, Cause::Tick),
            Some(Fire::Dispatch(event)) => self.dispatch(&event),
            None => {}
        }
    }

    fn dispatch(&mut self, event: &E) {
        let table = Rc::clone(&self.table);
        let now = self.context.now();
        let probe = Probe {
            data: &self.data,
            event: Some(event),
            time_in_state: now.since(self.entered_at),
            now,
            context: &self.context,
        };
        let Some(rule) = table.select_event(&self.current, event, &probe) else {
            trace!(
                machine = %self.name,
                state = self.current.name(),
                event = event.name(),
                "no rule for event"
            );
            return;
        };

        if let Some(action) = &rule.action {
            let result = self.invoke(|data, control| action(data, event, control));
            if let Err(fault) = result {
                self.pending.push_front(Directive::Abort(fault));
                return;
            }
        }
        if let Some(target) = &rule.target {
            self.transition(target.clone(), Cause::Event(event.name().to_string()));
        }
    }

    fn transition(&mut self, target: S, cause: Cause) {
        let hooks = Rc::clone(&self.hooks);
        if let Some(hook) = hooks.exit(&self.current) {
            if !self.run_hook(hook) {
                return;
            }
        }

        let now = self.context.now();
        let from = std::mem::replace(&mut self.current, target.clone());
        self.entered_at = now;
        self.epoch += 1;
        debug!(
            machine = %self.name,
            from = from.name(),
            to = target.name(),
            cause = ?cause,
            "state changed"
        );
        self.history.push(StateTransition {
            from,
            to: target.clone(),
            at: now,
            cause,
        });

        if let Some(hook) = hooks.enter(&target) {
            self.run_hook(hook);
        }
        self.queue_terminal(&target);
    }

    /// Error states abort the activation, other final states stop it.
    fn queue_terminal(&mut self, state: &S) {
        if state.is_error() {
            let error = MachineError::ErrorState {
                machine: self.name.clone(),
                state: state.name().to_string(),
            };
            let fault = Fault::new(self.name.clone(), error);
            self.pending.push_back(Directive::Abort(fault));
        } else if state.is_final() {
            self.pending.push_back(Directive::Stop);
        }
    }

    fn settle(&mut self) {
        let mut steps = 0;
        while self.started {
            let directive = match self.pending.pop_front() {
                Some(directive) => directive,
                None => match self.mailbox.take() {
                    Some(Signal::Event { event, epoch }) => Directive::Dispatch { event, epoch },
                    Some(Signal::ChildFailed(fault)) => Directive::Abort(fault),
                    None => break,
                },
            };

            steps += 1;
            if steps > MAX_SETTLE_STEPS {
                warn!(
                    machine = %self.name,
                    limit = MAX_SETTLE_STEPS,
                    "request chain too long, dropping queued requests"
                );
                self.pending.clear();
                break;
            }
            self.apply(directive);
        }
    }

    fn apply(&mut self, directive: Directive<S, E>) {
        match directive {
            Directive::Goto {
                target,
                epoch,
                cause,
            } => {
                if epoch == self.epoch {
                    self.transition(target, cause);
                } else {
                    trace!(machine = %self.name, to = target.name(), "stale state change dropped");
                }
            }
            Directive::Dispatch { event, epoch } => {
                if epoch == self.epoch {
                    self.dispatch(&event);
                } else {
                    debug!(machine = %self.name, event = event.name(), "stale event dropped");
                }
            }
            Directive::Stop => self.finish(None),
            Directive::Abort(fault) => self.finish(Some(fault)),
        }
    }

    fn finish(&mut self, fault: Option<Fault>) {
        if !self.started {
            trace!(machine = %self.name, "stop ignored, machine stopped");
            return;
        }
        self.started = false;

        self.data.visit_children(&mut |child| child.stop());

        let mut fault = fault;
        let hooks = Rc::clone(&self.hooks);
        if let Some(hook) = hooks.on_stop() {
            if let Err(stop_fault) = self.invoke(|data, control| hook(data, control)) {
                if fault.is_none() {
                    fault = Some(stop_fault);
                }
            }
        }
        self.pending.clear();
        self.mailbox.clear();

        let outcome = match fault {
            Some(fault) => {
                warn!(
                    machine = %self.name,
                    activation = self.activation,
                    state = self.current.name(),
                    fault = %fault,
                    "machine aborted"
                );
                self.fault = Some(fault.clone());
                Outcome::Aborted(fault)
            }
            None => {
                info!(
                    machine = %self.name,
                    activation = self.activation,
                    state = self.current.name(),
                    "machine completed"
                );
                Outcome::Completed
            }
        };
        let notified = self.completion.fire(&outcome);
        trace!(machine = %self.name, notified, "completion fired");
    }
}

impl<S: State, E: Event, D: Children + 'static> Node for Machine<S, E, D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn tick(&mut self) {
        Machine::tick(self);
    }

    fn stop(&mut self) {
        Machine::stop(self);
    }

    fn status(&self) -> NodeStatus {
        NodeStatus {
            name: self.name.clone(),
            state: self.current.name().to_string(),
            started: self.started,
            time_in_state: self.time_in_state(),
            activation: self.activation,
        }
    }

    fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    fn visit_children(&mut self, visit: &mut dyn FnMut(&mut dyn Node)) {
        self.data.visit_children(visit);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<S: State, E: Event, D> fmt::Debug for Machine<S, E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.name)
            .field("state", &self.current)
            .field("started", &self.started)
            .field("activation", &self.activation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MachineBuilder;
    use crate::core::ManualClock;
    use crate::{event_enum, state_enum};
    use std::cell::{Cell, RefCell};

    state_enum! {
        enum Step {
            Ready,
            Running,
            Paused,
            Done,
        }
        final: [Done]
    }

    event_enum! {
        enum Cmd {
            Go,
            Pause,
            Finish,
        }
    }

    #[derive(Default)]
    struct Log {
        entries: Vec<String>,
    }

    impl Children for Log {}

    fn machine(clock: Rc<ManualClock>) -> Machine<Step, Cmd, Log> {
        MachineBuilder::new("stepper")
            .initial(Step::Ready)
            .on(Step::Ready, Cmd::Go, Step::Running)
            .on(Step::Running, Cmd::Pause, Step::Paused)
            .on(Step::Running, Cmd::Finish, Step::Done)
            .on(Step::Paused, Cmd::Go, Step::Running)
            .on_start(|log: &mut Log, _| {
                log.entries.push("start".into());
                Ok(())
            })
            .on_stop(|log: &mut Log, _| {
                log.entries.push("stop".into());
                Ok(())
            })
            .enter(Step::Running, |log: &mut Log, _| {
                log.entries.push("enter Running".into());
                Ok(())
            })
            .exit(Step::Running, |log: &mut Log, _| {
                log.entries.push("exit Running".into());
                Ok(())
            })
            .build(Context::new(clock), Log::default())
            .unwrap()
    }

    #[test]
    fn hooks_run_in_lifecycle_order() {
        let mut m = machine(ManualClock::shared());
        m.start().unwrap();
        m.handle_event(Cmd::Go);
        m.handle_event(Cmd::Finish);

        assert!(!m.is_started());
        assert_eq!(m.state(), &Step::Done);
        assert_eq!(
            m.data().entries,
            vec!["start", "enter Running", "exit Running", "stop"]
        );
        assert_eq!(m.history().path_names(), vec!["Ready", "Running", "Done"]);
    }

    #[test]
    fn double_start_is_reported() {
        let mut m = machine(ManualClock::shared());
        m.start().unwrap();
        assert!(matches!(m.start(), Err(MachineError::AlreadyStarted { .. })));
    }

    #[test]
    fn restart_resets_activation_state() {
        let clock = ManualClock::shared();
        let mut m = machine(Rc::clone(&clock));
        m.start().unwrap();
        m.handle_event(Cmd::Go);
        m.stop();

        clock.advance(Duration::from_secs(3));
        m.start().unwrap();

        assert_eq!(m.state(), &Step::Ready);
        assert_eq!(m.activation(), 2);
        assert!(m.history().is_empty());
        assert_eq!(m.time_in_state(), Duration::ZERO);
    }

    #[test]
    fn stopped_machine_ignores_everything() {
        let mut m = machine(ManualClock::shared());
        m.handle_event(Cmd::Go);
        m.change_state(Step::Running);
        m.tick();
        m.stop();

        assert_eq!(m.state(), &Step::Ready);
        assert!(m.data().entries.is_empty());
        assert_eq!(m.activation(), 0);
    }

    #[test]
    fn failing_hook_aborts_with_fault() {
        let outcome = Rc::new(RefCell::new(None));
        let mut m = MachineBuilder::<Step, Cmd, ()>::new("fragile")
            .initial(Step::Ready)
            .on(Step::Ready, Cmd::Go, Step::Running)
            .enter(Step::Running, |_, _| Err(Error::hook("projector offline")))
            .build(Context::detached(), ())
            .unwrap();
        let seen = Rc::clone(&outcome);
        m.subscribe(MachineId::new(), move |o| {
            *seen.borrow_mut() = Some(o.clone());
        });

        m.start().unwrap();
        m.handle_event(Cmd::Go);

        assert!(!m.is_started());
        assert_eq!(m.fault().map(|f| f.origin()), Some("fragile"));
        assert!(matches!(*outcome.borrow(), Some(Outcome::Aborted(_))));
    }

    #[test]
    fn requests_from_a_left_state_are_dropped() {
        let mut m = MachineBuilder::<Step, Cmd, ()>::new("racer")
            .initial(Step::Ready)
            .on(Step::Ready, Cmd::Go, Step::Running)
            .on(Step::Running, Cmd::Pause, Step::Paused)
            // exit hook asks for Done, but the event's own target wins
            .exit(Step::Ready, |_, control| {
                control.goto(Step::Done);
                Ok(())
            })
            .build(Context::detached(), ())
            .unwrap();

        m.start().unwrap();
        m.handle_event(Cmd::Go);

        assert_eq!(m.state(), &Step::Running);
        assert!(m.is_started());
    }

    #[test]
    fn enter_hook_can_chain_transitions() {
        let entered = Rc::new(Cell::new(0));
        let counter = Rc::clone(&entered);
        let mut m = MachineBuilder::<Step, Cmd, ()>::new("chain")
            .initial(Step::Ready)
            .on(Step::Running, Cmd::Finish, Step::Done)
            .enter(Step::Ready, |_, control| {
                control.goto(Step::Running);
                Ok(())
            })
            .enter(Step::Running, move |_, control| {
                counter.set(counter.get() + 1);
                control.dispatch(Cmd::Finish);
                Ok(())
            })
            .build(Context::detached(), ())
            .unwrap();

        m.start().unwrap();

        assert_eq!(entered.get(), 1);
        assert_eq!(m.state(), &Step::Done);
        assert!(!m.is_started());
    }

    #[test]
    fn runaway_chain_is_cut() {
        let mut m = MachineBuilder::<Step, Cmd, ()>::new("loop")
            .initial(Step::Running)
            .on(Step::Paused, Cmd::Go, Step::Running)
            .enter(Step::Running, |_, control| {
                control.goto(Step::Paused);
                Ok(())
            })
            .enter(Step::Paused, |_, control| {
                control.goto(Step::Running);
                Ok(())
            })
            .build(Context::detached(), ())
            .unwrap();

        m.start().unwrap();

        assert!(m.is_started());
        assert_eq!(m.history().len(), MAX_SETTLE_STEPS);
    }

    #[test]
    fn mailbox_events_are_dispatched_on_next_call() {
        let mut m = machine(ManualClock::shared());
        m.start().unwrap();
        m.mailbox().post_event(Cmd::Go, m.epoch());
        m.tick();

        assert_eq!(m.state(), &Step::Running);
    }

    #[test]
    fn mailbox_events_from_an_earlier_state_are_dropped() {
        let mut m = machine(ManualClock::shared());
        m.start().unwrap();
        let ready = m.epoch();
        m.handle_event(Cmd::Go);
        m.handle_event(Cmd::Pause);
        m.handle_event(Cmd::Go);

        m.mailbox().post_event(Cmd::Finish, ready);
        m.tick();

        assert!(m.is_started());
        assert_eq!(m.state(), &Step::Running);
        assert!(m.mailbox().is_empty());
    }

    #[test]
    fn route_settles_after_delivery() {
        let mut m = machine(ManualClock::shared());
        m.start().unwrap();
        let mailbox = m.mailbox();
        let epoch = m.epoch();

        let returned = m.route(|log| {
            log.entries.push("routed".into());
            mailbox.post_event(Cmd::Go, epoch);
            7
        });

        assert_eq!(returned, 7);
        assert_eq!(m.state(), &Step::Running);
        assert_eq!(m.data().entries, vec!["start", "routed", "enter Running"]);
    }

    state_enum! {
        enum Tracking {
            Following,
            Lost,
        }
        final: [Lost]
        error: [Lost]
    }

    #[test]
    fn entering_an_error_state_aborts() {
        let mut m = MachineBuilder::<Tracking, Cmd, ()>::new("tracker")
            .initial(Tracking::Following)
            .on(Tracking::Following, Cmd::Pause, Tracking::Lost)
            .build(Context::detached(), ())
            .unwrap();
        m.start().unwrap();
        m.handle_event(Cmd::Pause);

        assert!(!m.is_started());
        let fault = m.fault().unwrap();
        assert_eq!(fault.origin(), "tracker");
        assert!(matches!(
            fault.error(),
            Error::Machine(MachineError::ErrorState { state, .. }) if state == "Lost"
        ));
    }

    #[test]
    fn failing_entry_hook_outranks_the_error_state() {
        let mut m = MachineBuilder::<Tracking, Cmd, ()>::new("tracker")
            .initial(Tracking::Following)
            .on(Tracking::Following, Cmd::Pause, Tracking::Lost)
            .enter(Tracking::Lost, |_, _| Err(Error::hook("marker occluded")))
            .build(Context::detached(), ())
            .unwrap();
        m.start().unwrap();
        m.handle_event(Cmd::Pause);

        assert_eq!(
            m.fault().map(|f| f.error().to_string()),
            Some("marker occluded".to_string())
        );
    }
}
