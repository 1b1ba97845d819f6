//! Builder for constructing machines.

use crate::builder::error::BuildError;
use crate::collab::Context;
use crate::compose::Children;
use crate::core::{Event, Guard, State};
use crate::engine::{
    Control, EventRule, Fire, Hook, HookKind, HookResult, Hooks, Machine, TickRule,
    TransitionTable,
};
use std::time::Duration;

/// Builder for constructing machines with a fluent API.
///
/// Rules are kept in declaration order; when several could fire, the one
/// declared first wins. Validation errors are collected while building and
/// reported by `build`.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use trialtree::builder::MachineBuilder;
/// use trialtree::collab::Context;
/// use trialtree::{event_enum, state_enum};
///
/// state_enum! {
///     enum Fixation {
///         Cross,
///         Stimulus,
///         Done,
///     }
///     final: [Done]
/// }
///
/// event_enum! {
///     enum Response {
///         Key(char),
///     }
/// }
///
/// let mut machine = MachineBuilder::<Fixation, Response, ()>::new("fixation")
///     .initial(Fixation::Cross)
///     .after(Fixation::Cross, Duration::from_millis(500), Fixation::Stimulus)
///     .on_when(Fixation::Stimulus, |e| matches!(e, Response::Key(_)), Fixation::Done)
///     .build(Context::detached(), ())
///     .unwrap();
///
/// machine.start().unwrap();
/// assert_eq!(machine.state(), &Fixation::Cross);
/// ```
pub struct MachineBuilder<S: State, E: Event, D> {
    name: String,
    initial: Option<S>,
    table: TransitionTable<S, E, D>,
    hooks: Hooks<S, E, D>,
    error: Option<BuildError>,
}

impl<S: State, E: Event, D: Children + 'static> MachineBuilder<S, E, D> {
    /// Create a new builder for a machine called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial: None,
            table: TransitionTable::new(),
            hooks: Hooks::new(),
            error: None,
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// In `from`, the event `event` moves to `to`.
    pub fn on(self, from: S, event: E, to: S) -> Self {
        self.rule(EventRule::exact(from, event).to(to))
    }

    /// In `from`, any event accepted by `matcher` moves to `to`.
    pub fn on_when<F>(self, from: S, matcher: F, to: S) -> Self
    where
        F: Fn(&E) -> bool + 'static,
    {
        self.rule(EventRule::matching(from, matcher).to(to))
    }

    /// Add a fully specified event rule (guard, action, optional target).
    pub fn rule(mut self, rule: EventRule<S, E, D>) -> Self {
        self.table.add_event_rule(rule);
        self
    }

    /// In `state`, move to `to` once strictly more than `timeout` has passed.
    pub fn after(self, state: S, timeout: Duration, to: S) -> Self {
        self.poll(state, Guard::after(timeout), Fire::Goto(to))
    }

    /// In `state`, dispatch `event` once strictly more than `timeout` has
    /// passed.
    pub fn after_dispatch(self, state: S, timeout: Duration, event: E) -> Self {
        self.poll(state, Guard::after(timeout), Fire::Dispatch(event))
    }

    /// In `state`, fire `fire` on the first tick `guard` passes.
    pub fn poll(mut self, state: S, guard: Guard<D, E>, fire: Fire<S, E>) -> Self {
        self.table.add_tick_rule(TickRule { state, guard, fire });
        self
    }

    pub fn on_start<F>(self, hook: F) -> Self
    where
        F: Fn(&mut D, &mut Control<'_, S, E>) -> HookResult + 'static,
    {
        self.hook(HookKind::Start, None, Box::new(hook))
    }

    pub fn on_stop<F>(self, hook: F) -> Self
    where
        F: Fn(&mut D, &mut Control<'_, S, E>) -> HookResult + 'static,
    {
        self.hook(HookKind::Stop, None, Box::new(hook))
    }

    pub fn enter<F>(self, state: S, hook: F) -> Self
    where
        F: Fn(&mut D, &mut Control<'_, S, E>) -> HookResult + 'static,
    {
        self.hook(HookKind::Enter, Some(state), Box::new(hook))
    }

    pub fn exit<F>(self, state: S, hook: F) -> Self
    where
        F: Fn(&mut D, &mut Control<'_, S, E>) -> HookResult + 'static,
    {
        self.hook(HookKind::Exit, Some(state), Box::new(hook))
    }

    /// Imperative per-tick side effect while in `state`.
    pub fn tick<F>(self, state: S, hook: F) -> Self
    where
        F: Fn(&mut D, &mut Control<'_, S, E>) -> HookResult + 'static,
    {
        self.hook(HookKind::Tick, Some(state), Box::new(hook))
    }

    fn hook(mut self, kind: HookKind, state: Option<S>, hook: Hook<S, E, D>) -> Self {
        if self.hooks.contains(kind, state.as_ref()) {
            let error = match &state {
                Some(state) => BuildError::DuplicateHook {
                    kind,
                    state: state.name().to_string(),
                },
                None => BuildError::DuplicateLifecycleHook(kind),
            };
            if self.error.is_none() {
                self.error = Some(error);
            }
            return self;
        }
        self.hooks.insert(kind, state, hook);
        self
    }

    /// Build the machine around `data`, stopped.
    /// Returns an error if required fields are missing.
    pub fn build(self, context: Context, data: D) -> Result<Machine<S, E, D>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        if self.table.is_empty() {
            return Err(BuildError::NoTransitions);
        }
        if let Some(error) = self.error {
            return Err(error);
        }

        Ok(Machine::new(
            self.name, initial, self.table, self.hooks, context, data,
        ))
    }
}
