//! Declarative transition policy of a machine type.
//!
//! A table holds two ordered rule lists. Event rules answer "what happens
//! when this event arrives in this state"; tick rules are polled once per
//! tick. In both lists the first applicable rule in declaration order wins.
//! Selection is pure: the engine applies the chosen rule.

use super::control::Control;
use super::hooks::HookResult;
use crate::core::{Guard, Probe, State};

/// How an event rule recognizes its event.
pub enum Trigger<E> {
    /// Equal to the given value.
    Exact(E),
    /// Accepted by the predicate; used for events carrying payloads.
    Matching(Box<dyn Fn(&E) -> bool>),
}

impl<E: PartialEq> Trigger<E> {
    pub fn matches(&self, event: &E) -> bool {
        match self {
            Trigger::Exact(expected) => expected == event,
            Trigger::Matching(predicate) => predicate(event),
        }
    }
}

/// Side effect run when an event rule fires, before its target is entered.
pub type Action<S, E, D> = Box<dyn Fn(&mut D, &E, &mut Control<'_, S, E>) -> HookResult>;

/// `(state, trigger, guard?) -> (action?, target?)`.
///
/// A rule without a target is internal: it runs its action and stays put.
pub struct EventRule<S, E, D> {
    pub from: S,
    pub trigger: Trigger<E>,
    pub guard: Option<Guard<D, E>>,
    pub action: Option<Action<S, E, D>>,
    pub target: Option<S>,
}

impl<S: State, E: PartialEq + 'static, D: 'static> EventRule<S, E, D> {
    pub fn new(from: S, trigger: Trigger<E>) -> Self {
        Self {
            from,
            trigger,
            guard: None,
            action: None,
            target: None,
        }
    }

    /// Rule triggered by an event equal to `event`.
    pub fn exact(from: S, event: E) -> Self {
        Self::new(from, Trigger::Exact(event))
    }

    /// Rule triggered by any event accepted by `predicate`.
    pub fn matching<F>(from: S, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + 'static,
    {
        Self::new(from, Trigger::Matching(Box::new(predicate)))
    }

    pub fn when(mut self, guard: Guard<D, E>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn then<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut D, &E, &mut Control<'_, S, E>) -> HookResult + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    pub fn to(mut self, target: S) -> Self {
        self.target = Some(target);
        self
    }

    fn applies(&self, state: &S, event: &E, probe: &Probe<'_, D, E>) -> bool {
        self.from == *state
            && self.trigger.matches(event)
            && self.guard.as_ref().map_or(true, |g| g.check(probe))
    }
}

/// What a tick rule does when its guard passes.
#[derive(Clone, Debug, PartialEq)]
pub enum Fire<S, E> {
    Goto(S),
    Dispatch(E),
}

/// `(state, guard) -> goto | dispatch`, polled every tick.
pub struct TickRule<S, E, D> {
    pub state: S,
    pub guard: Guard<D, E>,
    pub fire: Fire<S, E>,
}

pub struct TransitionTable<S, E, D> {
    event_rules: Vec<EventRule<S, E, D>>,
    tick_rules: Vec<TickRule<S, E, D>>,
}

impl<S: State, E: PartialEq + 'static, D: 'static> TransitionTable<S, E, D> {
    pub fn new() -> Self {
        Self {
            event_rules: Vec::new(),
            tick_rules: Vec::new(),
        }
    }

    pub fn add_event_rule(&mut self, rule: EventRule<S, E, D>) {
        self.event_rules.push(rule);
    }

    pub fn add_tick_rule(&mut self, rule: TickRule<S, E, D>) {
        self.tick_rules.push(rule);
    }

    /// First event rule for `(state, event)` whose guard passes.
    ///
    /// `probe` must carry `event`.
    pub fn select_event(
        &self,
        state: &S,
        event: &E,
        probe: &Probe<'_, D, E>,
    ) -> Option<&EventRule<S, E, D>> {
        self.event_rules
            .iter()
            .find(|rule| rule.applies(state, event, probe))
    }

    /// First tick rule of `state` whose guard passes.
    pub fn select_tick(&self, state: &S, probe: &Probe<'_, D, E>) -> Option<&Fire<S, E>> {
        self.tick_rules
            .iter()
            .filter(|rule| rule.state == *state)
            .find(|rule| rule.guard.check(probe))
            .map(|rule| &rule.fire)
    }

    pub fn event_rule_count(&self) -> usize {
        self.event_rules.len()
    }

    pub fn tick_rule_count(&self) -> usize {
        self.tick_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_rules.is_empty() && self.tick_rules.is_empty()
    }
}

impl<S: State, E: PartialEq + 'static, D: 'static> Default for TransitionTable<S, E, D> {
    fn default() -> Self {
        Self::new()
    }
}
