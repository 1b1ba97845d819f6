//! Side-effect hooks attached to lifecycle points and states.

use super::control::Control;
use crate::core::State;
use crate::error::Error;
use std::fmt;

/// What every hook returns. An error aborts the machine.
pub type HookResult = Result<(), Error>;

pub type Hook<S, E, D> = Box<dyn Fn(&mut D, &mut Control<'_, S, E>) -> HookResult>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    Start,
    Stop,
    Enter,
    Exit,
    Tick,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::Start => "start",
            HookKind::Stop => "stop",
            HookKind::Enter => "enter",
            HookKind::Exit => "exit",
            HookKind::Tick => "tick",
        };
        f.write_str(name)
    }
}

/// The hook set of one machine type.
///
/// At most one hook per `(kind, state)`; lifecycle hooks are unique too.
pub struct Hooks<S, E, D> {
    on_start: Option<Hook<S, E, D>>,
    on_stop: Option<Hook<S, E, D>>,
    enter: Vec<(S, Hook<S, E, D>)>,
    exit: Vec<(S, Hook<S, E, D>)>,
    tick: Vec<(S, Hook<S, E, D>)>,
}

impl<S: State, E, D> Hooks<S, E, D> {
    pub fn new() -> Self {
        Self {
            on_start: None,
            on_stop: None,
            enter: Vec::new(),
            exit: Vec::new(),
            tick: Vec::new(),
        }
    }

    fn per_state(&self, kind: HookKind) -> Option<&Vec<(S, Hook<S, E, D>)>> {
        match kind {
            HookKind::Enter => Some(&self.enter),
            HookKind::Exit => Some(&self.exit),
            HookKind::Tick => Some(&self.tick),
            HookKind::Start | HookKind::Stop => None,
        }
    }

    /// Whether a hook of `kind` exists; `state` is ignored for lifecycle kinds.
    pub fn contains(&self, kind: HookKind, state: Option<&S>) -> bool {
        match kind {
            HookKind::Start => self.on_start.is_some(),
            HookKind::Stop => self.on_stop.is_some(),
            _ => match (self.per_state(kind), state) {
                (Some(hooks), Some(state)) => hooks.iter().any(|(s, _)| s == state),
                _ => false,
            },
        }
    }

    /// Install a hook, replacing any previous one of the same key.
    pub fn insert(&mut self, kind: HookKind, state: Option<S>, hook: Hook<S, E, D>) {
        let slot = match kind {
            HookKind::Start => {
                self.on_start = Some(hook);
                return;
            }
            HookKind::Stop => {
                self.on_stop = Some(hook);
                return;
            }
            HookKind::Enter => &mut self.enter,
            HookKind::Exit => &mut self.exit,
            HookKind::Tick => &mut self.tick,
        };
        if let Some(state) = state {
            slot.retain(|(s, _)| *s != state);
            slot.push((state, hook));
        }
    }

    pub fn on_start(&self) -> Option<&Hook<S, E, D>> {
        self.on_start.as_ref()
    }

    pub fn on_stop(&self) -> Option<&Hook<S, E, D>> {
        self.on_stop.as_ref()
    }

    pub fn enter(&self, state: &S) -> Option<&Hook<S, E, D>> {
        lookup(&self.enter, state)
    }

    pub fn exit(&self, state: &S) -> Option<&Hook<S, E, D>> {
        lookup(&self.exit, state)
    }

    pub fn tick(&self, state: &S) -> Option<&Hook<S, E, D>> {
        lookup(&self.tick, state)
    }
}

impl<S: State, E, D> Default for Hooks<S, E, D> {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'h, S: PartialEq, H>(hooks: &'h [(S, H)], state: &S) -> Option<&'h H> {
    hooks.iter().find(|(s, _)| s == state).map(|(_, hook)| hook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_enum;

    state_enum! {
        enum Phase {
            Fixation,
            Stimulus,
        }
    }

    fn noop() -> Hook<Phase, (), u32> {
        Box::new(|_, _| Ok(()))
    }

    #[test]
    fn lookup_by_state() {
        let mut hooks: Hooks<Phase, (), u32> = Hooks::new();
        hooks.insert(HookKind::Enter, Some(Phase::Stimulus), noop());
        hooks.insert(HookKind::Start, None, noop());

        assert!(hooks.enter(&Phase::Stimulus).is_some());
        assert!(hooks.enter(&Phase::Fixation).is_none());
        assert!(hooks.exit(&Phase::Stimulus).is_none());
        assert!(hooks.on_start().is_some());
        assert!(hooks.on_stop().is_none());
    }

    #[test]
    fn contains_distinguishes_kinds() {
        let mut hooks: Hooks<Phase, (), u32> = Hooks::new();
        hooks.insert(HookKind::Tick, Some(Phase::Fixation), noop());

        assert!(hooks.contains(HookKind::Tick, Some(&Phase::Fixation)));
        assert!(!hooks.contains(HookKind::Enter, Some(&Phase::Fixation)));
        assert!(!hooks.contains(HookKind::Stop, None));
        assert_eq!(HookKind::Tick.to_string(), "tick");
    }
}
