//! Property-based tests for machines, histories and permutations.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use proptest::prelude::*;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use trialtree::builder::MachineBuilder;
use trialtree::collab::Context;
use trialtree::core::{Cause, ManualClock, State, StateHistory, StateTransition, Timestamp};
use trialtree::protocol::Permutation;
use trialtree::{event_enum, state_enum};

state_enum! {
    enum TestState {
        Initial,
        Processing,
        Complete,
        Failed,
    }
    final: [Complete, Failed]
    error: [Failed]
}

event_enum! {
    enum TestEvent {
        Advance,
        Finish,
    }
}

prop_compose! {
    fn arbitrary_state()(variant in 0..4u8) -> TestState {
        match variant {
            0 => TestState::Initial,
            1 => TestState::Processing,
            2 => TestState::Complete,
            _ => TestState::Failed,
        }
    }
}

prop_compose! {
    fn arbitrary_event()(finish in any::<bool>()) -> TestEvent {
        if finish { TestEvent::Finish } else { TestEvent::Advance }
    }
}

proptest! {
    #[test]
    fn state_error_implies_final(state in arbitrary_state()) {
        prop_assert!(!state.is_error() || state.is_final());
    }

    #[test]
    fn history_preserves_order(
        transitions in prop::collection::vec(arbitrary_state(), 1..10)
    ) {
        let mut history = StateHistory::new();
        let mut expected_path = vec![TestState::Initial];

        for (i, to_state) in transitions.iter().enumerate() {
            let from_state = if i == 0 {
                TestState::Initial
            } else {
                transitions[i - 1]
            };

            let transition = StateTransition {
                from: from_state,
                to: *to_state,
                at: Timestamp::from_millis(i as u64 * 10),
                cause: Cause::Tick,
            };

            history = history.record(transition);
            expected_path.push(*to_state);
        }

        let path = history.get_path();
        prop_assert_eq!(path.len(), expected_path.len());

        for (i, state) in path.iter().enumerate() {
            prop_assert_eq!(*state, &expected_path[i]);
        }
        prop_assert_eq!(
            history.duration(),
            Some(Duration::from_millis((transitions.len() as u64 - 1) * 10))
        );
    }

    #[test]
    fn history_record_is_pure(state1 in arbitrary_state(), state2 in arbitrary_state()) {
        let history = StateHistory::new();

        let transition = StateTransition {
            from: state1,
            to: state2,
            at: Timestamp::ZERO,
            cause: Cause::Direct,
        };

        let new_history = history.record(transition);

        // Original history unchanged
        prop_assert_eq!(history.transitions().len(), 0);
        prop_assert_eq!(new_history.transitions().len(), 1);
    }

    #[test]
    fn permutation_visits_every_index_once(len in 0..64usize, seed in any::<u64>()) {
        let mut order = Permutation::seeded(len, seed);
        let mut seen = vec![false; len];

        while let Some(index) = order.next_index() {
            prop_assert!(index < len);
            prop_assert!(!seen[index]);
            seen[index] = true;
        }
        prop_assert!(seen.into_iter().all(|s| s));
        prop_assert_eq!(order.remaining(), 0);
    }

    #[test]
    fn seeded_permutations_repeat(len in 0..32usize, seed in any::<u64>()) {
        let a = Permutation::seeded(len, seed);
        let b = Permutation::seeded(len, seed);
        prop_assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn time_in_state_grows_until_a_change(
        steps in prop::collection::vec(1..50u64, 1..40),
    ) {
        let clock = ManualClock::shared();
        let mut machine = MachineBuilder::<TestState, TestEvent, ()>::new("timer")
            .initial(TestState::Initial)
            .after(TestState::Initial, Duration::from_millis(200), TestState::Processing)
            .on(TestState::Processing, TestEvent::Finish, TestState::Complete)
            .build(Context::new(clock.clone()), ())
            .unwrap();
        machine.start().unwrap();

        let mut last = machine.time_in_state();
        let mut state = *machine.state();
        for step in steps {
            clock.advance(Duration::from_millis(step));
            machine.tick();
            let now = machine.time_in_state();
            if *machine.state() == state {
                prop_assert!(now >= last);
            } else {
                prop_assert!(now <= Duration::from_millis(step));
                state = *machine.state();
            }
            last = now;
        }
    }

    #[test]
    fn completion_fires_at_most_once_per_activation(
        events in prop::collection::vec(arbitrary_event(), 0..20),
        extra_stops in 0..3usize,
    ) {
        let fired = Rc::new(Cell::new(0u32));
        let mut machine = MachineBuilder::<TestState, TestEvent, ()>::new("counter")
            .initial(TestState::Initial)
            .on(TestState::Initial, TestEvent::Advance, TestState::Processing)
            .on(TestState::Processing, TestEvent::Advance, TestState::Initial)
            .on(TestState::Processing, TestEvent::Finish, TestState::Complete)
            .build(Context::detached(), ())
            .unwrap();

        let counter = Rc::clone(&fired);
        machine.subscribe(trialtree::MachineId::new(), move |_| counter.set(counter.get() + 1));
        machine.start().unwrap();

        for event in events {
            machine.handle_event(event);
        }
        for _ in 0..extra_stops {
            machine.stop();
        }

        let expected = u32::from(!machine.is_started());
        prop_assert_eq!(fired.get(), expected);
    }
}
