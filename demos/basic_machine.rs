//! A single fixation-cross machine: timeouts, a key response, hooks that
//! drive the stage, and a snapshot of where the machine ended up.

use std::rc::Rc;
use std::time::Duration;
use trialtree::builder::MachineBuilder;
use trialtree::collab::{Context, RecordingStage};
use trialtree::core::{ManualClock, State};
use trialtree::engine::EventRule;
use trialtree::logging::{init_logging, LogFormat};
use trialtree::{event_enum, state_enum};

state_enum! {
    enum Fixation {
        Cross,
        Stimulus,
        Responded,
        TimedOut,
    }
    final: [Responded, TimedOut]
}

event_enum! {
    enum Response {
        Key(char),
    }
}

#[derive(Default)]
struct Reaction {
    key: Option<char>,
    latency: Option<Duration>,
}

impl trialtree::Children for Reaction {}

fn main() -> Result<(), trialtree::Error> {
    init_logging(LogFormat::Human, 2);

    let clock = ManualClock::shared();
    let stage = Rc::new(RecordingStage::new());
    let context = Context::new(clock.clone()).with_stage(stage.clone());

    let mut machine = MachineBuilder::<Fixation, Response, Reaction>::new("fixation")
        .initial(Fixation::Cross)
        .after(Fixation::Cross, Duration::from_millis(500), Fixation::Stimulus)
        .after(Fixation::Stimulus, Duration::from_secs(2), Fixation::TimedOut)
        .rule(
            EventRule::matching(Fixation::Stimulus, |e: &Response| {
                matches!(e, Response::Key('f' | 'j'))
            })
            .then(|reaction: &mut Reaction, event, _| {
                let Response::Key(key) = event;
                reaction.key = Some(*key);
                Ok(())
            })
            .to(Fixation::Responded),
        )
        .enter(Fixation::Cross, |_, control| {
            control.stage().activate("cross");
            Ok(())
        })
        .exit(Fixation::Cross, |_, control| {
            control.stage().deactivate("cross");
            Ok(())
        })
        .enter(Fixation::Stimulus, |_, control| {
            control.stage().activate("stimulus");
            Ok(())
        })
        .exit(Fixation::Stimulus, |reaction, control| {
            reaction.latency = Some(control.time_in_state());
            control.stage().deactivate("stimulus");
            Ok(())
        })
        .build(context, Reaction::default())?;

    machine.start()?;
    for _ in 0..50 {
        clock.advance(Duration::from_millis(16));
        machine.tick();
    }
    machine.handle_event(Response::Key('q'));
    machine.handle_event(Response::Key('j'));

    let reaction = machine.data();
    println!("final state: {}", machine.state().name());
    println!(
        "key {:?} after {:?}",
        reaction.key,
        reaction.latency.unwrap_or_default()
    );
    println!("path: {}", machine.history().path_names().join(" -> "));
    println!("stage requests: {:?}", stage.operations());
    println!("{}", machine.snapshot().to_json()?);
    Ok(())
}
