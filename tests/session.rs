//! The session root running a protocol end to end.

use std::fs;
use std::time::Duration;
use trialtree::builder::MachineBuilder;
use trialtree::collab::{Context, CsvSink, MemorySink};
use trialtree::compose::Children;
use trialtree::config::SessionConfig;
use trialtree::core::ManualClock;
use trialtree::engine::Machine;
use trialtree::protocol::{FieldError, ProtocolError, TrialList, TrialRecord};
use trialtree::session::{session_machine, SessionError, SessionEvent, SessionState, Trial};
use trialtree::{event_enum, state_enum, Error};

const FRAME: Duration = Duration::from_millis(50);

state_enum! {
    enum ReachState {
        Reaching,
        Done,
    }
    final: [Done]
}

event_enum! {
    enum ReachEvent {
        Touch,
    }
}

#[derive(Default)]
struct Reach {
    targets: u32,
    hand: String,
}

impl Children for Reach {}

impl Trial for Reach {
    type State = ReachState;
    type Event = ReachEvent;

    fn prepare(&mut self, record: &TrialRecord) -> Result<(), ProtocolError> {
        self.targets = record.required("Targets")?;
        self.hand = record.or("Hand", "right".to_string())?;
        Ok(())
    }

    fn result_row(&self) -> Vec<String> {
        vec![self.targets.to_string(), self.hand.clone()]
    }
}

fn reach_trial(context: &Context) -> Machine<ReachState, ReachEvent, Reach> {
    MachineBuilder::<ReachState, ReachEvent, Reach>::new("reach")
        .initial(ReachState::Reaching)
        .on(ReachState::Reaching, ReachEvent::Touch, ReachState::Done)
        .after(ReachState::Reaching, Duration::from_millis(200), ReachState::Done)
        .build(context.clone(), Reach::default())
        .unwrap()
}

fn config(root: &std::path::Path) -> SessionConfig {
    SessionConfig::new("Visuomotor", "P01")
        .with_output_root(root)
        .with_inter_trial_interval(Duration::from_millis(500))
}

fn run(session: &mut trialtree::session::SessionMachine<Reach>, clock: &ManualClock) {
    for _ in 0..200 {
        if !session.is_started() {
            return;
        }
        clock.advance(FRAME);
        session.tick();
    }
}

#[test]
fn rows_are_written_in_trial_order() {
    let root = tempfile::tempdir().unwrap();
    let clock = ManualClock::shared();
    let context = Context::new(clock.clone());
    let protocol = TrialList::from_json_str(
        r#"[
            {"Targets": 4, "Hand": "left"},
            {"Targets": 2},
            {"Targets": 6, "Hand": "left"}
        ]"#,
    )
    .unwrap();
    let mut session = session_machine(
        config(root.path()),
        protocol,
        CsvSink::new("results.csv"),
        reach_trial(&context),
        context,
    )
    .unwrap();

    session.start().unwrap();
    assert_eq!(session.state(), &SessionState::Idle);
    session.handle_event(SessionEvent::Begin);
    assert_eq!(session.state(), &SessionState::Interval);
    run(&mut session, &clock);

    assert!(!session.is_started());
    assert!(session.fault().is_none());
    assert_eq!(session.state(), &SessionState::End);
    assert_eq!(session.data().trial_index(), 3);
    assert!(!session.data().sink_is_open());
    assert_eq!(session.data().trial().activation(), 3);

    let dir = root.path().join("Visuomotor").join("P01");
    assert_eq!(session.data().output_dir(), Some(dir.as_path()));
    let written = fs::read_to_string(dir.join("results.csv")).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines, vec!["1, 4, left", "2, 2, right", "3, 6, left"]);
}

#[test]
fn trials_wait_the_inter_trial_interval() {
    let root = tempfile::tempdir().unwrap();
    let clock = ManualClock::shared();
    let context = Context::new(clock.clone());
    let protocol = TrialList::from_records([
        TrialRecord::new().with("Targets", "1"),
        TrialRecord::new().with("Targets", "2"),
    ]);
    let mut session = session_machine(
        config(root.path()),
        protocol,
        MemorySink::new(),
        reach_trial(&context),
        context,
    )
    .unwrap();

    session.start().unwrap();
    session.handle_event(SessionEvent::Begin);

    clock.advance(Duration::from_millis(500));
    session.tick();
    assert_eq!(session.state(), &SessionState::Interval);

    clock.advance(FRAME);
    session.tick();
    assert_eq!(session.state(), &SessionState::Trial);
    assert!(session.data().trial().is_started());

    session.route(|session| session.trial_mut().handle_event(ReachEvent::Touch));
    assert_eq!(session.state(), &SessionState::Interval);
    assert_eq!(session.data().trial_index(), 2);
    assert_eq!(session.time_in_state(), Duration::ZERO);
}

#[test]
fn malformed_parameter_aborts_before_the_trial_starts() {
    let root = tempfile::tempdir().unwrap();
    let clock = ManualClock::shared();
    let context = Context::new(clock.clone());
    let protocol = TrialList::from_records([TrialRecord::new().with("Targets", "three")]);
    let sink = MemorySink::new();
    let rows = sink.rows();
    let mut session =
        session_machine(config(root.path()), protocol, sink, reach_trial(&context), context)
            .unwrap();

    session.start().unwrap();
    session.handle_event(SessionEvent::Begin);
    run(&mut session, &clock);

    assert!(!session.is_started());
    assert_eq!(session.data().trial().activation(), 0);
    assert!(rows.borrow().is_empty());
    assert!(!session.data().sink_is_open());

    let fault = session.fault().unwrap();
    assert_eq!(fault.origin(), "session");
    assert!(fault.error().is_configuration());
    match fault.error() {
        Error::Protocol(ProtocolError::Field(FieldError::Malformed { field, value, .. })) => {
            assert_eq!(field, "Targets");
            assert_eq!(value, "three");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn existing_output_directory_aborts_before_any_trial() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("Visuomotor").join("P01")).unwrap();
    let clock = ManualClock::shared();
    let context = Context::new(clock.clone());
    let protocol = TrialList::from_records([
        TrialRecord::new().with("Targets", "1"),
        TrialRecord::new().with("Targets", "2"),
    ]);
    let sink = MemorySink::new();
    let rows = sink.rows();
    let mut session =
        session_machine(config(root.path()), protocol, sink, reach_trial(&context), context)
            .unwrap();

    session.start().unwrap();
    session.handle_event(SessionEvent::Begin);

    assert!(!session.is_started());
    assert_eq!(session.data().trial_index(), 0);
    assert_eq!(session.data().trials_remaining(), 2);
    assert_eq!(session.data().trial().activation(), 0);
    assert!(rows.borrow().is_empty());
    assert!(matches!(
        session.fault().map(|f| f.error()),
        Some(Error::Session(SessionError::OutputExists { .. }))
    ));
}

#[test]
fn empty_protocol_ends_right_after_start() {
    let root = tempfile::tempdir().unwrap();
    let context = Context::detached();
    let mut session = session_machine(
        config(root.path()),
        TrialList::new(),
        MemorySink::new(),
        reach_trial(&context),
        context,
    )
    .unwrap();

    session.start().unwrap();
    session.handle_event(SessionEvent::Begin);

    assert!(!session.is_started());
    assert!(session.fault().is_none());
    assert_eq!(
        session.history().path_names(),
        vec!["Idle", "Start", "Interval", "End"]
    );
}
