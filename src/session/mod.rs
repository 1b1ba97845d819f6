//! The session root: one participant, one protocol, one trial at a time.
//!
//! ```text
//! Idle --Begin--> Start --ProtocolLoaded--> Interval --NextTrial--> Trial
//!                                            ^   |                    |
//!                                            |   +--(no more)--> End  |
//!                                            +----TrialFinished-------+
//! ```
//!
//! Entering `Start` reserves the output directory and opens the record
//! sink. Each pass through `Interval` waits the inter-trial interval, then
//! `Trial` pops a record, hands it to the trial machine's data and starts
//! the trial. When the trial completes its result row is appended.

mod error;
mod output;

pub use error::SessionError;
pub use output::{output_dir, reserve};

use crate::builder::{BuildError, MachineBuilder};
use crate::collab::{Context, RecordSink};
use crate::compose::{Children, Node};
use crate::config::SessionConfig;
use crate::core::{Event, Guard, State};
use crate::engine::{EventRule, Fire, Machine};
use crate::protocol::{ProtocolError, TrialRecord, TrialSource};
use crate::{event_enum, state_enum};
use std::path::{Path, PathBuf};
use tracing::info;

state_enum! {
    pub enum SessionState {
        Idle,
        Start,
        Interval,
        Trial,
        End,
    }
    final: [End]
}

event_enum! {
    pub enum SessionEvent {
        Begin,
        ProtocolLoaded,
        NextTrial,
        TrialFinished,
    }
}

/// Data of the machine that runs one trial.
///
/// `prepare` receives the trial's record before every start and must
/// write every field the trial reads at start; a bad record is a
/// configuration error and the trial is not started.
pub trait Trial: Children + 'static {
    type State: State;
    type Event: Event;

    fn prepare(&mut self, record: &TrialRecord) -> Result<(), ProtocolError>;

    /// Result columns of the trial that just completed.
    fn result_row(&self) -> Vec<String>;
}

pub type TrialMachine<T> = Machine<<T as Trial>::State, <T as Trial>::Event, T>;

/// Data of the session root machine.
pub struct Session<T: Trial> {
    config: SessionConfig,
    source: Box<dyn TrialSource>,
    sink: Box<dyn RecordSink>,
    trial: TrialMachine<T>,
    trial_index: usize,
    output_dir: Option<PathBuf>,
}

impl<T: Trial> Session<T> {
    pub fn new(
        config: SessionConfig,
        source: impl TrialSource + 'static,
        sink: impl RecordSink + 'static,
        trial: TrialMachine<T>,
    ) -> Self {
        Self {
            config,
            source: Box::new(source),
            sink: Box::new(sink),
            trial,
            trial_index: 0,
            output_dir: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 1-based index of the current trial; 0 before the first.
    pub fn trial_index(&self) -> usize {
        self.trial_index
    }

    pub fn trials_remaining(&self) -> usize {
        self.source.count()
    }

    pub fn trial(&self) -> &TrialMachine<T> {
        &self.trial
    }

    pub fn trial_mut(&mut self) -> &mut TrialMachine<T> {
        &mut self.trial
    }

    /// Directory reserved when the session started.
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn sink_is_open(&self) -> bool {
        self.sink.is_open()
    }
}

impl<T: Trial> Children for Session<T> {
    fn visit_children(&mut self, visit: &mut dyn FnMut(&mut dyn Node)) {
        visit(&mut self.trial);
    }
}

pub type SessionMachine<T> = Machine<SessionState, SessionEvent, Session<T>>;

/// Build the session root around `trial`.
pub fn session_machine<T: Trial>(
    config: SessionConfig,
    source: impl TrialSource + 'static,
    sink: impl RecordSink + 'static,
    trial: TrialMachine<T>,
    context: Context,
) -> Result<SessionMachine<T>, BuildError> {
    use SessionEvent::*;
    use SessionState as S;

    let interval = config.inter_trial_interval();
    let mut builder = MachineBuilder::<S, SessionEvent, Session<T>>::new("session")
        .initial(S::Idle)
        .on(S::Idle, Begin, S::Start)
        .on(S::Start, ProtocolLoaded, S::Interval)
        .after_dispatch(S::Interval, interval, NextTrial)
        .on(S::Interval, NextTrial, S::Trial)
        .rule(
            EventRule::exact(S::Trial, TrialFinished)
                .then(|session: &mut Session<T>, _, _| {
                    let mut row = vec![session.trial_index.to_string()];
                    row.extend(session.trial.data().result_row());
                    session.sink.append(&row).map_err(SessionError::Sink)?;
                    Ok(())
                })
                .to(S::Interval),
        )
        .enter(S::Start, |session, control| {
            let dir = session.config.output_dir();
            reserve(&dir)?;
            session.sink.open(&dir).map_err(SessionError::Sink)?;
            info!(
                experiment = %session.config.experiment,
                participant = %session.config.participant,
                output = %dir.display(),
                trials = session.source.count(),
                "session started"
            );
            session.output_dir = Some(dir);
            control.dispatch(ProtocolLoaded);
            Ok(())
        })
        .enter(S::Interval, |session, control| {
            if session.source.has_more() {
                session.trial_index += 1;
            } else {
                info!(trials = session.trial_index, "protocol finished");
                control.goto(S::End);
            }
            Ok(())
        })
        .enter(S::Trial, |session, control| {
            let record = session.source.pop()?;
            session.trial.data_mut().prepare(&record)?;
            info!(trial = session.trial_index, "trial started");
            control.launch(&mut session.trial, TrialFinished)?;
            Ok(())
        })
        .on_stop(|session, _| {
            session.sink.close().map_err(SessionError::Sink)?;
            Ok(())
        });

    if let Some(key) = &config.start_key {
        builder = builder.poll(S::Idle, Guard::pressed(key.clone()), Fire::Dispatch(Begin));
    }

    builder.build(context, Session::new(config, source, sink, trial))
}
