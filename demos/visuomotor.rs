//! A full session of a visuomotor reaching experiment, simulated.
//!
//! ```text
//! session ─ trial ─ block ─┬─ wave           (reach for a lit target)
//!                          ├─ threat         (optional knife exposure)
//!                          └─ questionnaire  (ratings in random order)
//! ```
//!
//! Time is simulated with a manual clock and the participant with scripted
//! key presses. Results are written as CSV under the system temp directory.

use std::rc::Rc;
use std::time::Duration;
use trialtree::builder::{BuildError, MachineBuilder};
use trialtree::collab::{Context, RecordingStage, ScriptedInput};
use trialtree::compose::{Children, Driver, Node};
use trialtree::config::SessionConfig;
use trialtree::core::{Guard, ManualClock};
use trialtree::engine::{EventRule, Fire, Machine};
use trialtree::logging::{init_logging, LogFormat};
use trialtree::protocol::{
    FieldKind, Permutation, ProtocolError, RecordSchema, TrialList, TrialRecord,
};
use trialtree::session::{session_machine, SessionMachine, Trial};
use trialtree::{event_enum, state_enum};

const TARGETS: usize = 4;
const QUESTIONS: usize = 3;
const FRAME: Duration = Duration::from_millis(16);

// Wave: one reach towards a lit target.

state_enum! {
    enum WaveState {
        Reach,
        Touched,
        Missed,
    }
    final: [Touched, Missed]
}

event_enum! {
    enum WaveEvent {
        Touch,
    }
}

#[derive(Default)]
struct Wave {
    target: usize,
    touched: bool,
}

impl Children for Wave {}

fn target_id(target: usize) -> String {
    format!("target_{target}")
}

fn wave_machine(context: &Context) -> Result<Machine<WaveState, WaveEvent, Wave>, BuildError> {
    MachineBuilder::<WaveState, WaveEvent, Wave>::new("wave")
        .initial(WaveState::Reach)
        .on(WaveState::Reach, WaveEvent::Touch, WaveState::Touched)
        .poll(
            WaveState::Reach,
            Guard::pressed("touch"),
            Fire::Goto(WaveState::Touched),
        )
        .after(WaveState::Reach, Duration::from_secs(2), WaveState::Missed)
        .on_start(|wave, _| {
            wave.touched = false;
            Ok(())
        })
        .enter(WaveState::Reach, |wave, control| {
            control.stage().activate(&target_id(wave.target));
            Ok(())
        })
        .exit(WaveState::Reach, |wave, control| {
            control.stage().deactivate(&target_id(wave.target));
            Ok(())
        })
        .enter(WaveState::Touched, |wave, _| {
            wave.touched = true;
            Ok(())
        })
        .build(context.clone(), Wave::default())
}

// Threat: a knife appears over the virtual hand, unless disabled.

state_enum! {
    enum ThreatState {
        Calm,
        Exposed,
        Done,
    }
    final: [Done]
}

event_enum! {
    enum ThreatEvent {
        Skip,
    }
}

#[derive(Default)]
struct Threat {
    enabled: bool,
    exposures: u32,
}

impl Children for Threat {}

fn threat_machine(
    context: &Context,
) -> Result<Machine<ThreatState, ThreatEvent, Threat>, BuildError> {
    MachineBuilder::<ThreatState, ThreatEvent, Threat>::new("threat")
        .initial(ThreatState::Calm)
        .on(ThreatState::Calm, ThreatEvent::Skip, ThreatState::Done)
        .after(ThreatState::Calm, Duration::from_secs(1), ThreatState::Exposed)
        .after(ThreatState::Exposed, Duration::from_millis(500), ThreatState::Done)
        .on_start(|threat, control| {
            if !threat.enabled {
                control.dispatch(ThreatEvent::Skip);
            }
            Ok(())
        })
        .enter(ThreatState::Exposed, |threat, control| {
            threat.exposures += 1;
            control.stage().activate("knife");
            Ok(())
        })
        .exit(ThreatState::Exposed, |threat, control| {
            tracing::debug!(exposures = threat.exposures, "threat withdrawn");
            control.stage().deactivate("knife");
            Ok(())
        })
        .build(context.clone(), Threat::default())
}

// Questionnaire: every question once, in a fresh random order.

state_enum! {
    enum QuestionState {
        Asking,
        Done,
    }
    final: [Done]
}

event_enum! {
    enum QuestionEvent {
        Answered,
    }
}

struct Questionnaire {
    seed: u64,
    order: Permutation,
    current: Option<usize>,
    answers: Vec<(usize, u8)>,
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self {
            seed: 0,
            order: Permutation::identity(0),
            current: None,
            answers: Vec::new(),
        }
    }
}

impl Children for Questionnaire {}

fn question_id(question: usize) -> String {
    format!("question_{question}")
}

fn questionnaire_machine(
    context: &Context,
) -> Result<Machine<QuestionState, QuestionEvent, Questionnaire>, BuildError> {
    MachineBuilder::<QuestionState, QuestionEvent, Questionnaire>::new("questionnaire")
        .initial(QuestionState::Asking)
        .after_dispatch(
            QuestionState::Asking,
            Duration::from_millis(400),
            QuestionEvent::Answered,
        )
        .rule(
            EventRule::exact(QuestionState::Asking, QuestionEvent::Answered)
                .then(|q: &mut Questionnaire, _, _| {
                    if let Some(question) = q.current {
                        q.answers.push((question, (question % 7) as u8 + 1));
                    }
                    Ok(())
                })
                .to(QuestionState::Asking),
        )
        .on_start(|q, _| {
            q.order = Permutation::seeded(QUESTIONS, q.seed);
            q.answers.clear();
            Ok(())
        })
        .enter(QuestionState::Asking, |q, control| {
            match q.order.next_index() {
                Some(question) => {
                    q.current = Some(question);
                    control.stage().activate(&question_id(question));
                }
                None => control.goto(QuestionState::Done),
            }
            Ok(())
        })
        .exit(QuestionState::Asking, |q, control| {
            if let Some(question) = q.current.take() {
                control.stage().deactivate(&question_id(question));
            }
            Ok(())
        })
        .build(context.clone(), Questionnaire::default())
}

// Block: a run of waves, then the threat, then the questionnaire.

state_enum! {
    enum BlockState {
        Waves,
        Threat,
        Questions,
        End,
    }
    final: [End]
}

event_enum! {
    enum BlockEvent {
        WaveDone,
        ThreatDone,
        QuestionsDone,
    }
}

struct Block {
    waves: u32,
    threat: bool,
    waves_done: u32,
    touches: u32,
    answers: usize,
    wave: Machine<WaveState, WaveEvent, Wave>,
    threat_task: Machine<ThreatState, ThreatEvent, Threat>,
    questionnaire: Machine<QuestionState, QuestionEvent, Questionnaire>,
}

impl Children for Block {
    fn visit_children(&mut self, visit: &mut dyn FnMut(&mut dyn Node)) {
        visit(&mut self.wave);
        visit(&mut self.threat_task);
        visit(&mut self.questionnaire);
    }
}

fn block_machine(
    context: &Context,
) -> Result<Machine<BlockState, BlockEvent, Block>, BuildError> {
    let block = Block {
        waves: 0,
        threat: false,
        waves_done: 0,
        touches: 0,
        answers: 0,
        wave: wave_machine(context)?,
        threat_task: threat_machine(context)?,
        questionnaire: questionnaire_machine(context)?,
    };

    MachineBuilder::<BlockState, BlockEvent, Block>::new("block")
        .initial(BlockState::Waves)
        .rule(
            EventRule::exact(BlockState::Waves, BlockEvent::WaveDone).then(
                |block: &mut Block, _, control| {
                    block.waves_done += 1;
                    if block.wave.data().touched {
                        block.touches += 1;
                    }
                    if block.waves_done < block.waves {
                        control.goto(BlockState::Waves);
                    } else {
                        control.goto(BlockState::Threat);
                    }
                    Ok(())
                },
            ),
        )
        .on(BlockState::Threat, BlockEvent::ThreatDone, BlockState::Questions)
        .rule(
            EventRule::exact(BlockState::Questions, BlockEvent::QuestionsDone)
                .then(|block: &mut Block, _, _| {
                    block.answers = block.questionnaire.data().answers.len();
                    Ok(())
                })
                .to(BlockState::End),
        )
        .on_start(|block, _| {
            block.waves_done = 0;
            block.touches = 0;
            block.answers = 0;
            Ok(())
        })
        .enter(BlockState::Waves, |block, control| {
            let target = block.waves_done as usize % TARGETS;
            control.launch_with(
                &mut block.wave,
                |wave| wave.target = target,
                BlockEvent::WaveDone,
            )?;
            Ok(())
        })
        .enter(BlockState::Threat, |block, control| {
            let enabled = block.threat;
            control.launch_with(
                &mut block.threat_task,
                |threat| threat.enabled = enabled,
                BlockEvent::ThreatDone,
            )?;
            Ok(())
        })
        .enter(BlockState::Questions, |block, control| {
            let seed = u64::from(block.waves_done) * 31 + u64::from(block.touches);
            control.launch_with(
                &mut block.questionnaire,
                |q| q.seed = seed,
                BlockEvent::QuestionsDone,
            )?;
            Ok(())
        })
        .build(context.clone(), block)
}

// Trial: the blocks one protocol record asks for.

state_enum! {
    enum ReachState {
        Blocks,
        Done,
    }
    final: [Done]
}

event_enum! {
    enum ReachEvent {
        BlockDone,
    }
}

struct ReachTrial {
    blocks: u32,
    waves_per_block: u32,
    threat: bool,
    block_index: u32,
    touches: u32,
    answers: usize,
    block: Machine<BlockState, BlockEvent, Block>,
}

impl Children for ReachTrial {
    fn visit_children(&mut self, visit: &mut dyn FnMut(&mut dyn Node)) {
        visit(&mut self.block);
    }
}

fn record_schema() -> RecordSchema {
    RecordSchema::new()
        .required("Blocks", FieldKind::Integer)
        .optional("WavesPerBlock", FieldKind::Integer)
        .optional("Threat", FieldKind::Flag)
}

impl Trial for ReachTrial {
    type State = ReachState;
    type Event = ReachEvent;

    fn prepare(&mut self, record: &TrialRecord) -> Result<(), ProtocolError> {
        record_schema().check(record)?;
        self.blocks = record.required("Blocks")?;
        self.waves_per_block = record.or("WavesPerBlock", 3)?;
        self.threat = record.flag_or("Threat", false)?;
        self.block_index = 0;
        self.touches = 0;
        self.answers = 0;
        Ok(())
    }

    fn result_row(&self) -> Vec<String> {
        vec![
            self.blocks.to_string(),
            self.waves_per_block.to_string(),
            self.threat.to_string(),
            self.touches.to_string(),
            self.answers.to_string(),
        ]
    }
}

fn trial_machine(
    context: &Context,
) -> Result<Machine<ReachState, ReachEvent, ReachTrial>, BuildError> {
    let trial = ReachTrial {
        blocks: 0,
        waves_per_block: 0,
        threat: false,
        block_index: 0,
        touches: 0,
        answers: 0,
        block: block_machine(context)?,
    };

    MachineBuilder::<ReachState, ReachEvent, ReachTrial>::new("trial")
        .initial(ReachState::Blocks)
        .rule(
            EventRule::exact(ReachState::Blocks, ReachEvent::BlockDone).then(
                |trial: &mut ReachTrial, _, control| {
                    trial.block_index += 1;
                    trial.touches += trial.block.data().touches;
                    trial.answers += trial.block.data().answers;
                    control.goto(ReachState::Blocks);
                    Ok(())
                },
            ),
        )
        .enter(ReachState::Blocks, |trial, control| {
            if trial.block_index >= trial.blocks {
                control.goto(ReachState::Done);
                return Ok(());
            }
            let (waves, threat) = (trial.waves_per_block, trial.threat);
            control.launch_with(
                &mut trial.block,
                |block| {
                    block.waves = waves;
                    block.threat = threat;
                },
                ReachEvent::BlockDone,
            )?;
            Ok(())
        })
        .build(context.clone(), trial)
}

const PROTOCOL: &str = r#"[
    {"Blocks": 2, "WavesPerBlock": 2, "Threat": true},
    {"Blocks": 1, "Threat": false},
    {"Blocks": 1, "WavesPerBlock": 1}
]"#;

fn main() -> Result<(), trialtree::Error> {
    init_logging(LogFormat::Human, 1);

    let clock = ManualClock::shared();
    let stage = Rc::new(RecordingStage::new());
    let input = Rc::new(ScriptedInput::new());
    let context = Context::new(clock.clone())
        .with_stage(stage.clone())
        .with_input(input.clone());

    let output_root = std::env::temp_dir().join(format!("trialtree-demo-{}", std::process::id()));
    let config = SessionConfig::new("Visuomotor", "P01")
        .with_output_root(&output_root)
        .with_start_key("space");
    let sink = config.csv_sink();

    let mut protocol = TrialList::from_json_str(PROTOCOL)?;
    protocol.shuffle(7);

    let mut session = session_machine(config, protocol, sink, trial_machine(&context)?, context)?;
    session.start()?;

    let mut driver = Driver::new();
    let index = driver.register(session);

    input.press("space");
    for frame in 0..20_000u32 {
        clock.advance(FRAME);
        // Touch a target every 90 frames, held for 5 frames.
        if frame % 90 < 5 {
            input.press("touch");
        } else {
            input.release("touch");
        }
        driver.step();

        if frame % 250 == 0 {
            for (depth, status) in driver.statuses() {
                println!("{:indent$}{status}", "", indent = depth * 2);
            }
        }
        if driver.is_idle() {
            break;
        }
    }

    let session = driver
        .root_mut::<SessionMachine<ReachTrial>>(index)
        .ok_or_else(|| trialtree::Error::hook("session root missing"))?;
    match session.fault() {
        Some(fault) => println!("session aborted: {fault}"),
        None => println!("session completed after {} trials", session.data().trial_index()),
    }
    if let Some(dir) = session.data().output_dir() {
        println!("results in {}", dir.display());
    }
    println!("stage requests: {}", stage.operations().len());
    Ok(())
}
