//! External collaborators.
//!
//! The engine never renders, reads devices or writes files itself. Hooks
//! reach the outside world through these traits, bundled in a `Context`
//! that is handed to every machine at construction.

mod context;
mod input;
mod sink;
mod stage;

pub use context::Context;
pub use input::{Input, NullInput, ScriptedInput};
pub use sink::{stamped_file_name, CsvSink, MemorySink, RecordSink};
pub use stage::{NullStage, RecordingStage, Stage, StageOp};
