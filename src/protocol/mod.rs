//! Trial protocols: records, their validation and their sources.

mod error;
mod record;
mod schema;
mod shuffle;
mod source;

pub use error::{FieldError, ProtocolError};
pub use record::TrialRecord;
pub use schema::{FieldKind, RecordSchema};
pub use shuffle::Permutation;
pub use source::{TrialList, TrialSource};
