//! Point-in-time snapshots of a machine, for session logs and debugging.
//!
//! A snapshot records where a machine is and how it got there during its
//! current activation. It does not include rules, hooks or data, which are
//! not serializable; snapshots are for inspection, not for resuming.

use crate::compose::Children;
use crate::core::{Event, State, StateHistory};
use crate::engine::{Machine, MachineId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable view of a machine's activation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Snapshot<S: State> {
    /// Snapshot format version
    pub version: u32,

    /// Machine the snapshot was taken from
    pub machine: MachineId,

    pub name: String,

    /// Wall-clock time the snapshot was taken
    pub taken_at: DateTime<Utc>,

    pub started: bool,

    pub state: S,

    /// Time spent in `state` when the snapshot was taken
    pub time_in_state: Duration,

    /// Activation number; 0 if never started
    pub activation: u64,

    /// Transitions of the activation so far
    pub history: StateHistory<S>,
}

impl<S: State> Snapshot<S> {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    fn check_version(self) -> Result<Self, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(self)
    }
}

impl<S: State, E: Event, D: Children + 'static> Machine<S, E, D> {
    /// Capture the machine's current position.
    pub fn snapshot(&self) -> Snapshot<S> {
        Snapshot {
            version: SNAPSHOT_VERSION,
            machine: self.id(),
            name: self.name().to_string(),
            taken_at: Utc::now(),
            started: self.is_started(),
            state: self.state().clone(),
            time_in_state: self.time_in_state(),
            activation: self.activation(),
            history: self.history().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MachineBuilder;
    use crate::collab::Context;
    use crate::core::ManualClock;
    use crate::{event_enum, state_enum};

    state_enum! {
        enum Phase {
            Baseline,
            Exposure,
            Rating,
        }
        final: [Rating]
    }

    event_enum! {
        enum Cue {
            Threat,
        }
    }

    fn snapshot_after_exposure() -> Snapshot<Phase> {
        let clock = ManualClock::shared();
        let mut machine = MachineBuilder::<Phase, Cue, ()>::new("threat")
            .initial(Phase::Baseline)
            .on(Phase::Baseline, Cue::Threat, Phase::Exposure)
            .after(Phase::Exposure, Duration::from_secs(2), Phase::Rating)
            .build(Context::new(clock.clone()), ())
            .unwrap();
        machine.start().unwrap();
        clock.advance(Duration::from_millis(700));
        machine.handle_event(Cue::Threat);
        clock.advance(Duration::from_millis(300));
        machine.snapshot()
    }

    #[test]
    fn snapshot_captures_position() {
        let snapshot = snapshot_after_exposure();

        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.name, "threat");
        assert!(snapshot.started);
        assert_eq!(snapshot.state, Phase::Exposure);
        assert_eq!(snapshot.time_in_state, Duration::from_millis(300));
        assert_eq!(snapshot.activation, 1);
        assert_eq!(snapshot.history.path_names(), vec!["Baseline", "Exposure"]);
    }

    #[test]
    fn json_encoding_preserves_fields() {
        let snapshot = snapshot_after_exposure();
        let json = snapshot.to_json().unwrap();
        let decoded = Snapshot::<Phase>::from_json(&json).unwrap();

        assert_eq!(decoded.machine, snapshot.machine);
        assert_eq!(decoded.state, snapshot.state);
        assert_eq!(decoded.history.len(), 1);
    }

    #[test]
    fn binary_encoding_preserves_fields() {
        let snapshot = snapshot_after_exposure();
        let bytes = snapshot.to_bytes().unwrap();
        let decoded = Snapshot::<Phase>::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.taken_at, snapshot.taken_at);
        assert_eq!(decoded.time_in_state, snapshot.time_in_state);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut snapshot = snapshot_after_exposure();
        snapshot.version = SNAPSHOT_VERSION + 1;
        let json = snapshot.to_json().unwrap();

        assert!(matches!(
            Snapshot::<Phase>::from_json(&json),
            Err(SnapshotError::UnsupportedVersion { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            Snapshot::<Phase>::from_json("{}"),
            Err(SnapshotError::DeserializationFailed(_))
        ));
    }
}
