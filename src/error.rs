//! Crate-wide error type.

use crate::builder::BuildError;
use crate::config::ConfigError;
use crate::engine::MachineError;
use crate::protocol::{FieldError, ProtocolError};
use crate::session::SessionError;
use crate::snapshot::SnapshotError;
use thiserror::Error;

/// Any error the crate reports, and what hooks return when they fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Machine(#[from] MachineError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Failure raised by application hook code.
    #[error("{0}")]
    Hook(String),
}

impl Error {
    pub fn hook(message: impl Into<String>) -> Self {
        Error::Hook(message.into())
    }

    /// True for errors caused by a bad trial record.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Field(_) | Error::Protocol(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
