//! Configuration errors raised while reading trial records.

use std::path::PathBuf;
use thiserror::Error;

/// A single field of a trial record that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("required field `{field}` is missing")]
    Missing { field: String },

    #[error("field `{field}` has value `{value}`, expected {expected}")]
    Malformed {
        field: String,
        value: String,
        expected: String,
    },
}

impl FieldError {
    pub fn field(&self) -> &str {
        match self {
            FieldError::Missing { field } | FieldError::Malformed { field, .. } => field,
        }
    }
}

/// Errors raised by trial sources and record validation.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("trial record rejected: {}", summarize(.0))]
    Rejected(Vec<FieldError>),

    #[error("trial source is exhausted")]
    Exhausted,

    #[error("cannot read protocol {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("protocol entry {index} is not an object")]
    NotAnObject { index: usize },

    #[error("protocol must be an array of trial records, found {found}")]
    NotAnArray { found: &'static str },
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
