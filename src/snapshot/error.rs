//! Snapshot error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Encoding to JSON or binary failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Decoding from JSON or binary failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Snapshot was written by an incompatible format version
    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}
