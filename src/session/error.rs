//! Errors raised by the session root.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("output directory {path} already exists, refusing to overwrite a previous session")]
    OutputExists { path: PathBuf },

    #[error("cannot create output directory {path}: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record sink failed: {0}")]
    Sink(#[source] std::io::Error),
}
