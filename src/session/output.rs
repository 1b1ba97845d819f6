//! Output directory of a session.

use super::error::SessionError;
use std::fs;
use std::path::{Path, PathBuf};

/// `root/experiment/participant`.
pub fn output_dir(root: &Path, experiment: &str, participant: &str) -> PathBuf {
    root.join(experiment).join(participant)
}

/// Create `dir`, failing if it already exists.
///
/// A participant code that was already used must never overwrite the
/// earlier session's results.
pub fn reserve(dir: &Path) -> Result<(), SessionError> {
    if dir.exists() {
        return Err(SessionError::OutputExists {
            path: dir.to_path_buf(),
        });
    }
    fs::create_dir_all(dir).map_err(|source| SessionError::CreateOutput {
        path: dir.to_path_buf(),
        source,
    })
}
