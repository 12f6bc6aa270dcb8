// SPDX-License-Identifier: MIT

//! Snapshot schema and atomic save/load

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the promoted snapshot inside the persistent directory.
pub const STATE_FILE: &str = "state.json";

/// Scratch name the snapshot is written under before promotion.
const TEMP_STATE_FILE: &str = "~state.json";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state i/o failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// A monitored path and the write time last observed for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub path: String,
    /// Milliseconds since the Unix epoch.
    pub changed: u64,
}

/// A settled pipe: enough to re-intern it and its dependency set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeRecord {
    pub tool: String,
    #[serde(rename = "pathIn")]
    pub path_in: String,
    #[serde(rename = "pathOut")]
    pub path_out: String,
    #[serde(default)]
    pub settings: Value,
    /// Paths this pipe read on its last run; resolved back to monitored
    /// path ids on load.
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Everything the monitor persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentState {
    #[serde(default)]
    pub paths: Vec<PathRecord>,
    #[serde(default)]
    pub pipes: Vec<PipeRecord>,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StateError + '_ {
    move |source| StateError::Io { path: path.to_path_buf(), source }
}

/// Write the snapshot under its scratch name, then promote it by rename.
///
/// The promoted file is either the previous snapshot or the new one; a
/// crash mid-save never leaves a torn `state.json`.
pub fn save(persistent_dir: &Path, state: &PersistentState) -> Result<(), StateError> {
    std::fs::create_dir_all(persistent_dir).map_err(io_err(persistent_dir))?;

    let temp = persistent_dir.join(TEMP_STATE_FILE);
    let target = persistent_dir.join(STATE_FILE);

    let body = serde_json::to_vec_pretty(state)?;
    std::fs::write(&temp, body).map_err(io_err(&temp))?;

    if target.exists() {
        std::fs::remove_file(&target).map_err(io_err(&target))?;
    }
    std::fs::rename(&temp, &target).map_err(io_err(&temp))?;

    tracing::debug!(
        path = %target.display(),
        paths = state.paths.len(),
        pipes = state.pipes.len(),
        "state saved"
    );
    Ok(())
}

/// Load the snapshot if one exists. `Ok(None)` means a cold start.
pub fn load(persistent_dir: &Path) -> Result<Option<PersistentState>, StateError> {
    let target = persistent_dir.join(STATE_FILE);
    let bytes = match std::fs::read(&target) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StateError::Io { path: target, source: e }),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
