// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// Request from a client to the daemon, dispatched by method name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check
    Ping,

    /// Start the change monitor
    StartProcessing,

    /// Stop the change monitor
    StopProcessing,

    /// Add a root hub manifest; relative paths resolve against the
    /// reference directory
    AddBaseHubFile { path: String },

    /// Override the anchor for relative hub paths (monitor must be stopped)
    SetReferenceDirectory { path: String },

    /// Override where `state.json` lives (monitor must be stopped)
    SetPersistentDirectory { path: String },

    /// Snapshot of tracked hubs, paths and wildcards
    Status,

    /// Shut the daemon down
    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
