// SPDX-License-Identifier: MIT

use crate::status::TrackedInfo;
use serde::{Deserialize, Serialize};

/// Response from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Tracked-state snapshot
    Status { info: TrackedInfo },

    /// Daemon is shutting down
    ShuttingDown,

    /// Error response
    Error { message: String },
}
