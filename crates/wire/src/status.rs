// SPDX-License-Identifier: MIT

//! Status payload types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubEntry {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildcardEntry {
    pub path: String,
}

/// What the pipeline is currently tracking, as served by the status page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedInfo {
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub paths: Vec<PathEntry>,
    #[serde(default)]
    pub hubs: Vec<HubEntry>,
    #[serde(default)]
    pub wildcards: Vec<WildcardEntry>,
}
