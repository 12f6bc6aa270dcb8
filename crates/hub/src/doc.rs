// SPDX-License-Identifier: MIT

//! Hub manifest document model.
//!
//! The recognized keys at any level are `vars`, `groups`, `hubs` and
//! `pipes`; everything else is ignored silently. Shape violations are fatal
//! for that hub's interpretation only; the monitor times the hub out and
//! retries.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub file is not valid UTF-8")]
    Encoding,
    #[error("hub file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("hub root must be a JSON object")]
    NotAnObject,
}

/// One nesting level of a hub file. The root of a hub is itself a group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HubGroup {
    /// Raw `[{name: value}, …]` definitions, applied via [`crate::adapt`].
    #[serde(default)]
    pub vars: Option<Value>,
    #[serde(default)]
    pub groups: Vec<HubGroup>,
    #[serde(default)]
    pub hubs: Vec<HubRef>,
    #[serde(default)]
    pub pipes: Vec<PipeSpec>,
}

/// Reference to a child hub file, relative to the current directory.
#[derive(Debug, Clone, Deserialize)]
pub struct HubRef {
    pub path: String,
    #[serde(default)]
    pub vars: Option<Value>,
}

/// A pipe declaration: one tool applied over one or more path pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct PipeSpec {
    pub tool: String,
    #[serde(default)]
    pub vars: Option<Value>,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub paths: Vec<PathPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathPair {
    #[serde(rename = "in")]
    pub input: String,
    #[serde(rename = "out")]
    pub output: String,
}

/// Parse hub file bytes into its root group.
pub fn parse_hub(bytes: &[u8]) -> Result<HubGroup, HubError> {
    let text = std::str::from_utf8(bytes).map_err(|_| HubError::Encoding)?;
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(HubError::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
#[path = "doc_tests.rs"]
mod tests;
