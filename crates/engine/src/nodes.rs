// SPDX-License-Identifier: MIT

//! Graph node types.
//!
//! Nodes reference each other by [`NodeId`] into per-kind tables; the
//! `equals_abstractly` relations define structural identity for interning.
//! Dependencies are never part of identity, which is what lets a re-parsed
//! hub reclaim previously orphaned nodes instead of rebuilding them.

use forge_core::{NodeId, TimePoint, Variables, EPOCH};
use forge_probe::WildcardWatch;
use serde_json::Value;
use std::path::PathBuf;

/// A concrete file the monitor polls for write-time changes.
#[derive(Debug, Clone)]
pub struct MonitoredPath {
    pub path: PathBuf,
    /// Last write time last observed; [`EPOCH`] if never observed.
    pub last_update: TimePoint,
    /// Re-probing is silenced until this wall-clock instant.
    pub timeout: TimePoint,
}

impl MonitoredPath {
    pub fn new(path: PathBuf, last_update: TimePoint, now: TimePoint) -> Self {
        Self { path, last_update, timeout: now }
    }
}

/// A directory-walk pattern resolving to a set of concrete paths.
#[derive(Debug, Clone)]
pub struct MonitoredWildcard {
    pub watch: WildcardWatch,
}

/// A manifest file whose parsed content declares child hubs and pipes.
#[derive(Debug, Clone)]
pub struct Hub {
    pub hub_dep: NodeId,
    pub path: PathBuf,
    pub path_deps: Vec<NodeId>,
    pub input_vars: Variables,
    pub timeout: TimePoint,
}

impl Hub {
    pub fn new(hub_dep: NodeId, path: PathBuf, input_vars: Variables) -> Self {
        Self { hub_dep, path, path_deps: Vec::new(), input_vars, timeout: EPOCH }
    }

    pub fn is_orphan(&self) -> bool {
        self.hub_dep.is_none()
    }

    /// Structural identity: the same file interpreted under the same
    /// variable environment. The parent hub is deliberately excluded.
    pub fn equals_abstractly(&self, other: &Hub) -> bool {
        self.path == other.path && self.input_vars == other.input_vars
    }
}

/// A templated pipe; its concrete instantiations are produced from the
/// wildcard's enumeration.
#[derive(Debug, Clone)]
pub struct PipeWildcard {
    pub hub_dep: NodeId,
    pub wildcard_dep: NodeId,
    pub tool: String,
    /// Pattern text, wildcards intact.
    pub base_in: String,
    /// Output template text; `~name~` holes are filled per match.
    pub base_out: String,
    pub input_vars: Variables,
    /// Kept untransformed; the per-match expansion interpolates a copy.
    pub settings: Value,
}

impl PipeWildcard {
    pub fn equals_abstractly(&self, other: &PipeWildcard) -> bool {
        self.tool == other.tool
            && self.base_in == other.base_in
            && self.base_out == other.base_out
            && self.input_vars == other.input_vars
            && self.settings == other.settings
    }
}

/// A concrete unit of work: one tool invocation over one input/output pair.
#[derive(Debug, Clone)]
pub struct Pipe {
    pub hub_dep: NodeId,
    pub wildcard_dep: NodeId,
    pub tool: String,
    pub base_in: PathBuf,
    pub base_out: PathBuf,
    pub settings: Value,
    /// Monitored paths this pipe read on its last run. Cleared when the
    /// pipe is shipped; refilled from the task result.
    pub path_deps: Vec<NodeId>,
    pub timeout: TimePoint,
    /// Loaded from the persistent snapshot and not yet reclaimed by a hub.
    /// Exempt from orphan cleanup until first adoption.
    pub from_snapshot: bool,
}

impl Pipe {
    pub fn new(
        hub_dep: NodeId,
        wildcard_dep: NodeId,
        tool: impl Into<String>,
        base_in: PathBuf,
        base_out: PathBuf,
        settings: Value,
    ) -> Self {
        Self {
            hub_dep,
            wildcard_dep,
            tool: tool.into(),
            base_in,
            base_out,
            settings,
            path_deps: Vec::new(),
            timeout: EPOCH,
            from_snapshot: false,
        }
    }

    pub fn is_orphan(&self) -> bool {
        self.hub_dep.is_none()
    }

    /// Structural identity: what would be executed, not where it came from.
    pub fn equals_abstractly(&self, other: &Pipe) -> bool {
        self.tool == other.tool
            && self.base_in == other.base_in
            && self.base_out == other.base_out
            && self.settings == other.settings
    }
}

#[cfg(test)]
#[path = "nodes_tests.rs"]
mod tests;
