// SPDX-License-Identifier: MIT

//! Dense node identifiers for the dependency graph

use serde::{Deserialize, Serialize};

/// Identifier of a node in the dependency graph.
///
/// Ids are dense integers handed out monotonically and never reused, so a
/// stale id held by a work list can at worst point at an erased node, never
/// at a recycled one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Sentinel meaning "no dependency / orphaned".
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Sentinel used as the hub dependency of user-supplied base hubs.
    ///
    /// Never present in any table; base hubs parented to it can never be
    /// orphaned by a cleanup pass.
    pub const ROOT: NodeId = NodeId(u32::MAX - 1);

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::NONE => write!(f, "none"),
            Self::ROOT => write!(f, "root"),
            NodeId(n) => write!(f, "#{}", n),
        }
    }
}

/// Monotonic allocator for [`NodeId`]s.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id. Ids are never reused.
    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next);
        debug_assert!(self.next < u32::MAX - 1, "node id space exhausted");
        self.next += 1;
        id
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
