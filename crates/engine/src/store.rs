// SPDX-License-Identifier: MIT

//! The typed multi-index behind the coordinator.
//!
//! One table per node kind, keyed by [`NodeId`], plus the work lists the
//! update cycle drains. All mutation happens on the coordinator thread under
//! its lock; the `find_or_add_*` operations implement structural interning
//! by linear scan; tables are small and the scan is off the hot path.

use crate::nodes::{Hub, MonitoredPath, MonitoredWildcard, Pipe, PipeWildcard};
use forge_core::id::IdAllocator;
use forge_core::{NodeId, TimePoint, EPOCH};
use forge_probe::{WildcardPattern, WildcardWatch};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Snapshot of what the monitor currently tracks, for the status surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedInfo {
    pub paths: Vec<PathBuf>,
    pub hubs: Vec<PathBuf>,
    pub wildcards: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    ids: IdAllocator,

    pub paths: BTreeMap<NodeId, MonitoredPath>,
    pub wildcards: BTreeMap<NodeId, MonitoredWildcard>,
    pub hubs: BTreeMap<NodeId, Hub>,
    pub pipe_wildcards: BTreeMap<NodeId, PipeWildcard>,
    pub pipes: BTreeMap<NodeId, Pipe>,

    pub suspect_paths: Vec<NodeId>,
    pub future_suspect_paths: Vec<NodeId>,
    pub suspect_wildcards: Vec<NodeId>,
    pub future_suspect_wildcards: Vec<NodeId>,

    pub dirty_hubs: Vec<NodeId>,
    pub future_dirty_hubs: Vec<NodeId>,
    pub potentially_orphaned_hubs: Vec<NodeId>,
    pub orphaned_dirty_hubs: Vec<NodeId>,

    pub dirty_pipe_wildcards: Vec<NodeId>,
    pub future_dirty_pipe_wildcards: Vec<NodeId>,

    pub dirty_pipes: Vec<NodeId>,
    pub future_dirty_pipes: Vec<NodeId>,
    pub potentially_orphaned_pipes: Vec<NodeId>,
    pub orphaned_dirty_pipes: Vec<NodeId>,
    pub outbox_pipes: Vec<NodeId>,
    pub pending_pipes: Vec<NodeId>,
}

pub(crate) fn push_unique(list: &mut Vec<NodeId>, id: NodeId) {
    if !list.contains(&id) {
        list.push(id);
    }
}

pub(crate) fn remove_id(list: &mut Vec<NodeId>, id: NodeId) -> bool {
    match list.iter().position(|&x| x == id) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    //  Interning
    // --------------------

    /// Find the monitored path for `path`, or insert one observing from
    /// `prev_time` (or never) and flag it for probing.
    pub fn find_or_add_monitored_path(
        &mut self,
        path: &Path,
        prev_time: Option<TimePoint>,
        now: TimePoint,
    ) -> NodeId {
        if let Some((&id, _)) = self.paths.iter().find(|(_, p)| p.path == path) {
            return id;
        }
        let id = self.ids.allocate();
        self.paths.insert(
            id,
            MonitoredPath::new(path.to_path_buf(), prev_time.unwrap_or(EPOCH), now),
        );
        push_unique(&mut self.suspect_paths, id);
        id
    }

    /// Find the monitored wildcard for the pattern, or insert a fresh watch
    /// and flag it for checking.
    pub fn find_or_add_monitored_wildcard(&mut self, pattern: WildcardPattern) -> NodeId {
        if let Some((&id, _)) = self
            .wildcards
            .iter()
            .find(|(_, w)| w.watch.pattern().raw() == pattern.raw())
        {
            return id;
        }
        let id = self.ids.allocate();
        self.wildcards.insert(id, MonitoredWildcard { watch: WildcardWatch::new(pattern) });
        push_unique(&mut self.suspect_wildcards, id);
        id
    }

    /// Intern a hub. A structural hit with a parented candidate adopts an
    /// orphaned survivor, migrating it off the orphaned-dirty list.
    pub fn find_or_add_hub(&mut self, hub: Hub, now: TimePoint) -> NodeId {
        let hit = self
            .hubs
            .iter()
            .find(|(_, h)| h.equals_abstractly(&hub))
            .map(|(&id, _)| id);
        if let Some(id) = hit {
            if !hub.hub_dep.is_none() {
                if let Some(existing) = self.hubs.get_mut(&id) {
                    if existing.hub_dep.is_none() {
                        existing.hub_dep = hub.hub_dep;
                        if remove_id(&mut self.orphaned_dirty_hubs, id) {
                            push_unique(&mut self.dirty_hubs, id);
                        }
                    }
                }
            }
            return id;
        }
        let id = self.ids.allocate();
        let path = hub.path.clone();
        self.hubs.insert(id, Hub { timeout: now, ..hub });
        let path_dep = self.find_or_add_monitored_path(&path, None, now);
        if let Some(inserted) = self.hubs.get_mut(&id) {
            inserted.path_deps = vec![path_dep];
        }
        push_unique(&mut self.future_dirty_hubs, id);
        id
    }

    /// Intern a pipe. A structural hit with a parented candidate adopts an
    /// orphan: it is re-parented, its snapshot provenance cleared, and it
    /// migrates from the orphaned-dirty list to the dirty list. This is
    /// what keeps reloaded pipes from rebuilding when nothing changed.
    pub fn find_or_add_pipe(&mut self, pipe: Pipe, _now: TimePoint) -> NodeId {
        let hit = self
            .pipes
            .iter()
            .find(|(_, p)| p.equals_abstractly(&pipe))
            .map(|(&id, _)| id);
        if let Some(id) = hit {
            if !pipe.hub_dep.is_none() {
                if let Some(existing) = self.pipes.get_mut(&id) {
                    if existing.hub_dep.is_none() {
                        existing.hub_dep = pipe.hub_dep;
                        existing.wildcard_dep = pipe.wildcard_dep;
                        existing.from_snapshot = false;
                        if remove_id(&mut self.orphaned_dirty_pipes, id) {
                            push_unique(&mut self.dirty_pipes, id);
                        }
                    }
                }
            }
            return id;
        }
        let id = self.ids.allocate();
        let schedule = !pipe.hub_dep.is_none();
        self.pipes.insert(id, pipe);
        if schedule {
            push_unique(&mut self.future_dirty_pipes, id);
        }
        id
    }

    /// Intern a pipe wildcard. Re-parenting is elided; wildcards are cheap
    /// to recompute, so orphans are erased and re-inserted instead.
    pub fn find_or_add_pipe_wildcard(&mut self, pw: PipeWildcard) -> NodeId {
        if let Some((&id, _)) =
            self.pipe_wildcards.iter().find(|(_, p)| p.equals_abstractly(&pw))
        {
            return id;
        }
        let id = self.ids.allocate();
        self.pipe_wildcards.insert(id, pw);
        push_unique(&mut self.future_dirty_pipe_wildcards, id);
        id
    }

    //  Dirtying
    // --------------------

    /// Queue a hub for re-interpretation unless it is already scheduled.
    pub fn mark_hub_dirty(&mut self, id: NodeId) {
        if self.dirty_hubs.contains(&id)
            || self.future_dirty_hubs.contains(&id)
            || self.orphaned_dirty_hubs.contains(&id)
        {
            return;
        }
        self.future_dirty_hubs.push(id);
    }

    /// Queue a pipe for re-execution unless it is already in flight or
    /// scheduled. Pipes in the outbox or pending set ignore change signals;
    /// a change during flight re-dirties them when the result returns.
    pub fn mark_pipe_dirty(&mut self, id: NodeId) {
        if self.dirty_pipes.contains(&id)
            || self.future_dirty_pipes.contains(&id)
            || self.orphaned_dirty_pipes.contains(&id)
            || self.outbox_pipes.contains(&id)
            || self.pending_pipes.contains(&id)
        {
            return;
        }
        self.future_dirty_pipes.push(id);
    }

    /// Dirty every hub and pipe listing this path as a dependency.
    pub fn make_users_of_path_dirty(&mut self, path_id: NodeId) {
        let hub_users: Vec<NodeId> = self
            .hubs
            .iter()
            .filter(|(_, h)| h.path_deps.contains(&path_id))
            .map(|(&id, _)| id)
            .collect();
        let pipe_users: Vec<NodeId> = self
            .pipes
            .iter()
            .filter(|(_, p)| p.path_deps.contains(&path_id))
            .map(|(&id, _)| id)
            .collect();
        for id in hub_users {
            self.mark_hub_dirty(id);
        }
        for id in pipe_users {
            self.mark_pipe_dirty(id);
        }
    }

    /// Dirty every pipe wildcard whose enumeration source is this wildcard.
    pub fn make_users_of_wildcard_dirty(&mut self, wildcard_id: NodeId) {
        let users: Vec<NodeId> = self
            .pipe_wildcards
            .iter()
            .filter(|(_, pw)| pw.wildcard_dep == wildcard_id)
            .map(|(&id, _)| id)
            .collect();
        for id in users {
            push_unique(&mut self.future_dirty_pipe_wildcards, id);
        }
    }

    //  Orphaning
    // --------------------

    /// Orphan everything parented to this hub, staging it for reclaim by
    /// the hub's re-interpretation or for erasure by the cleanup passes.
    /// Pipe wildcards are erased outright; their pipes lose the wildcard
    /// reference but stay, reclaimable by the re-expansion.
    pub fn make_dependants_on_hub_orphan(&mut self, hub_id: NodeId) {
        let child_hubs: Vec<NodeId> = self
            .hubs
            .iter()
            .filter(|(_, h)| h.hub_dep == hub_id)
            .map(|(&id, _)| id)
            .collect();
        for id in child_hubs {
            if let Some(hub) = self.hubs.get_mut(&id) {
                hub.hub_dep = NodeId::NONE;
            }
            push_unique(&mut self.potentially_orphaned_hubs, id);
        }

        let child_pipes: Vec<NodeId> = self
            .pipes
            .iter()
            .filter(|(_, p)| p.hub_dep == hub_id)
            .map(|(&id, _)| id)
            .collect();
        for id in child_pipes {
            if let Some(pipe) = self.pipes.get_mut(&id) {
                pipe.hub_dep = NodeId::NONE;
            }
            push_unique(&mut self.potentially_orphaned_pipes, id);
        }

        let child_pws: Vec<NodeId> = self
            .pipe_wildcards
            .iter()
            .filter(|(_, pw)| pw.hub_dep == hub_id)
            .map(|(&id, _)| id)
            .collect();
        for id in child_pws {
            self.erase_pipe_wildcard(id);
        }
    }

    /// Detach pipes spawned by this wildcard. Identity is unaffected, so a
    /// re-expansion will find and re-adopt them.
    pub fn make_dependants_on_pipe_wildcard_orphan(&mut self, pw_id: NodeId) {
        for pipe in self.pipes.values_mut() {
            if pipe.wildcard_dep == pw_id {
                pipe.wildcard_dep = NodeId::NONE;
            }
        }
    }

    //  Erasure
    // --------------------

    pub fn erase_hub(&mut self, id: NodeId) {
        self.hubs.remove(&id);
        for list in [
            &mut self.dirty_hubs,
            &mut self.future_dirty_hubs,
            &mut self.potentially_orphaned_hubs,
            &mut self.orphaned_dirty_hubs,
        ] {
            remove_id(list, id);
        }
    }

    pub fn erase_pipe(&mut self, id: NodeId) {
        self.pipes.remove(&id);
        for list in [
            &mut self.dirty_pipes,
            &mut self.future_dirty_pipes,
            &mut self.potentially_orphaned_pipes,
            &mut self.orphaned_dirty_pipes,
            &mut self.outbox_pipes,
            &mut self.pending_pipes,
        ] {
            remove_id(list, id);
        }
    }

    pub fn erase_pipe_wildcard(&mut self, id: NodeId) {
        if self.pipe_wildcards.remove(&id).is_some() {
            self.make_dependants_on_pipe_wildcard_orphan(id);
        }
        for list in [&mut self.dirty_pipe_wildcards, &mut self.future_dirty_pipe_wildcards] {
            remove_id(list, id);
        }
    }

    pub fn erase_path(&mut self, id: NodeId) {
        self.paths.remove(&id);
        for list in [&mut self.suspect_paths, &mut self.future_suspect_paths] {
            remove_id(list, id);
        }
    }

    /// Does any hub or pipe still list this path as a dependency?
    pub fn path_is_referenced(&self, path_id: NodeId) -> bool {
        self.hubs.values().any(|h| h.path_deps.contains(&path_id))
            || self.pipes.values().any(|p| p.path_deps.contains(&path_id))
    }

    //  Queries
    // --------------------

    pub fn tracked_info(&self) -> TrackedInfo {
        let mut info = TrackedInfo {
            paths: self.paths.values().map(|p| p.path.clone()).collect(),
            hubs: self.hubs.values().map(|h| h.path.clone()).collect(),
            wildcards: self
                .wildcards
                .values()
                .map(|w| w.watch.pattern().raw().to_string())
                .collect(),
        };
        info.paths.sort();
        info.hubs.sort();
        info.hubs.dedup();
        info.wildcards.sort();
        info
    }

    /// Is there hub or pipe work anywhere in the cycle?
    pub fn has_activity(&self) -> bool {
        !self.dirty_hubs.is_empty()
            || !self.future_dirty_hubs.is_empty()
            || !self.dirty_pipes.is_empty()
            || !self.future_dirty_pipes.is_empty()
    }

    /// Check the structural invariants the update cycle must preserve.
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let dep_ok = |id: NodeId, table: &dyn Fn(NodeId) -> bool| {
            id.is_none() || id.is_root() || table(id)
        };

        for (id, hub) in &self.hubs {
            if !dep_ok(hub.hub_dep, &|d| self.hubs.contains_key(&d)) {
                return Err(format!("hub {} has dangling hub_dep {}", id, hub.hub_dep));
            }
            for &dep in &hub.path_deps {
                if !self.paths.contains_key(&dep) {
                    return Err(format!("hub {} has dangling path_dep {}", id, dep));
                }
            }
        }
        for (id, pipe) in &self.pipes {
            if !dep_ok(pipe.hub_dep, &|d| self.hubs.contains_key(&d)) {
                return Err(format!("pipe {} has dangling hub_dep {}", id, pipe.hub_dep));
            }
            if !dep_ok(pipe.wildcard_dep, &|d| self.pipe_wildcards.contains_key(&d)) {
                return Err(format!("pipe {} has dangling wildcard_dep {}", id, pipe.wildcard_dep));
            }
            for &dep in &pipe.path_deps {
                if !self.paths.contains_key(&dep) {
                    return Err(format!("pipe {} has dangling path_dep {}", id, dep));
                }
            }
        }
        for (id, pw) in &self.pipe_wildcards {
            if !dep_ok(pw.hub_dep, &|d| self.hubs.contains_key(&d)) {
                return Err(format!("pipe wildcard {} has dangling hub_dep {}", id, pw.hub_dep));
            }
            if !dep_ok(pw.wildcard_dep, &|d| self.wildcards.contains_key(&d)) {
                return Err(format!(
                    "pipe wildcard {} has dangling wildcard_dep {}",
                    id, pw.wildcard_dep
                ));
            }
        }

        // Scheduling lists are pairwise disjoint.
        let lists: [(&str, &Vec<NodeId>); 5] = [
            ("dirty", &self.dirty_pipes),
            ("future_dirty", &self.future_dirty_pipes),
            ("orphaned_dirty", &self.orphaned_dirty_pipes),
            ("outbox", &self.outbox_pipes),
            ("pending", &self.pending_pipes),
        ];
        for (i, (name_a, list_a)) in lists.iter().enumerate() {
            for (name_b, list_b) in lists.iter().skip(i + 1) {
                if let Some(id) = list_a.iter().find(|id| list_b.contains(id)) {
                    return Err(format!("pipe {} is in both {} and {}", id, name_a, name_b));
                }
            }
        }

        // In-flight pipes hold no path dependencies.
        for id in self.outbox_pipes.iter().chain(&self.pending_pipes) {
            if let Some(pipe) = self.pipes.get(id) {
                if !pipe.path_deps.is_empty() {
                    return Err(format!("in-flight pipe {} still has path_deps", id));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
