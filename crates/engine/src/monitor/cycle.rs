// SPDX-License-Identifier: MIT

//! One iteration of the update cycle.
//!
//! Step order matters: hubs are interpreted before the orphan-hub cleanup
//! so re-parses can reclaim what they just orphaned, and the orphan-pipe
//! cleanup runs after wildcard expansion so wildcard-spawned pipes get the
//! same chance.

use super::{MonitorShared, MonitorState, PATH_RETRY, PIPE_RETRY};
use crate::store::{push_unique, Store};
use crate::wrangler::Task;
use forge_core::{times_equal_eps, Clock, NodeId, TimePoint};

impl<C: Clock> MonitorShared<C> {
    pub(crate) fn run_cycle(&self, state: &mut MonitorState) {
        self.update_suspect_paths(state);
        self.update_suspect_wildcards(state);

        let had_activity = state.store.has_activity();

        self.update_dirty_hubs(state);
        self.cleanup_orphaned_hubs(state);
        self.update_dirty_pipe_wildcards(state);
        self.cleanup_orphaned_pipes(state);
        self.update_dirty_pipes(state);
        self.flush_outbox(state);
        self.drain_inbox(state);

        // Persist only once the graph has settled; a snapshot taken while
        // hubs or pipes are still converging would be discarded anyway.
        if state.save_pending && !had_activity && !state.store.has_activity() {
            self.save_persistent(state);
            state.save_pending = false;
        }
    }

    //  Suspect paths
    // --------------------

    fn update_suspect_paths(&self, state: &mut MonitorState) {
        let mut list = std::mem::take(&mut state.store.suspect_paths);
        list.extend(std::mem::take(&mut state.store.future_suspect_paths));
        for id in list {
            self.update_suspect_path(state, id);
        }
        // Debug-grade polling: every monitored path is re-checked next
        // cycle. Narrowing this would take platform watchers.
        state.store.suspect_paths = state.store.paths.keys().copied().collect();
    }

    fn update_suspect_path(&self, state: &mut MonitorState, id: NodeId) {
        let now = self.clock.now();
        let Some(node) = state.store.paths.get(&id) else { return };
        if now < node.timeout {
            push_unique(&mut state.store.future_suspect_paths, id);
            return;
        }
        let path = node.path.clone();
        let last_update = node.last_update;

        if !self.probe.exists(&path) {
            self.handle_path_missing(state, id, now);
            return;
        }

        match self.probe.last_write_time(&path) {
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "path probe failed");
                if let Some(node) = state.store.paths.get_mut(&id) {
                    node.timeout = now + PATH_RETRY;
                }
                push_unique(&mut state.store.future_suspect_paths, id);
            }
            Ok(write_time) => {
                if !times_equal_eps(write_time, last_update) {
                    tracing::debug!(path = %path.display(), "path changed");
                    state.store.make_users_of_path_dirty(id);
                    if let Some(node) = state.store.paths.get_mut(&id) {
                        node.last_update = write_time;
                    }
                }
            }
        }
    }

    /// A monitored path has vanished. Keep `last_update` so a reappearance
    /// with an unchanged write time fires no dirtying cascade; drop the
    /// node entirely once nothing references it.
    fn handle_path_missing(&self, state: &mut MonitorState, id: NodeId, now: TimePoint) {
        if !state.store.path_is_referenced(id) {
            if let Some(node) = state.store.paths.get(&id) {
                tracing::debug!(path = %node.path.display(), "unreferenced missing path dropped");
            }
            state.store.erase_path(id);
            return;
        }
        if let Some(node) = state.store.paths.get_mut(&id) {
            tracing::debug!(path = %node.path.display(), "path missing");
            node.timeout = now + PATH_RETRY;
        }
        push_unique(&mut state.store.future_suspect_paths, id);
    }

    //  Suspect wildcards
    // --------------------

    fn update_suspect_wildcards(&self, state: &mut MonitorState) {
        let mut list = std::mem::take(&mut state.store.suspect_wildcards);
        list.extend(std::mem::take(&mut state.store.future_suspect_wildcards));
        for id in list {
            self.update_suspect_wildcard(state, id);
        }
        state.store.suspect_wildcards = state.store.wildcards.keys().copied().collect();
    }

    fn update_suspect_wildcard(&self, state: &mut MonitorState, id: NodeId) {
        let changed = match state.store.wildcards.get_mut(&id) {
            Some(wildcard) => wildcard.watch.check(self.probe.as_ref()),
            None => return,
        };
        if changed {
            if let Some(wildcard) = state.store.wildcards.get(&id) {
                tracing::debug!(pattern = wildcard.watch.pattern().raw(), "wildcard set changed");
            }
            state.store.make_users_of_wildcard_dirty(id);
        }
    }

    //  Dirty hubs
    // --------------------

    fn update_dirty_hubs(&self, state: &mut MonitorState) {
        let future = std::mem::take(&mut state.store.future_dirty_hubs);
        for id in future {
            push_unique(&mut state.store.dirty_hubs, id);
        }
        let list = std::mem::take(&mut state.store.dirty_hubs);
        for id in list {
            self.update_dirty_hub(state, id);
        }
    }

    fn update_dirty_hub(&self, state: &mut MonitorState, id: NodeId) {
        let now = self.clock.now();
        let Some(hub) = state.store.hubs.get(&id) else { return };
        if hub.is_orphan() {
            push_unique(&mut state.store.orphaned_dirty_hubs, id);
            return;
        }
        if now < hub.timeout {
            push_unique(&mut state.store.future_dirty_hubs, id);
            return;
        }
        let path = hub.path.clone();
        let input_vars = hub.input_vars.clone();

        // Everything this hub declared is orphaned up front; the re-parse
        // below reclaims what is still declared.
        state.store.make_dependants_on_hub_orphan(id);

        let outcome = self
            .probe
            .read(&path)
            .map_err(super::HubInterpretError::from)
            .and_then(|bytes| Ok(forge_hub::parse_hub(&bytes)?))
            .and_then(|group| self.process_hub_group(state, id, &input_vars, &group));

        match outcome {
            Ok(()) => {
                tracing::info!(hub = %path.display(), "hub interpreted");
            }
            Err(e) => {
                tracing::warn!(hub = %path.display(), error = %e, "hub interpretation failed");
                let deps = match state.store.hubs.get_mut(&id) {
                    Some(hub) => {
                        hub.timeout = now + PATH_RETRY;
                        hub.path_deps.clone()
                    }
                    None => Vec::new(),
                };
                push_unique(&mut state.store.future_dirty_hubs, id);
                for dep in deps {
                    push_unique(&mut state.store.suspect_paths, dep);
                }
            }
        }
    }

    fn cleanup_orphaned_hubs(&self, state: &mut MonitorState) {
        let mut queue = std::mem::take(&mut state.store.potentially_orphaned_hubs);
        while let Some(id) = queue.pop() {
            let Some(hub) = state.store.hubs.get(&id) else { continue };
            if !hub.is_orphan() {
                continue; // re-adopted during this iteration
            }
            let path = hub.path.clone();
            state.store.make_dependants_on_hub_orphan(id);
            queue.append(&mut state.store.potentially_orphaned_hubs);
            state.store.erase_hub(id);
            tracing::info!(hub = %path.display(), "orphaned hub erased");
        }
    }

    //  Dirty pipe wildcards
    // --------------------

    fn update_dirty_pipe_wildcards(&self, state: &mut MonitorState) {
        let future = std::mem::take(&mut state.store.future_dirty_pipe_wildcards);
        for id in future {
            push_unique(&mut state.store.dirty_pipe_wildcards, id);
        }
        let list = std::mem::take(&mut state.store.dirty_pipe_wildcards);
        for id in list {
            self.update_dirty_pipe_wildcard(state, id);
        }
    }

    fn update_dirty_pipe_wildcard(&self, state: &mut MonitorState, id: NodeId) {
        let now = self.clock.now();
        let Some(pw) = state.store.pipe_wildcards.get(&id) else { return };
        if pw.hub_dep.is_none() {
            return;
        }
        let Some(wildcard) = state.store.wildcards.get(&pw.wildcard_dep) else { return };
        let pattern = wildcard.watch.pattern().clone();
        let template = pw.clone();

        let matches = pattern.enumerate(self.probe.as_ref());
        tracing::debug!(
            pattern = pattern.raw(),
            matches = matches.len(),
            "expanding pipe wildcard"
        );
        for matched in matches {
            match super::hub_interp::instantiate_wildcard_pipe(&template, id, &matched) {
                Ok(pipe) => {
                    state.store.find_or_add_pipe(pipe, now);
                }
                Err(e) => {
                    tracing::warn!(
                        pattern = pattern.raw(),
                        path = %matched.path.display(),
                        error = %e,
                        "wildcard pipe expansion failed"
                    );
                }
            }
        }
    }

    fn cleanup_orphaned_pipes(&self, state: &mut MonitorState) {
        let list = std::mem::take(&mut state.store.potentially_orphaned_pipes);
        for id in list {
            let Some(pipe) = state.store.pipes.get(&id) else { continue };
            if !pipe.is_orphan() {
                continue; // reclaimed by a re-parse or re-expansion
            }
            let description = format!("{} {}", pipe.tool, pipe.base_in.display());
            state.store.erase_pipe(id);
            tracing::info!(pipe = %description, "orphaned pipe erased");
        }
    }

    //  Dirty pipes
    // --------------------

    fn update_dirty_pipes(&self, state: &mut MonitorState) {
        let future = std::mem::take(&mut state.store.future_dirty_pipes);
        for id in future {
            push_unique(&mut state.store.dirty_pipes, id);
        }
        let list = std::mem::take(&mut state.store.dirty_pipes);
        let now = self.clock.now();
        for id in list {
            let Some(pipe) = state.store.pipes.get_mut(&id) else { continue };
            if pipe.is_orphan() {
                push_unique(&mut state.store.orphaned_dirty_pipes, id);
                continue;
            }
            if now < pipe.timeout {
                push_unique(&mut state.store.future_dirty_pipes, id);
                continue;
            }
            // Change signals are ignored while in flight; the dependency
            // set is rebuilt from the task result.
            pipe.path_deps.clear();
            push_unique(&mut state.store.outbox_pipes, id);
        }
    }

    //  Outbox / inbox
    // --------------------

    fn flush_outbox(&self, state: &mut MonitorState) {
        let ids = std::mem::take(&mut state.store.outbox_pipes);
        if ids.is_empty() {
            return;
        }
        let mut tasks = Vec::new();
        for id in ids {
            #[cfg(windows)]
            self.release_locked_output(state, id);

            let Some(pipe) = state.store.pipes.get(&id) else { continue };
            tasks.push(Task {
                id,
                tool: pipe.tool.clone(),
                file_in: pipe.base_in.clone(),
                file_out: pipe.base_out.clone(),
                settings: pipe.settings.clone(),
                callback: self.result_callback(),
            });
            push_unique(&mut state.store.pending_pipes, id);
        }
        tracing::info!(count = tasks.len(), "pipes submitted");
        self.wrangler.submit(tasks);
    }

    /// Windows holds a file lock on a running executable; if the declared
    /// output is an existing `.exe`, move it aside so the tool can write.
    #[cfg(windows)]
    fn release_locked_output(&self, state: &mut MonitorState, id: NodeId) {
        let Some(pipe) = state.store.pipes.get(&id) else { return };
        if pipe.base_out.extension().and_then(|e| e.to_str()) != Some("exe") {
            return;
        }
        if !self.probe.exists(&pipe.base_out) {
            return;
        }
        let Some(name) = pipe.base_out.file_name().and_then(|n| n.to_str()) else { return };
        let parked = state.persistent_dir.join(format!("{name}.~old"));
        if let Err(e) = self.probe.rename(&pipe.base_out, &parked) {
            tracing::warn!(
                output = %pipe.base_out.display(),
                error = %e,
                "could not move locked output aside"
            );
        }
    }

    fn drain_inbox(&self, state: &mut MonitorState) {
        let results = {
            let mut inbox = self.inbox.lock();
            std::mem::take(&mut *inbox)
        };
        for result in results {
            self.apply_task_result(state, result);
        }
    }

    fn apply_task_result(&self, state: &mut MonitorState, result: crate::wrangler::TaskResult) {
        let id = result.id;
        let now = self.clock.now();
        crate::store::remove_id(&mut state.store.pending_pipes, id);

        let Some(pipe) = state.store.pipes.get_mut(&id) else {
            // Erased while in flight; nothing to fold the result into.
            return;
        };

        if let Some(error) = result.error {
            tracing::warn!(
                tool = %pipe.tool,
                file_in = %pipe.base_in.display(),
                error = %error,
                "pipe failed; retrying later"
            );
            pipe.timeout = now + PIPE_RETRY;
            let deps = pipe.path_deps.clone();
            push_unique(&mut state.store.dirty_pipes, id);
            for dep in deps {
                push_unique(&mut state.store.suspect_paths, dep);
            }
            return;
        }

        let elapsed_ms = result.duration.as_millis() as u64;
        tracing::info!(
            tool = %pipe.tool,
            file_out = %pipe.base_out.display(),
            elapsed_ms,
            reads = result.read_files.len(),
            writes = result.written_files.len(),
            "pipe completed"
        );

        // Every file the tool read becomes a dependency. If the write time
        // the tool saw before reading is not the one we last observed, the
        // input moved under the build and the pipe runs again.
        let mut changed_mid_build = false;
        for read in &result.read_files {
            let path_id = Self::fold_read_dependency(
                &mut state.store,
                id,
                &read.path,
                read.previous_time,
                now,
            );
            let stored = state.store.paths.get(&path_id).map(|p| p.last_update);
            if let Some(stored) = stored {
                if !times_equal_eps(stored, read.previous_time) {
                    changed_mid_build = true;
                }
            }
        }
        if changed_mid_build {
            tracing::info!(pipe = %id, "input changed mid-build; re-dirtying");
            push_unique(&mut state.store.dirty_pipes, id);
        }
        state.save_pending = true;
    }

    fn fold_read_dependency(
        store: &mut Store,
        pipe_id: NodeId,
        path: &std::path::Path,
        previous_time: TimePoint,
        now: TimePoint,
    ) -> NodeId {
        let path_id = store.find_or_add_monitored_path(path, Some(previous_time), now);
        if let Some(pipe) = store.pipes.get_mut(&pipe_id) {
            push_unique(&mut pipe.path_deps, path_id);
        }
        path_id
    }
}
