// SPDX-License-Identifier: MIT

//! Persistence: folding the snapshot into the store on begin, and writing
//! the stable subset back out once the graph settles.

use super::{MonitorShared, MonitorState};
use crate::nodes::Pipe;
use forge_core::{millis_to_time, time_to_millis, Clock, NodeId};
use forge_storage::{PathRecord, PersistentState, PipeRecord};
use std::path::{Path, PathBuf};

impl<C: Clock> MonitorShared<C> {
    /// Restore monitored paths and settled pipes from the snapshot.
    ///
    /// Restored pipes start orphaned and idle. When their hubs are
    /// re-interpreted, the structural hit in `find_or_add_pipe` reclaims
    /// them with their dependency sets intact; nothing rebuilds unless an
    /// input actually changed.
    pub(crate) fn load_persistent(&self, state: &mut MonitorState) {
        let snapshot = match forge_storage::load(&state.persistent_dir) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(
                    dir = %state.persistent_dir.display(),
                    error = %e,
                    "could not load persisted state; starting cold"
                );
                return;
            }
        };
        let now = self.clock.now();

        for record in &snapshot.paths {
            state.store.find_or_add_monitored_path(
                Path::new(&record.path),
                Some(millis_to_time(record.changed)),
                now,
            );
        }

        for record in &snapshot.pipes {
            let path_deps: Vec<NodeId> = record
                .paths
                .iter()
                .map(|p| state.store.find_or_add_monitored_path(Path::new(p), None, now))
                .collect();
            let mut pipe = Pipe::new(
                NodeId::NONE,
                NodeId::NONE,
                record.tool.clone(),
                PathBuf::from(&record.path_in),
                PathBuf::from(&record.path_out),
                record.settings.clone(),
            );
            pipe.from_snapshot = true;
            pipe.path_deps = path_deps;
            state.store.find_or_add_pipe(pipe, now);
        }

        tracing::info!(
            paths = snapshot.paths.len(),
            pipes = snapshot.pipes.len(),
            "persisted state restored"
        );
    }

    /// Write the stable subset of the graph. Pipes that are orphaned,
    /// dirty or in flight are inherently transient and skipped.
    pub(crate) fn save_persistent(&self, state: &mut MonitorState) {
        let store = &state.store;
        let mut snapshot = PersistentState::default();

        for path in store.paths.values() {
            snapshot.paths.push(PathRecord {
                path: path.path.to_string_lossy().into_owned(),
                changed: time_to_millis(path.last_update),
            });
        }

        for (&id, pipe) in &store.pipes {
            if pipe.is_orphan() {
                continue;
            }
            let transient = store.dirty_pipes.contains(&id)
                || store.future_dirty_pipes.contains(&id)
                || store.orphaned_dirty_pipes.contains(&id)
                || store.outbox_pipes.contains(&id)
                || store.pending_pipes.contains(&id);
            if transient {
                continue;
            }
            snapshot.pipes.push(PipeRecord {
                tool: pipe.tool.clone(),
                path_in: pipe.base_in.to_string_lossy().into_owned(),
                path_out: pipe.base_out.to_string_lossy().into_owned(),
                settings: pipe.settings.clone(),
                paths: pipe
                    .path_deps
                    .iter()
                    .filter_map(|dep| store.paths.get(dep))
                    .map(|p| p.path.to_string_lossy().into_owned())
                    .collect(),
            });
        }

        if let Err(e) = forge_storage::save(&state.persistent_dir, &snapshot) {
            tracing::warn!(
                dir = %state.persistent_dir.display(),
                error = %e,
                "could not save state"
            );
        }
    }
}
