// SPDX-License-Identifier: MIT

//! Hub group interpretation: the reducer that turns a parsed hub document
//! into graph nodes.

use super::{MonitorShared, MonitorState};
use crate::nodes::{Hub, Pipe, PipeWildcard};
use forge_core::{Clock, NodeId, Variables, CUR_DIR};
use forge_hub::{adapt, process, process_json, HubError, HubGroup, InterpError};
use forge_probe::wildcard::{substitute, WildcardMatch};
use forge_probe::{canonical, contains_wildcards, FsError, PatternError, WildcardPattern};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use thiserror::Error;

/// Anything that makes one hub's interpretation fail. Never fatal to the
/// coordinator: the hub is timed out and retried.
#[derive(Debug, Error)]
pub enum HubInterpretError {
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error(transparent)]
    Doc(#[from] HubError),
    #[error(transparent)]
    Interp(#[from] InterpError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("wildcards in hub paths are unsupported: {0}")]
    WildcardHubPath(String),
    #[error("hub references itself: {}", .0.display())]
    HubCycle(PathBuf),
}

impl<C: Clock> MonitorShared<C> {
    /// Fold one hub group into the graph. `vars` is the environment the
    /// group is interpreted under; each nesting level adapts a local copy.
    pub(crate) fn process_hub_group(
        &self,
        state: &mut MonitorState,
        hub_id: NodeId,
        vars: &Variables,
        group: &HubGroup,
    ) -> Result<(), HubInterpretError> {
        let mut vars = vars.clone();
        if let Some(defs) = &group.vars {
            adapt(&mut vars, defs)?;
        }

        for sub in &group.groups {
            self.process_hub_group(state, hub_id, &vars, sub)?;
        }

        for hub_ref in &group.hubs {
            let mut child_vars = vars.clone();
            if let Some(defs) = &hub_ref.vars {
                adapt(&mut child_vars, defs)?;
            }

            let candidate =
                format!("{}{}{}", child_vars.cur_dir(), MAIN_SEPARATOR, hub_ref.path);
            let path_text = process(&candidate, &child_vars)?;
            if contains_wildcards(&path_text) {
                return Err(HubInterpretError::WildcardHubPath(path_text));
            }
            let path = canonical(Path::new(&path_text));

            if hub_chain_contains(&state.store, hub_id, &path) {
                return Err(HubInterpretError::HubCycle(path));
            }

            let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
            child_vars.set(CUR_DIR, parent.to_string_lossy());

            state
                .store
                .find_or_add_hub(Hub::new(hub_id, path, child_vars), self.clock.now());
        }

        for spec in &group.pipes {
            let mut pipe_vars = vars.clone();
            if let Some(defs) = &spec.vars {
                adapt(&mut pipe_vars, defs)?;
            }

            for pair in &spec.paths {
                let in_text = process(&pair.input, &pipe_vars)?;
                if contains_wildcards(&in_text) {
                    // Settings and the output template stay untransformed;
                    // the per-match expansion interpolates a copy with the
                    // capture bindings in scope.
                    let pattern = WildcardPattern::parse(&in_text)?;
                    let wildcard_dep = state.store.find_or_add_monitored_wildcard(pattern);
                    state.store.find_or_add_pipe_wildcard(PipeWildcard {
                        hub_dep: hub_id,
                        wildcard_dep,
                        tool: spec.tool.clone(),
                        base_in: in_text,
                        base_out: pair.output.clone(),
                        input_vars: pipe_vars.clone(),
                        settings: spec.settings.clone(),
                    });
                } else {
                    let out_text = process(&pair.output, &pipe_vars)?;
                    let mut settings = spec.settings.clone();
                    process_json(&mut settings, &pipe_vars)?;
                    state.store.find_or_add_pipe(
                        Pipe::new(
                            hub_id,
                            NodeId::NONE,
                            spec.tool.clone(),
                            canonical(Path::new(&in_text)),
                            canonical(Path::new(&out_text)),
                            settings,
                        ),
                        self.clock.now(),
                    );
                }
            }
        }

        Ok(())
    }
}

/// Does `path` appear anywhere on the ancestor chain of `start`, the hub
/// itself included? This is the visited set of the recursive expansion:
/// a hub group registering any of its ancestors would loop the graph
/// (directly for `a -> a`, mutually for `a -> b -> a`), so that branch
/// fails with [`HubInterpretError::HubCycle`] instead.
fn hub_chain_contains(store: &crate::store::Store, start: NodeId, path: &Path) -> bool {
    let mut seen: Vec<NodeId> = Vec::new();
    let mut current = start;
    while let Some(hub) = store.hubs.get(&current) {
        if hub.path == path {
            return true;
        }
        if seen.contains(&current) {
            break;
        }
        seen.push(current);
        current = hub.hub_dep;
    }
    false
}

/// Turn one wildcard match into a concrete pipe: capture bindings fill the
/// output template and join the variable environment for settings.
pub(crate) fn instantiate_wildcard_pipe(
    template: &PipeWildcard,
    pw_id: NodeId,
    matched: &WildcardMatch,
) -> Result<Pipe, HubInterpretError> {
    let mut vars = template.input_vars.clone();
    for (name, value) in &matched.bindings {
        vars.set(name.clone(), value.clone());
    }

    let out_text = substitute(&template.base_out, &matched.bindings)?;
    let out_text = process(&out_text, &vars)?;

    let mut settings = template.settings.clone();
    process_json(&mut settings, &vars)?;

    Ok(Pipe::new(
        template.hub_dep,
        pw_id,
        template.tool.clone(),
        canonical(&matched.path),
        canonical(Path::new(&out_text)),
        settings,
    ))
}
