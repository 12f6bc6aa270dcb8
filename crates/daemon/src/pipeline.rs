// SPDX-License-Identifier: MIT

//! The pipeline host object: registry + wrangler + monitor, and the
//! request dispatch that drives them.

use crate::config::Config;
use forge_engine::{register_builtins, ChangeMonitor, PipeWrangler, ToolRegistry};
use forge_probe::{FileProbe, SystemProbe};
use forge_wire::{HubEntry, PathEntry, Request, Response, TrackedInfo, WildcardEntry};
use std::path::Path;
use std::sync::Arc;

/// Owns the engine pieces for the lifetime of the daemon.
pub struct Pipeline {
    registry: Arc<ToolRegistry>,
    wrangler: Arc<PipeWrangler>,
    monitor: ChangeMonitor,
}

impl Pipeline {
    /// Assemble the engine: built-in tools, a started worker pool, and a
    /// monitor pointed at the configured directories.
    pub fn new(config: &Config) -> Self {
        let registry = Arc::new(ToolRegistry::new());
        register_builtins(&registry);

        let probe: Arc<dyn FileProbe> = Arc::new(SystemProbe::new());
        let wrangler = Arc::new(PipeWrangler::new(Arc::clone(&registry), Arc::clone(&probe)));
        wrangler.start(config.max_workers);

        let monitor = ChangeMonitor::new(probe, Arc::clone(&wrangler));
        if let Err(e) = monitor.set_persistent_directory(&config.persistent_dir) {
            tracing::error!(error = %e, "could not apply persistent directory");
        }
        if let Err(e) = monitor.set_reference_directory(&config.reference_dir) {
            tracing::error!(error = %e, "could not apply reference directory");
        }

        Self { registry, wrangler, monitor }
    }

    /// Dispatch one request. Never panics; failures come back as
    /// [`Response::Error`].
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,
            Request::StartProcessing => match self.monitor.begin() {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error { message: e.to_string() },
            },
            Request::StopProcessing => {
                self.monitor.end_and_wait();
                Response::Ok
            }
            Request::AddBaseHubFile { path } => {
                self.monitor.add_base_hub_file(Path::new(&path));
                Response::Ok
            }
            Request::SetReferenceDirectory { path } => {
                match self.monitor.set_reference_directory(Path::new(&path)) {
                    Ok(()) => Response::Ok,
                    Err(e) => Response::Error { message: e.to_string() },
                }
            }
            Request::SetPersistentDirectory { path } => {
                match self.monitor.set_persistent_directory(Path::new(&path)) {
                    Ok(()) => Response::Ok,
                    Err(e) => Response::Error { message: e.to_string() },
                }
            }
            Request::Status => Response::Status { info: self.tracked_info() },
            Request::Shutdown => Response::ShuttingDown,
        }
    }

    /// Snapshot of tool names and tracked graph entries, taken under the
    /// monitor's lock.
    pub fn tracked_info(&self) -> TrackedInfo {
        let tracked = self.monitor.tracked_information();
        TrackedInfo {
            tools: self.registry.names(),
            paths: tracked
                .paths
                .into_iter()
                .map(|p| PathEntry { path: p.to_string_lossy().into_owned() })
                .collect(),
            hubs: tracked
                .hubs
                .into_iter()
                .map(|p| HubEntry { path: p.to_string_lossy().into_owned() })
                .collect(),
            wildcards: tracked
                .wildcards
                .into_iter()
                .map(|path| WildcardEntry { path })
                .collect(),
        }
    }

    /// Stop in dependency order: the monitor first (it submits work), the
    /// pool second.
    pub fn shutdown(&self) {
        self.monitor.end_and_wait();
        self.wrangler.stop_and_wait();
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
