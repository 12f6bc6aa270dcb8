// SPDX-License-Identifier: MIT

//! The change monitor: a single coordinator thread owning the graph.
//!
//! The loop polls monitored files, interprets dirty hubs, expands wildcard
//! pipes, ships ready pipes to the wrangler and folds results back in. One
//! mutex guards the whole store; it is held for the body of each iteration
//! and released over the sleep. Workers never take it; they post results
//! into a separate inbox.

mod cycle;
mod hub_interp;
mod persist;

pub use hub_interp::HubInterpretError;

use crate::store::{Store, TrackedInfo};
use crate::wrangler::{PipeWrangler, TaskCallback, TaskResult};
use forge_core::{Clock, NodeId, SystemClock, Variables};
use forge_probe::{canonical, FileProbe};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

/// How long the coordinator sleeps between polls.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Retry delay for paths and hubs that failed to probe or parse.
pub(crate) const PATH_RETRY: Duration = Duration::from_secs(1);

/// Retry delay for pipes whose tool reported an error.
pub(crate) const PIPE_RETRY: Duration = Duration::from_secs(4);

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("the monitor is running; stop processing first")]
    Running,
    #[error("the monitor is already running")]
    AlreadyRunning,
    #[error("failed to spawn the monitor thread: {0}")]
    Spawn(std::io::Error),
}

/// Run state, used both as the observed and the requested state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum RunState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
}

impl RunState {
    fn from_u8(v: u8) -> RunState {
        match v {
            2 => RunState::Running,
            1 => RunState::Starting,
            _ => RunState::Stopped,
        }
    }
}

/// Everything behind the coordinator's lock.
pub(crate) struct MonitorState {
    pub(crate) store: Store,
    pub(crate) reference_dir: PathBuf,
    pub(crate) persistent_dir: PathBuf,
    pub(crate) save_pending: bool,
}

pub(crate) struct MonitorShared<C: Clock> {
    pub(crate) state: Mutex<MonitorState>,
    pub(crate) inbox: Arc<Mutex<Vec<TaskResult>>>,
    pub(crate) probe: Arc<dyn FileProbe>,
    pub(crate) wrangler: Arc<PipeWrangler>,
    pub(crate) clock: C,
    current: AtomicU8,
    target: AtomicU8,
}

/// The coordinator. All methods take `&self`; the daemon shares one
/// instance between its listener and status surfaces.
pub struct ChangeMonitor<C: Clock = SystemClock> {
    shared: Arc<MonitorShared<C>>,
    update_thread: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeMonitor<SystemClock> {
    pub fn new(probe: Arc<dyn FileProbe>, wrangler: Arc<PipeWrangler>) -> Self {
        Self::with_clock(probe, wrangler, SystemClock)
    }
}

impl<C: Clock> ChangeMonitor<C> {
    pub fn with_clock(probe: Arc<dyn FileProbe>, wrangler: Arc<PipeWrangler>, clock: C) -> Self {
        Self {
            shared: Arc::new(MonitorShared {
                state: Mutex::new(MonitorState {
                    store: Store::new(),
                    reference_dir: PathBuf::from("."),
                    persistent_dir: PathBuf::from("."),
                    save_pending: false,
                }),
                inbox: Arc::new(Mutex::new(Vec::new())),
                probe,
                wrangler,
                clock,
                current: AtomicU8::new(RunState::Stopped as u8),
                target: AtomicU8::new(RunState::Stopped as u8),
            }),
            update_thread: Mutex::new(None),
        }
    }

    //  Control
    // --------------------

    /// Load persisted state and start the update thread.
    pub fn begin(&self) -> Result<(), MonitorError> {
        if self.shared.current_state() != RunState::Stopped {
            return Err(MonitorError::AlreadyRunning);
        }
        self.shared.target.store(RunState::Running as u8, Ordering::SeqCst);
        self.shared.current.store(RunState::Starting as u8, Ordering::SeqCst);

        {
            let mut state = self.shared.state.lock();
            self.shared.load_persistent(&mut state);
        }

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("change-monitor".to_string())
            .spawn(move || {
                tracing::info!("change monitor thread starting");
                shared.current.store(RunState::Running as u8, Ordering::SeqCst);
                shared.update_cycle();
                shared.current.store(RunState::Stopped as u8, Ordering::SeqCst);
                tracing::info!("change monitor thread ended");
            })
            .map_err(|e| {
                self.shared.target.store(RunState::Stopped as u8, Ordering::SeqCst);
                self.shared.current.store(RunState::Stopped as u8, Ordering::SeqCst);
                MonitorError::Spawn(e)
            })?;
        *self.update_thread.lock() = Some(handle);
        Ok(())
    }

    /// Ask the loop to stop and wait for it. In-flight pipe results are
    /// still consumed on the final iteration; a pending save is flushed.
    pub fn end_and_wait(&self) {
        self.shared.target.store(RunState::Stopped as u8, Ordering::SeqCst);
        let handle = self.update_thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("change monitor thread panicked");
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.current_state() == RunState::Stopped
    }

    //  Configuration
    // --------------------

    /// Point persistence somewhere else. Only valid while stopped.
    pub fn set_persistent_directory(&self, dir: &Path) -> Result<(), MonitorError> {
        if !self.is_stopped() {
            return Err(MonitorError::Running);
        }
        self.shared.state.lock().persistent_dir = dir.to_path_buf();
        Ok(())
    }

    /// Re-anchor relative hub paths. Only valid while stopped.
    pub fn set_reference_directory(&self, dir: &Path) -> Result<(), MonitorError> {
        if !self.is_stopped() {
            return Err(MonitorError::Running);
        }
        self.shared.state.lock().reference_dir = dir.to_path_buf();
        Ok(())
    }

    /// Add a root hub. Relative paths resolve against the reference
    /// directory; the hub's `cur-dir` is its parent directory. Root hubs
    /// are parented to the root sentinel and can never be orphaned.
    pub fn add_base_hub_file(&self, path: &Path) {
        let mut state = self.shared.state.lock();
        let full = if path.is_absolute() {
            canonical(path)
        } else {
            canonical(&state.reference_dir.join(path))
        };
        let parent = full.parent().map(Path::to_path_buf).unwrap_or_default();
        let vars = Variables::with_cur_dir(&parent);
        let now = self.shared.clock.now();
        let id = state
            .store
            .find_or_add_hub(crate::nodes::Hub::new(NodeId::ROOT, full.clone(), vars), now);
        tracing::info!(hub = %full.display(), id = %id, "base hub added");
    }

    //  Queries
    // --------------------

    /// Snapshot of tracked paths, hubs and wildcards for the status page.
    pub fn tracked_information(&self) -> TrackedInfo {
        self.shared.state.lock().store.tracked_info()
    }

    //  Test support
    // --------------------

    /// Run exactly one update cycle on the calling thread.
    #[cfg(test)]
    pub(crate) fn cycle_once(&self) {
        let mut state = self.shared.state.lock();
        self.shared.run_cycle(&mut state);
    }

    #[cfg(test)]
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut MonitorState) -> R) -> R {
        f(&mut self.shared.state.lock())
    }

    /// Load persisted state without starting the loop thread.
    #[cfg(test)]
    pub(crate) fn load_persistent_now(&self) {
        let mut state = self.shared.state.lock();
        self.shared.load_persistent(&mut state);
    }
}

impl<C: Clock> Drop for ChangeMonitor<C> {
    fn drop(&mut self) {
        if !self.is_stopped() {
            tracing::warn!("change monitor dropped while running; stopping");
            self.end_and_wait();
        }
    }
}

impl<C: Clock> MonitorShared<C> {
    fn current_state(&self) -> RunState {
        RunState::from_u8(self.current.load(Ordering::SeqCst))
    }

    pub(crate) fn should_run(&self) -> bool {
        RunState::from_u8(self.target.load(Ordering::SeqCst)) == RunState::Running
    }

    /// The loop: lock, run one cycle, then sleep with the lock released.
    /// The first cycle runs as soon as the thread starts, so freshly added
    /// hubs are interpreted without waiting out a poll interval. A pending
    /// save is flushed on exit.
    fn update_cycle(&self) {
        loop {
            {
                let mut state = self.state.lock();
                self.run_cycle(&mut state);
            }
            if !self.should_run() {
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        let mut state = self.state.lock();
        if state.save_pending {
            self.save_persistent(&mut state);
            state.save_pending = false;
        }
    }

    /// Callback handed to the wrangler: workers append into the inbox,
    /// touching no other monitor state.
    pub(crate) fn result_callback(&self) -> TaskCallback {
        let inbox = Arc::clone(&self.inbox);
        Arc::new(move |result| inbox.lock().push(result))
    }
}

#[cfg(test)]
#[path = "../monitor_tests/mod.rs"]
mod tests;
