// SPDX-License-Identifier: MIT

//! Deterministic monitor tests: cycles are stepped by hand on a fake
//! clock, with a real filesystem and a real worker pool underneath.

mod hubs;
mod persistence;
mod pipes;
mod polling;
mod wildcards;

use crate::monitor::ChangeMonitor;
use crate::registry::ToolRegistry;
use crate::tool::{PipeTool, ToolError, ToolInstr};
use crate::tools::register_builtins;
use crate::wrangler::PipeWrangler;
use forge_core::FakeClock;
use forge_probe::{FileProbe as _, SystemProbe};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A copy tool that counts its executions, so tests can assert exactly how
/// often work actually ran.
#[derive(Debug)]
struct CountingCopy {
    runs: Arc<AtomicUsize>,
}

impl PipeTool for CountingCopy {
    fn name(&self) -> &str {
        "copy"
    }

    fn run(&self, instr: &mut ToolInstr) -> Result<(), ToolError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let file_in = instr.file_in.clone();
        let file_out = instr.file_out.clone();
        if let Some(parent) = file_out.parent() {
            instr.probe.create_directories(parent)?;
        }
        instr.probe.copy(&file_in, &file_out)?;
        Ok(())
    }
}

/// A tool that always fails after reading its input.
#[derive(Debug)]
struct AlwaysFails {
    runs: Arc<AtomicUsize>,
}

impl PipeTool for AlwaysFails {
    fn name(&self) -> &str {
        "alwaysfails"
    }

    fn run(&self, instr: &mut ToolInstr) -> Result<(), ToolError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let file_in = instr.file_in.clone();
        let _ = instr.probe.read(&file_in)?;
        Err(ToolError::Failed("boom".to_string()))
    }
}

/// A copy tool that blocks between reading its input and finishing, so a
/// test can change the input mid-flight.
#[derive(Debug)]
struct GatedCopy {
    runs: Arc<AtomicUsize>,
    started: Arc<AtomicBool>,
    release: Arc<AtomicBool>,
}

impl PipeTool for GatedCopy {
    fn name(&self) -> &str {
        "gatedcopy"
    }

    fn run(&self, instr: &mut ToolInstr) -> Result<(), ToolError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let file_in = instr.file_in.clone();
        let file_out = instr.file_out.clone();
        let contents = instr.probe.read(&file_in)?;
        self.started.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !self.release.load(Ordering::SeqCst) {
            assert!(Instant::now() < deadline, "gated tool never released");
            std::thread::sleep(Duration::from_millis(2));
        }
        instr.probe.write(&file_out, &contents)?;
        Ok(())
    }
}

pub(crate) struct Rig {
    dir: tempfile::TempDir,
    pub clock: FakeClock,
    pub monitor: ChangeMonitor<FakeClock>,
    pub wrangler: Arc<PipeWrangler>,
    runs: Arc<AtomicUsize>,
    gate_started: Arc<AtomicBool>,
    gate_release: Arc<AtomicBool>,
    probe: SystemProbe,
}

impl Rig {
    pub fn new() -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let clock = FakeClock::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let gate_started = Arc::new(AtomicBool::new(false));
        let gate_release = Arc::new(AtomicBool::new(false));

        let registry = Arc::new(ToolRegistry::new());
        register_builtins(&registry);
        registry.register(Arc::new(CountingCopy { runs: Arc::clone(&runs) }));
        registry.register(Arc::new(AlwaysFails { runs: Arc::clone(&runs) }));
        registry.register(Arc::new(GatedCopy {
            runs: Arc::clone(&runs),
            started: Arc::clone(&gate_started),
            release: Arc::clone(&gate_release),
        }));

        let wrangler = Arc::new(PipeWrangler::new(registry, Arc::new(SystemProbe::new())));
        wrangler.start(Some(2));

        let monitor = ChangeMonitor::with_clock(
            Arc::new(SystemProbe::new()),
            Arc::clone(&wrangler),
            clock.clone(),
        );
        monitor.set_persistent_directory(&dir.path().join("persist")).unwrap();
        monitor.set_reference_directory(dir.path()).unwrap();

        Rig {
            dir,
            clock,
            monitor,
            wrangler,
            runs,
            gate_started,
            gate_release,
            probe: SystemProbe::new(),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn persist_dir(&self) -> PathBuf {
        self.dir.path().join("persist")
    }

    /// Write a file (creating parents) and return its absolute path.
    pub fn write(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            self.probe.create_directories(parent).unwrap();
        }
        self.probe.write(&path, contents).unwrap();
        path
    }

    /// Rewrite a file so its write time moves past the comparison epsilon.
    pub fn rewrite(&self, rel: &str, contents: &[u8]) {
        std::thread::sleep(Duration::from_millis(15));
        self.write(rel, contents);
    }

    pub fn write_hub(&self, rel: &str, body: &Value) -> PathBuf {
        self.write(rel, body.to_string().as_bytes())
    }

    pub fn add_hub(&self, rel: &str) {
        self.monitor.add_base_hub_file(Path::new(rel));
    }

    pub fn cycle(&self) {
        self.monitor.cycle_once();
    }

    pub fn cycles(&self, n: usize) {
        for _ in 0..n {
            self.cycle();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Step cycles until the graph is quiescent: no scheduled work, no
    /// in-flight pipes, no unconsumed results.
    pub fn settle(&self) {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            self.cycle();
            let quiet = self.monitor.with_state(|state| {
                state.store.dirty_hubs.is_empty()
                    && state.store.future_dirty_hubs.is_empty()
                    && state.store.dirty_pipe_wildcards.is_empty()
                    && state.store.future_dirty_pipe_wildcards.is_empty()
                    && state.store.dirty_pipes.is_empty()
                    && state.store.future_dirty_pipes.is_empty()
                    && state.store.outbox_pipes.is_empty()
                    && state.store.pending_pipes.is_empty()
            });
            if quiet && self.wrangler.queued_len() == 0 {
                return;
            }
            assert!(Instant::now() < deadline, "monitor never settled");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Step cycles until `cond` holds.
    pub fn wait_until(&self, cond: impl Fn(&Rig) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !cond(self) {
            assert!(Instant::now() < deadline, "condition never reached");
            self.cycle();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn gate_started(&self) -> bool {
        self.gate_started.load(Ordering::SeqCst)
    }

    pub fn open_gate(&self) {
        self.gate_release.store(true, Ordering::SeqCst);
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        self.probe.read(&self.path(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.probe.exists(&self.path(rel))
    }

    pub fn check_invariants(&self) {
        self.monitor.with_state(|state| {
            if let Err(violation) = state.store.check_invariants() {
                panic!("store invariant violated: {violation}");
            }
        });
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        self.open_gate();
        self.wrangler.stop_and_wait();
    }
}
