// SPDX-License-Identifier: MIT

//! Shared harness for pipeline specs: a temp project driven by a real
//! monitor loop, a real worker pool and real clocks.

use forge_engine::{
    register_builtins, ChangeMonitor, PipeTool, PipeWrangler, ToolError, ToolInstr, ToolRegistry,
};
use forge_probe::{FileProbe as _, SystemProbe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Generous upper bound for spec waits; the monitor polls every 250 ms.
pub const SPEC_WAIT_MAX_MS: u64 = 15_000;

/// Poll `cond` until it holds or the timeout elapses.
pub fn wait_for(timeout_ms: u64, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    cond()
}

/// A copy tool that counts executions, registered as `copy`.
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

/// A tool that fails every run, registered as `alwaysfails`.
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

/// A copy tool that parks between reading and writing, registered as
/// `gatedcopy`; lets a spec change the input mid-flight.
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
        let deadline = Instant::now() + Duration::from_secs(10);
        while !self.release.load(Ordering::SeqCst) {
            if Instant::now() > deadline {
                return Err(ToolError::Failed("gate never released".to_string()));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        instr.probe.write(&file_out, &contents)?;
        Ok(())
    }
}

/// A temporary project with a running pipeline.
pub struct Project {
    dir: tempfile::TempDir,
    pub monitor: ChangeMonitor,
    pub wrangler: Arc<PipeWrangler>,
    probe: SystemProbe,
    runs: Arc<AtomicUsize>,
    gate_started: Arc<AtomicBool>,
    gate_release: Arc<AtomicBool>,
}

impl Project {
    /// Empty project; the monitor is constructed but not started.
    pub fn empty() -> Project {
        let dir = tempfile::tempdir().expect("tempdir");
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

        let monitor = ChangeMonitor::new(Arc::new(SystemProbe::new()), Arc::clone(&wrangler));
        monitor
            .set_persistent_directory(&dir.path().join("persist"))
            .expect("persistent dir");
        monitor.set_reference_directory(dir.path()).expect("reference dir");

        Project {
            dir,
            monitor,
            wrangler,
            probe: SystemProbe::new(),
            runs,
            gate_started,
            gate_release,
        }
    }

    /// Empty project with the monitor loop already running.
    pub fn started() -> Project {
        let project = Project::empty();
        project.monitor.begin().expect("monitor begin");
        project
    }

    /// Fresh monitor over this project's directories, standing in for a
    /// restarted daemon. The previous monitor is stopped first.
    pub fn restart_monitor(&mut self) {
        self.monitor.end_and_wait();
        let monitor =
            ChangeMonitor::new(Arc::new(SystemProbe::new()), Arc::clone(&self.wrangler));
        monitor
            .set_persistent_directory(&self.dir.path().join("persist"))
            .expect("persistent dir");
        monitor.set_reference_directory(self.dir.path()).expect("reference dir");
        monitor.begin().expect("monitor begin");
        self.monitor = monitor;
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn file(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            self.probe.create_directories(parent).expect("create parent dirs");
        }
        self.probe.write(&path, contents).expect("write file");
        path
    }

    /// Rewrite a file after a pause long enough to defeat the write-time
    /// comparison epsilon.
    pub fn rewrite(&self, rel: &str, contents: &[u8]) {
        std::thread::sleep(Duration::from_millis(15));
        self.file(rel, contents);
    }

    pub fn hub(&self, rel: &str, body: &serde_json::Value) -> PathBuf {
        self.file(rel, body.to_string().as_bytes())
    }

    pub fn add_hub(&self, rel: &str) {
        self.monitor.add_base_hub_file(Path::new(rel));
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.probe.exists(&self.path(rel))
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        self.probe.read(&self.path(rel)).expect("read file")
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn gate_started(&self) -> bool {
        self.gate_started.load(Ordering::SeqCst)
    }

    pub fn reset_gate(&self) {
        self.gate_started.store(false, Ordering::SeqCst);
        self.gate_release.store(false, Ordering::SeqCst);
    }

    pub fn open_gate(&self) {
        self.gate_release.store(true, Ordering::SeqCst);
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        self.open_gate();
        self.monitor.end_and_wait();
        self.wrangler.stop_and_wait();
    }
}
