// SPDX-License-Identifier: MIT

//! The pipe wrangler: a bounded pool executing tool invocations.
//!
//! Tasks are FIFO through one queue under a single mutex; workers block on
//! a condition variable. Each task runs against a task-scoped snooping
//! probe, and its callback is invoked exactly once on success, tool
//! failure, and unknown tool alike. Workers never touch the coordinator's
//! lock; they only post into its inbox via the callback.

use crate::registry::ToolRegistry;
use crate::tool::{ReadFile, ToolInstr, WrittenFile};
use forge_core::NodeId;
use forge_probe::{FileProbe, SnoopingProbe};
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Callback a task result is delivered through.
pub type TaskCallback = Arc<dyn Fn(TaskResult) + Send + Sync>;

/// One unit of work for the pool.
pub struct Task {
    pub id: NodeId,
    pub tool: String,
    pub file_in: PathBuf,
    pub file_out: PathBuf,
    pub settings: Value,
    pub callback: TaskCallback,
}

/// The outcome of one task. Partial read/written lists are preserved on
/// failure when the probe observed any traffic before the error.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub id: NodeId,
    pub duration: Duration,
    pub error: Option<String>,
    pub read_files: Vec<ReadFile>,
    pub written_files: Vec<WrittenFile>,
}

struct WranglerShared {
    registry: Arc<ToolRegistry>,
    probe: Arc<dyn FileProbe>,
    queue: Mutex<VecDeque<Task>>,
    work_available: Condvar,
    stopping: AtomicBool,
}

/// The worker pool. `start` spins up the workers, `submit` feeds them,
/// `stop_and_wait` drains the queue and joins.
pub struct PipeWrangler {
    shared: Arc<WranglerShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PipeWrangler {
    pub fn new(registry: Arc<ToolRegistry>, probe: Arc<dyn FileProbe>) -> Self {
        Self {
            shared: Arc::new(WranglerShared {
                registry,
                probe,
                queue: Mutex::new(VecDeque::new()),
                work_available: Condvar::new(),
                stopping: AtomicBool::new(false),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spin up to `max_workers` worker threads; defaults to the hardware
    /// concurrency.
    pub fn start(&self, max_workers: Option<usize>) {
        let count = max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        });
        tracing::info!(workers = count, "pipe wrangler starting");
        let mut workers = self.workers.lock();
        for index in 0..count {
            let shared = Arc::clone(&self.shared);
            let handle = std::thread::Builder::new()
                .name(format!("pipe-worker-{index}"))
                .spawn(move || worker_loop(&shared));
            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::error!(error = %e, "failed to spawn pipe worker"),
            }
        }
    }

    /// Append tasks to the queue and wake workers.
    pub fn submit(&self, tasks: Vec<Task>) {
        if tasks.is_empty() {
            return;
        }
        let mut queue = self.shared.queue.lock();
        for task in tasks {
            queue.push_back(task);
        }
        drop(queue);
        self.shared.work_available.notify_all();
    }

    /// Drain the queue, then join every worker. In-flight tools run to
    /// completion.
    pub fn stop_and_wait(&self) {
        self.shared.stopping.store(true, Ordering::SeqCst);
        self.shared.work_available.notify_all();
        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if handle.join().is_err() {
                tracing::error!("pipe worker panicked");
            }
        }
        tracing::info!("pipe wrangler stopped");
    }

    /// Tasks queued but not yet picked up.
    pub fn queued_len(&self) -> usize {
        self.shared.queue.lock().len()
    }
}

fn worker_loop(shared: &WranglerShared) {
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    break Some(task);
                }
                if shared.stopping.load(Ordering::SeqCst) {
                    break None;
                }
                shared.work_available.wait(&mut queue);
            }
        };
        let Some(task) = task else { return };
        let result = run_task(shared, &task);
        (task.callback)(result);
    }
}

fn run_task(shared: &WranglerShared, task: &Task) -> TaskResult {
    tracing::info!(
        tool = %task.tool,
        file_in = %task.file_in.display(),
        file_out = %task.file_out.display(),
        "pipe task starting"
    );
    let start = Instant::now();

    let tool = match shared.registry.find(&task.tool) {
        Ok(tool) => tool,
        Err(e) => {
            tracing::error!(tool = %task.tool, error = %e, "pipe task failed");
            return TaskResult {
                id: task.id,
                duration: start.elapsed(),
                error: Some(e.to_string()),
                read_files: Vec::new(),
                written_files: Vec::new(),
            };
        }
    };

    let probe = SnoopingProbe::new(Arc::clone(&shared.probe));
    let mut instr = ToolInstr {
        file_in: task.file_in.clone(),
        file_out: task.file_out.clone(),
        settings: task.settings.clone(),
        probe: probe.clone(),
        read_files: Vec::new(),
        written_files: Vec::new(),
    };

    let outcome = tool.run(&mut instr);
    let duration = start.elapsed();

    // Fold in everything the probe saw, including accesses the tool did
    // not book-keep itself.
    for record in probe.get_list() {
        if record.write_access {
            if !instr.written_files.iter().any(|w| w.path == record.path) {
                instr.written_files.push(WrittenFile { path: record.path });
            }
        } else if !instr.read_files.iter().any(|r| r.path == record.path) {
            instr.read_files.push(ReadFile {
                path: record.path,
                previous_time: record.previous_last_write_time,
            });
        }
    }

    let error = match outcome {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(
                tool = %task.tool,
                file_in = %task.file_in.display(),
                error = %e,
                elapsed_ms = duration.as_millis() as u64,
                "pipe task failed"
            );
            Some(e.to_string())
        }
    };
    if error.is_none() {
        tracing::info!(
            tool = %task.tool,
            file_out = %task.file_out.display(),
            elapsed_ms = duration.as_millis() as u64,
            "pipe task completed"
        );
    }

    TaskResult {
        id: task.id,
        duration,
        error,
        read_files: instr.read_files,
        written_files: instr.written_files,
    }
}

#[cfg(test)]
#[path = "wrangler_tests.rs"]
mod tests;
