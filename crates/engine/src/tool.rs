// SPDX-License-Identifier: MIT

//! The pipe tool contract.
//!
//! A tool is one function plus the probe: it reads `file_in`, produces
//! `file_out` under `settings`, and every filesystem access it wants counted
//! goes through the provided snooping probe.

use forge_core::TimePoint;
use forge_probe::{FsError, SnoopingProbe};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// A file a tool read, with its write time snapshotted before the read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFile {
    pub path: PathBuf,
    pub previous_time: TimePoint,
}

/// A file a tool wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
}

/// The instructions handed to a running tool. The tool may append to the
/// read/written lists itself; the worker merges in everything the probe
/// observed after the run, so the final result reflects every access.
pub struct ToolInstr {
    pub file_in: PathBuf,
    pub file_out: PathBuf,
    pub settings: Value,
    pub probe: SnoopingProbe,
    pub read_files: Vec<ReadFile>,
    pub written_files: Vec<WrittenFile>,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error("{0}")]
    Failed(String),
}

/// A named transformation registered with the pipeline.
///
/// Tools run concurrently on worker threads; two tasks for the same tool
/// may overlap, so implementations hold no mutable state.
pub trait PipeTool: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;
    fn run(&self, instr: &mut ToolInstr) -> Result<(), ToolError>;
}
