// SPDX-License-Identifier: MIT

//! The [`FileProbe`] trait and its `std::fs` implementation

use crate::error::{FsError, FsResult};
use forge_core::TimePoint;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

/// Filesystem operations the pipeline relies on.
///
/// One implementation talks to the real filesystem; wrappers such as
/// [`crate::SnoopingProbe`] interpose to observe traffic. No operation
/// retries; transient failures surface as [`FsError`] and the caller
/// decides on timeouts.
pub trait FileProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn last_write_time(&self, path: &Path) -> FsResult<TimePoint>;
    fn read(&self, path: &Path) -> FsResult<Vec<u8>>;
    /// Create-always write: truncates, writes, syncs.
    fn write(&self, path: &Path, bytes: &[u8]) -> FsResult<()>;
    fn copy(&self, from: &Path, to: &Path) -> FsResult<()>;
    fn create_directories(&self, path: &Path) -> FsResult<()>;
    fn remove(&self, path: &Path) -> FsResult<()>;
    fn rename(&self, from: &Path, to: &Path) -> FsResult<()>;
    /// Entries of a directory, unordered.
    fn read_dir(&self, path: &Path) -> FsResult<Vec<PathBuf>>;
}

/// Lexically normalize a path: fold `.` away and resolve `..` against
/// preceding components where possible.
///
/// Deliberately does not consult the filesystem: pipe outputs are
/// normalized before they exist, and a node's structural identity must not
/// depend on what is currently on disk.
pub fn canonical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// [`FileProbe`] over the real filesystem.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe;

impl SystemProbe {
    pub fn new() -> Self {
        Self
    }
}

impl FileProbe for SystemProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn last_write_time(&self, path: &Path) -> FsResult<TimePoint> {
        let meta = std::fs::metadata(path).map_err(|e| FsError::from_io(&e, path))?;
        meta.modified().map_err(|e| FsError::from_io(&e, path))
    }

    fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| FsError::from_io(&e, path))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> FsResult<()> {
        let mut file = std::fs::File::create(path).map_err(|e| FsError::from_io(&e, path))?;
        file.write_all(bytes).map_err(|e| FsError::from_io(&e, path))?;
        file.sync_all().map_err(|e| FsError::from_io(&e, path))
    }

    fn copy(&self, from: &Path, to: &Path) -> FsResult<()> {
        std::fs::copy(from, to).map(|_| ()).map_err(|e| FsError::from_io(&e, from))
    }

    fn create_directories(&self, path: &Path) -> FsResult<()> {
        std::fs::create_dir_all(path).map_err(|e| FsError::from_io(&e, path))
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        std::fs::remove_file(path).map_err(|e| FsError::from_io(&e, path))
    }

    fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        std::fs::rename(from, to).map_err(|e| FsError::from_io(&e, from))
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path).map_err(|e| FsError::from_io(&e, path))?;
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FsError::from_io(&e, path))?;
            out.push(entry.path());
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
