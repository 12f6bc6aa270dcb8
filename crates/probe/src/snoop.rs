// SPDX-License-Identifier: MIT

//! Access-recording probe wrapper

use crate::error::FsResult;
use crate::probe::FileProbe;
use forge_core::{TimePoint, EPOCH};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One distinct path touched during a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    pub path: PathBuf,
    pub write_access: bool,
    /// Last-write-time snapshotted before the first read of this path.
    /// [`EPOCH`] for paths that were only ever written.
    pub previous_last_write_time: TimePoint,
}

/// A [`FileProbe`] that records every file a tool reads or writes.
///
/// The pre-read mtime is captured at the *first read*, not at invocation
/// end; the coordinator compares it against its own observations to detect
/// inputs that changed while the tool was running. Duplicates collapse and
/// write access wins over read access. Metadata queries (`exists`,
/// `last_write_time`, `read_dir`) are not recorded.
#[derive(Clone)]
pub struct SnoopingProbe {
    inner: Arc<dyn FileProbe>,
    records: Arc<Mutex<HashMap<PathBuf, AccessRecord>>>,
}

impl SnoopingProbe {
    pub fn new(inner: Arc<dyn FileProbe>) -> Self {
        Self { inner, records: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// The accumulated access set, ordered by path for determinism.
    pub fn get_list(&self) -> Vec<AccessRecord> {
        let mut list: Vec<AccessRecord> = self.records.lock().values().cloned().collect();
        list.sort_by(|a, b| a.path.cmp(&b.path));
        list
    }

    fn note_read(&self, path: &Path) {
        let mut records = self.records.lock();
        if records.contains_key(path) {
            return;
        }
        // Snapshot before the read itself happens.
        let previous = self.inner.last_write_time(path).unwrap_or(EPOCH);
        records.insert(
            path.to_path_buf(),
            AccessRecord {
                path: path.to_path_buf(),
                write_access: false,
                previous_last_write_time: previous,
            },
        );
    }

    fn note_write(&self, path: &Path) {
        let mut records = self.records.lock();
        records
            .entry(path.to_path_buf())
            .and_modify(|r| r.write_access = true)
            .or_insert_with(|| AccessRecord {
                path: path.to_path_buf(),
                write_access: true,
                previous_last_write_time: EPOCH,
            });
    }
}

impl FileProbe for SnoopingProbe {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn last_write_time(&self, path: &Path) -> FsResult<TimePoint> {
        self.inner.last_write_time(path)
    }

    fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
        self.note_read(path);
        self.inner.read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> FsResult<()> {
        self.note_write(path);
        self.inner.write(path, bytes)
    }

    fn copy(&self, from: &Path, to: &Path) -> FsResult<()> {
        self.note_read(from);
        self.note_write(to);
        self.inner.copy(from, to)
    }

    fn create_directories(&self, path: &Path) -> FsResult<()> {
        self.inner.create_directories(path)
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        self.note_write(path);
        self.inner.remove(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        self.note_write(from);
        self.note_write(to);
        self.inner.rename(from, to)
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<PathBuf>> {
        self.inner.read_dir(path)
    }
}

#[cfg(test)]
#[path = "snoop_tests.rs"]
mod tests;
