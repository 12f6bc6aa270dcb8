// SPDX-License-Identifier: MIT

//! Filesystem error taxonomy

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a filesystem failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorKind {
    NotFound,
    Permission,
    Locked,
    Other,
}

impl std::fmt::Display for FsErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FsErrorKind::NotFound => "not found",
            FsErrorKind::Permission => "permission denied",
            FsErrorKind::Locked => "locked",
            FsErrorKind::Other => "i/o error",
        };
        f.write_str(s)
    }
}

/// A single filesystem operation failure. The probe performs no retries;
/// recovery policy belongs to the caller.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {}", path.display())]
pub struct FsError {
    pub kind: FsErrorKind,
    pub path: PathBuf,
}

impl FsError {
    pub fn new(kind: FsErrorKind, path: impl Into<PathBuf>) -> Self {
        Self { kind, path: path.into() }
    }

    pub fn from_io(err: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        use std::io::ErrorKind;
        let kind = match err.kind() {
            ErrorKind::NotFound => FsErrorKind::NotFound,
            ErrorKind::PermissionDenied => FsErrorKind::Permission,
            ErrorKind::WouldBlock | ErrorKind::ResourceBusy => FsErrorKind::Locked,
            _ => FsErrorKind::Other,
        };
        Self::new(kind, path)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FsErrorKind::NotFound
    }
}

pub type FsResult<T> = Result<T, FsError>;
