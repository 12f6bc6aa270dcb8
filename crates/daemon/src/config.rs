// SPDX-License-Identifier: MIT

//! Daemon configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Default bind address for the HTML status page.
pub const DEFAULT_STATUS_ADDR: &str = "127.0.0.1:8370";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a state directory for this user")]
    NoStateDir,
    #[error("could not determine the current directory: {0}")]
    NoCurrentDir(std::io::Error),
    #[error("invalid status address {addr:?}: {source}")]
    BadStatusAddr {
        addr: String,
        source: std::net::AddrParseError,
    },
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/forge)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Where `state.json` lives
    pub persistent_dir: PathBuf,
    /// Anchor for relative hub paths
    pub reference_dir: PathBuf,
    /// Bind address of the HTML status page
    pub status_addr: SocketAddr,
    /// Worker pool size; `None` means hardware concurrency
    pub max_workers: Option<usize>,
}

impl Config {
    /// Load configuration with defaults under the user state directory.
    ///
    /// The reference directory defaults to the invoking directory; one
    /// daemon serves one pipeline.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = state_dir()?;
        let reference_dir = std::env::current_dir().map_err(ConfigError::NoCurrentDir)?;
        let status_addr = parse_status_addr(DEFAULT_STATUS_ADDR)?;

        Ok(Self {
            socket_path: state_dir.join("forged.sock"),
            lock_path: state_dir.join("forged.pid"),
            log_path: state_dir.join("forged.log"),
            persistent_dir: state_dir.join("pipeline"),
            reference_dir,
            status_addr,
            max_workers: None,
            state_dir,
        })
    }
}

pub fn parse_status_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    addr.parse().map_err(|source| ConfigError::BadStatusAddr { addr: addr.to_string(), source })
}

fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("XDG_STATE_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir).join("forge"));
        }
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))
        .map(|dir| dir.join("forge"))
        .ok_or(ConfigError::NoStateDir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
