// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! forge-storage: the persistent pipeline snapshot.
//!
//! Across restarts the monitor only needs two things to avoid rebuilding
//! the world: the last-observed write time of every monitored path, and the
//! dependency set of every settled pipe. Both live in one small JSON file
//! promoted atomically on save.

pub mod state;

pub use state::{load, save, PathRecord, PersistentState, PipeRecord, StateError, STATE_FILE};
