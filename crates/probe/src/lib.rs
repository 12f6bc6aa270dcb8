// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! forge-probe: filesystem access for the pipeline.
//!
//! Everything the engine or a pipe tool does to the filesystem goes through
//! a [`FileProbe`]. The [`SnoopingProbe`] wrapper records which paths a tool
//! touched, which is how a pipe's dependency set is discovered.

pub mod error;
pub mod probe;
pub mod snoop;
pub mod wildcard;

pub use error::{FsError, FsErrorKind, FsResult};
pub use probe::{canonical, FileProbe, SystemProbe};
pub use snoop::{AccessRecord, SnoopingProbe};
pub use wildcard::{contains_wildcards, PatternError, WildcardMatch, WildcardPattern, WildcardWatch};
