// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! forge-hub: the hub manifest document model and variable interpolation.
//!
//! A hub is a UTF-8 JSON manifest declaring child hubs and pipes. Strings in
//! a hub may reference `{name}` variables; this crate owns both the document
//! shape and the substitution engine.

pub mod doc;
pub mod interp;

pub use doc::{parse_hub, HubError, HubGroup, HubRef, PathPair, PipeSpec};
pub use interp::{adapt, process, process_json, InterpError, MAX_PASSES};
