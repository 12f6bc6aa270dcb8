// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! IPC protocol for daemon communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

mod request;
mod response;
mod status;
mod wire;

pub use request::Request;
pub use response::Response;
pub use status::{HubEntry, PathEntry, TrackedInfo, WildcardEntry};
pub use wire::{decode, encode, read_message, write_message, ProtocolError};
pub use wire::{read_request, write_response};

#[cfg(test)]
mod property_tests;
